//! OpenZeppelin Standard Merkle Tree
//!
//! - The tree is shaped as a complete binary tree.
//! - Leaves are ABI encoded values, double hashed with Keccak256.
//! - Leaves are sorted before the tree is built.

use alloy_primitives::B256;
use lido_core::abi::{self, Formatted};
use lido_core::{DynSolType, DynSolValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    hasher::Keccak256Hasher,
    tree::{CompleteBinaryMerkleTree, MultiProof},
    values::{value_from_json, value_to_json},
    MerkleError,
};

/// Dump format tag
pub const FORMAT: &str = "standard-v1";

/// A leaf value and its position in the node array
#[derive(Clone, Debug, PartialEq)]
pub struct StandardValue {
    pub value: Vec<DynSolValue>,
    pub tree_index: usize,
}

/// `standard-v1` JSON dump
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardTreeDump {
    pub format: String,
    pub leaf_encoding: Vec<String>,
    pub tree: Vec<B256>,
    pub values: Vec<DumpValue>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpValue {
    pub value: Value,
    pub tree_index: usize,
}

/// Merkle tree over ABI encoded values
#[derive(Clone, Debug, PartialEq)]
pub struct StandardMerkleTree {
    tree: CompleteBinaryMerkleTree,
    encoding: Vec<String>,
    types: Vec<DynSolType>,
    values: Vec<StandardValue>,
}

impl StandardMerkleTree {
    /// Build a tree from values encoded as `encoding`, e.g. `["uint256", "uint256"]`
    pub fn new<S: AsRef<str>>(values: Vec<Vec<DynSolValue>>, encoding: &[S]) -> Result<Self, MerkleError> {
        let encoding: Vec<String> = encoding.iter().map(|e| e.as_ref().to_string()).collect();
        let types = encoding
            .iter()
            .map(|e| abi::parse_type(e))
            .collect::<Result<Vec<_>, _>>()?;

        let hashed = values
            .iter()
            .map(|v| leaf_hash(&types, v))
            .collect::<Result<Vec<_>, _>>()?;
        let mut leaves = hashed.clone();
        leaves.sort();
        let tree = CompleteBinaryMerkleTree::new(&leaves)?;

        let values = values
            .into_iter()
            .zip(&hashed)
            .map(|(value, leaf)| {
                tree.find(leaf).map(|tree_index| StandardValue { value, tree_index })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            tree,
            encoding,
            types,
            values,
        })
    }

    /// Build a tree from JSON leaf values
    pub fn from_json_values<S: AsRef<str>>(values: &[Value], encoding: &[S]) -> Result<Self, MerkleError> {
        let types = encoding
            .iter()
            .map(|e| abi::parse_type(e.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let leaves = values
            .iter()
            .map(|value| {
                let items = value
                    .as_array()
                    .filter(|items| items.len() == types.len())
                    .ok_or_else(|| MerkleError::InvalidValue(format!("{value} does not match the leaf encoding")))?;
                types
                    .iter()
                    .zip(items)
                    .map(|(ty, item)| value_from_json(ty, item))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(leaves, encoding)
    }

    /// Get the root hash
    pub fn root(&self) -> B256 {
        self.tree.root()
    }

    pub fn encoding(&self) -> &[String] {
        &self.encoding
    }

    /// Values in insertion order
    pub fn values(&self) -> &[StandardValue] {
        &self.values
    }

    pub fn inner(&self) -> &CompleteBinaryMerkleTree {
        &self.tree
    }

    /// Leaf hash of `value` under this tree's encoding
    pub fn leaf(&self, value: &[DynSolValue]) -> Result<B256, MerkleError> {
        leaf_hash(&self.types, value)
    }

    pub fn find(&self, leaf: &B256) -> Result<usize, MerkleError> {
        self.tree.find(leaf)
    }

    pub fn get_proof(&self, index: usize) -> Result<Vec<B256>, MerkleError> {
        self.tree.get_proof(index)
    }

    pub fn get_multi_proof(&self, indices: &[usize]) -> Result<MultiProof, MerkleError> {
        self.tree.get_multi_proof(indices)
    }

    /// Proof for a value stored in the tree
    pub fn proof_for(&self, value: &[DynSolValue]) -> Result<Vec<B256>, MerkleError> {
        let index = self.find(&self.leaf(value)?)?;
        self.get_proof(index)
    }

    pub fn verify(root: &B256, leaf: &B256, proof: &[B256]) -> bool {
        CompleteBinaryMerkleTree::verify(root, leaf, proof)
    }

    pub fn dump(&self) -> StandardTreeDump {
        StandardTreeDump {
            format: FORMAT.to_string(),
            leaf_encoding: self.encoding.clone(),
            tree: self.tree.nodes().to_vec(),
            values: self
                .values
                .iter()
                .map(|v| DumpValue {
                    value: Value::Array(v.value.iter().map(value_to_json).collect()),
                    tree_index: v.tree_index,
                })
                .collect(),
        }
    }

    /// Rebuild a tree from its dump; nodes are recomputed from the values
    pub fn load(data: &Value) -> Result<Self, MerkleError> {
        if data.get("format").and_then(Value::as_str) != Some(FORMAT) {
            return Err(MerkleError::UnexpectedFormat);
        }
        let encoding = data
            .get("leafEncoding")
            .and_then(Value::as_array)
            .ok_or(MerkleError::MissingLeafEncoding)?
            .iter()
            .map(|e| e.as_str().ok_or(MerkleError::MissingLeafEncoding))
            .collect::<Result<Vec<_>, _>>()?;
        let values = data
            .get("values")
            .and_then(Value::as_array)
            .ok_or(MerkleError::MissingValues)?
            .iter()
            .map(|v| v.get("value").cloned().ok_or(MerkleError::MissingValues))
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_json_values(&values, &encoding[..])
    }

    /// Compact JSON with sorted keys
    pub fn encode(&self) -> Result<Vec<u8>, MerkleError> {
        let dump = serde_json::to_value(self.dump()).map_err(|e| MerkleError::Serialization(e.to_string()))?;
        serde_json::to_vec(&sort_keys(dump)).map_err(|e| MerkleError::Serialization(e.to_string()))
    }
}

fn leaf_hash(types: &[DynSolType], value: &[DynSolValue]) -> Result<B256, MerkleError> {
    if value.len() != types.len() || !value.iter().zip(types).all(|(v, ty)| abi::type_check(v, ty)) {
        let shown: Vec<String> = value.iter().map(|v| Formatted(v).to_string()).collect();
        return Err(MerkleError::InvalidValue(format!(
            "({}) does not match the leaf encoding",
            shown.join(", ")
        )));
    }
    Ok(Keccak256Hasher::hash_leaf(&abi::encode(value)))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use serde_json::json;

    fn pair(id: u64, amount: u64) -> Vec<DynSolValue> {
        vec![
            DynSolValue::Uint(U256::from(id), 256),
            DynSolValue::Uint(U256::from(amount), 256),
        ]
    }

    #[test]
    fn test_tree_indices_follow_insertion_order() {
        let tree = StandardMerkleTree::new(vec![pair(1, 1000), pair(2, 2000)], &["uint256", "uint256"]).unwrap();
        let indices: Vec<usize> = tree.values().iter().map(|v| v.tree_index).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn test_value_must_match_encoding() {
        let err = StandardMerkleTree::new(vec![vec![DynSolValue::Bool(true)]], &["uint256"]).unwrap_err();
        assert!(matches!(err, MerkleError::InvalidValue(_)));
        let narrow = vec![DynSolValue::Uint(U256::from(256u64), 256)];
        assert!(StandardMerkleTree::new(vec![narrow], &["uint8"]).is_err());
        assert!(StandardMerkleTree::new(vec![pair(1, 1)], &["uint256"]).is_err());
        assert!(StandardMerkleTree::new(vec![pair(1, 1)], &["uint257", "uint256"]).is_err());
    }

    #[test]
    fn test_dump_shape() {
        let tree = StandardMerkleTree::new(vec![pair(1, 1000), pair(2, 2000)], &["uint256", "uint256"]).unwrap();
        let dump = serde_json::to_value(tree.dump()).unwrap();
        assert_eq!(dump["format"], "standard-v1");
        assert_eq!(dump["leafEncoding"], json!(["uint256", "uint256"]));
        assert_eq!(dump["values"][0], json!({"value": [1, 1000], "treeIndex": 1}));
        assert_eq!(
            dump["tree"][0],
            "0xb6f554dd8a16c807d679d82ab33501fe6fbd44ceaaaad4c0197fdb57e4665134"
        );
    }

    #[test]
    fn test_load_errors() {
        assert_eq!(
            StandardMerkleTree::load(&json!({"format": "v2"})),
            Err(MerkleError::UnexpectedFormat)
        );
        assert_eq!(
            StandardMerkleTree::load(&json!({"format": "standard-v1", "values": []})),
            Err(MerkleError::MissingLeafEncoding)
        );
        assert_eq!(
            StandardMerkleTree::load(&json!({"format": "standard-v1", "leafEncoding": ["uint256"]})),
            Err(MerkleError::MissingValues)
        );
        assert_eq!(
            StandardMerkleTree::load(&json!({"format": "standard-v1", "leafEncoding": ["uint256"], "values": []})),
            Err(MerkleError::EmptyTree)
        );
    }

    #[test]
    fn test_encode_is_compact_and_sorted() {
        let tree = StandardMerkleTree::new(vec![pair(5, 50)], &["uint256", "uint256"]).unwrap();
        let encoded = String::from_utf8(tree.encode().unwrap()).unwrap();
        assert!(encoded.starts_with("{\"format\":\"standard-v1\",\"leafEncoding\":[\"uint256\",\"uint256\"],\"tree\":[\"0x"));
        assert!(encoded.ends_with(",\"values\":[{\"treeIndex\":0,\"value\":[5,50]}]}"));
        assert!(!encoded.contains(' '));
    }
}
