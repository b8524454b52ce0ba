//! Community Staking Module trees
//!
//! Thin wrappers fixing the leaf encoding of a [`StandardMerkleTree`] and
//! providing the compact JSON codec the CSM oracle publishes.

use std::collections::BTreeMap;

use alloy_primitives::{Address, B256, U256};
use lido_core::DynSolValue;
use serde_json::Value;

use crate::{
    standard::{StandardMerkleTree, StandardTreeDump},
    MerkleError,
};

macro_rules! standard_tree_wrapper {
    ($(#[$meta:meta])* $name:ident, [$($ty:literal),+ $(,)?]) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $name {
            pub tree: StandardMerkleTree,
        }

        impl $name {
            /// Leaf encoding of this tree
            pub const ENCODING: &'static [&'static str] = &[$($ty),+];

            fn from_values(values: Vec<Vec<DynSolValue>>) -> Result<Self, MerkleError> {
                StandardMerkleTree::new(values, Self::ENCODING).map(|tree| Self { tree })
            }

            pub fn root(&self) -> B256 {
                self.tree.root()
            }

            pub fn dump(&self) -> StandardTreeDump {
                self.tree.dump()
            }

            /// Compact JSON representation
            pub fn encode(&self) -> Result<Vec<u8>, MerkleError> {
                self.tree.encode()
            }

            /// Restore a tree from [`Self::encode`] output
            pub fn decode(content: &[u8]) -> Result<Self, MerkleError> {
                let data: Value =
                    serde_json::from_slice(content).map_err(|_| MerkleError::UnsupportedFormat)?;
                StandardMerkleTree::load(&data).map(|tree| Self { tree })
            }
        }
    };
}

const fn uint(value: U256) -> DynSolValue {
    DynSolValue::Uint(value, 256)
}

standard_tree_wrapper!(
    /// Rewards distribution tree: `(nodeOperatorId, shares)`
    RewardsTree,
    ["uint256", "uint256"]
);

standard_tree_wrapper!(
    /// Strikes tree: `(nodeOperatorId, pubkey, strikes)`
    StrikesTree,
    ["uint256", "bytes", "uint256[]"]
);

standard_tree_wrapper!(
    /// ICS vetted gate tree: one address per leaf
    IcsTree,
    ["address"]
);

impl RewardsTree {
    pub fn new(values: &[(U256, U256)]) -> Result<Self, MerkleError> {
        Self::from_values(
            values
                .iter()
                .map(|(id, shares)| vec![uint(*id), uint(*shares)])
                .collect(),
        )
    }

    /// Tree over cumulative shares keyed by node operator id
    pub fn from_shares(shares: &BTreeMap<u64, U256>) -> Result<Self, MerkleError> {
        let values: Vec<(U256, U256)> = shares
            .iter()
            .map(|(id, shares)| (U256::from(*id), *shares))
            .collect();
        Self::new(&values)
    }

    pub fn proof(&self, node_operator_id: U256, shares: U256) -> Result<Vec<B256>, MerkleError> {
        self.tree.proof_for(&[uint(node_operator_id), uint(shares)])
    }
}

impl StrikesTree {
    pub fn new(values: &[(U256, Vec<u8>, Vec<U256>)]) -> Result<Self, MerkleError> {
        Self::from_values(
            values
                .iter()
                .map(|(id, pubkey, strikes)| {
                    vec![
                        uint(*id),
                        DynSolValue::Bytes(pubkey.clone()),
                        DynSolValue::Array(strikes.iter().copied().map(uint).collect()),
                    ]
                })
                .collect(),
        )
    }
}

impl IcsTree {
    pub fn new(addresses: &[Address]) -> Result<Self, MerkleError> {
        Self::from_values(addresses.iter().map(|a| vec![DynSolValue::Address(*a)]).collect())
    }

    pub fn proof(&self, address: Address) -> Result<Vec<B256>, MerkleError> {
        self.tree.proof_for(&[DynSolValue::Address(address)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use crate::CompleteBinaryMerkleTree;

    #[test]
    fn test_rewards_codec() {
        let shares = BTreeMap::from([(0u64, U256::from(10u64)), (1, U256::from(20u64)), (7, U256::MAX)]);
        let tree = RewardsTree::from_shares(&shares).unwrap();
        let decoded = RewardsTree::decode(&tree.encode().unwrap()).unwrap();
        assert_eq!(decoded.root(), tree.root());
        for (id, amount) in &shares {
            let proof = tree.proof(U256::from(*id), *amount).unwrap();
            assert_eq!(decoded.proof(U256::from(*id), *amount).unwrap(), proof);
        }
    }

    #[test]
    fn test_decode_garbage() {
        assert_eq!(RewardsTree::decode(b"not json"), Err(MerkleError::UnsupportedFormat));
        assert_eq!(
            RewardsTree::decode(br#"{"format":"standard-v2"}"#),
            Err(MerkleError::UnexpectedFormat)
        );
    }

    #[test]
    fn test_strikes_tree() {
        let tree = StrikesTree::new(&[
            (U256::from(1u64), vec![0xaa; 48], vec![U256::from(1u64), U256::ZERO, U256::from(2u64)]),
            (U256::from(2u64), vec![0xbb; 48], vec![]),
        ])
        .unwrap();
        let decoded = StrikesTree::decode(&tree.encode().unwrap()).unwrap();
        assert_eq!(decoded, tree);
    }

    #[test]
    fn test_ics_tree() {
        let members = [Address::repeat_byte(1), Address::repeat_byte(2), Address::repeat_byte(3)];
        let tree = IcsTree::new(&members).unwrap();
        for member in members {
            let proof = tree.proof(member).unwrap();
            let leaf = tree.tree.leaf(&[DynSolValue::Address(member)]).unwrap();
            assert!(StandardMerkleTree::verify(&tree.root(), &leaf, &proof));
        }
        assert_eq!(tree.proof(Address::ZERO), Err(MerkleError::NodeNotFound));
        assert_eq!(IcsTree::decode(&tree.encode().unwrap()).unwrap(), tree);
    }

    #[test]
    fn test_ics_tree_multi_proof() {
        let mut rng = StdRng::seed_from_u64(42);
        let members: Vec<Address> = (0..33).map(|_| Address::from(rng.gen::<[u8; 20]>())).collect();
        let tree = IcsTree::new(&members).unwrap();

        let indices: Vec<usize> = tree.tree.values().iter().step_by(3).map(|v| v.tree_index).collect();
        let multi = tree.tree.get_multi_proof(&indices).unwrap();
        assert!(CompleteBinaryMerkleTree::verify_multi_proof(
            &tree.root(),
            &multi.leaves,
            &multi.proof,
            &multi.proof_flags
        ));
    }
}
