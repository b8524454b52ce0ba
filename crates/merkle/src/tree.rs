//! Complete binary Merkle tree
//!
//! Nodes live in a flat array of `2n - 1` hashes with the root at index 0.
//! Leaf `i` is stored at `len - 1 - i`; node `i` has children `2i + 1` and
//! `2i + 2`.

use std::collections::VecDeque;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use crate::{hasher::Keccak256Hasher, MerkleError};

/// Complete binary tree over pre-hashed leaves
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompleteBinaryMerkleTree {
    tree: Vec<B256>,
}

/// Proof for several leaves at once
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiProof {
    /// Proven leaves, in the order the verifier consumes them
    pub leaves: Vec<B256>,
    pub proof: Vec<B256>,
    pub proof_flags: Vec<bool>,
}

impl CompleteBinaryMerkleTree {
    /// Build the tree bottom-up. Leaves are used in the given order.
    pub fn new(leaves: &[B256]) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyTree);
        }

        let len = 2 * leaves.len() - 1;
        let mut tree = vec![B256::ZERO; len];
        for (i, leaf) in leaves.iter().enumerate() {
            tree[len - 1 - i] = *leaf;
        }
        for i in (0..len - leaves.len()).rev() {
            tree[i] = Keccak256Hasher::hash_node(&tree[2 * i + 1], &tree[2 * i + 2]);
        }

        Ok(Self { tree })
    }

    /// Rebuild from a flat node array, checking every internal node
    pub fn from_nodes(nodes: Vec<B256>) -> Result<Self, MerkleError> {
        if nodes.is_empty() {
            return Err(MerkleError::EmptyTree);
        }
        if nodes.len() % 2 == 0 {
            return Err(MerkleError::InvalidTree);
        }
        let internal = nodes.len() / 2;
        for i in 0..internal {
            if nodes[i] != Keccak256Hasher::hash_node(&nodes[2 * i + 1], &nodes[2 * i + 2]) {
                return Err(MerkleError::InvalidTree);
            }
        }
        Ok(Self { tree: nodes })
    }

    /// Get the root hash
    pub fn root(&self) -> B256 {
        self.tree[0]
    }

    /// All nodes, root first
    pub fn nodes(&self) -> &[B256] {
        &self.tree
    }

    pub fn leaves_count(&self) -> usize {
        (self.tree.len() + 1) / 2
    }

    /// Position of `leaf` in the flat node array
    pub fn find(&self, leaf: &B256) -> Result<usize, MerkleError> {
        self.tree
            .iter()
            .position(|node| node == leaf)
            .ok_or(MerkleError::NodeNotFound)
    }

    /// Sibling hashes from the node at `index` up to the root
    pub fn get_proof(&self, index: usize) -> Result<Vec<B256>, MerkleError> {
        if index >= self.tree.len() {
            return Err(MerkleError::IndexOutOfRange(index));
        }
        let mut proof = Vec::new();
        let mut i = index;
        while i > 0 {
            proof.push(self.tree[sibling_index(i)]);
            i = (i - 1) / 2;
        }
        Ok(proof)
    }

    /// Proof for several leaf positions
    ///
    /// Nodes and flags follow the OpenZeppelin `multiProofVerify` queue:
    /// leaves are taken in descending node index and each step hashes the
    /// queue head with either the next queued node or the next proof node.
    /// No indices give an empty proof.
    pub fn get_multi_proof(&self, indices: &[usize]) -> Result<MultiProof, MerkleError> {
        let first_leaf = self.tree.len() - self.leaves_count();
        let mut sorted = indices.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        if let Some(&bad) = sorted.iter().find(|&&i| i < first_leaf || i >= self.tree.len()) {
            return Err(MerkleError::IndexOutOfRange(bad));
        }

        let mut stack: VecDeque<usize> = sorted.iter().copied().collect();
        let mut proof = Vec::new();
        let mut proof_flags = Vec::new();
        while let Some(&j) = stack.front() {
            if j == 0 {
                break;
            }
            stack.pop_front();
            let sibling = sibling_index(j);
            if stack.front() == Some(&sibling) {
                proof_flags.push(true);
                stack.pop_front();
            } else {
                proof_flags.push(false);
                proof.push(self.tree[sibling]);
            }
            stack.push_back((j - 1) / 2);
        }

        Ok(MultiProof {
            leaves: sorted.iter().map(|&i| self.tree[i]).collect(),
            proof,
            proof_flags,
        })
    }

    /// Fold `proof` over `leaf` and compare with `root`
    pub fn verify(root: &B256, leaf: &B256, proof: &[B256]) -> bool {
        let computed = proof
            .iter()
            .fold(*leaf, |acc, sibling| Keccak256Hasher::hash_node(&acc, sibling));
        computed == *root
    }

    /// Queue based multiproof verification; an empty set of leaves proves
    /// nothing and is accepted
    pub fn verify_multi_proof(root: &B256, leaves: &[B256], proof: &[B256], flags: &[bool]) -> bool {
        if leaves.is_empty() {
            return true;
        }
        if leaves.len() + proof.len() != flags.len() + 1 {
            return false;
        }

        let mut queue: VecDeque<B256> = leaves.iter().copied().collect();
        let mut proof_iter = proof.iter();
        for &flag in flags {
            let Some(a) = queue.pop_front() else {
                return false;
            };
            let b = if flag {
                queue.pop_front()
            } else {
                proof_iter.next().copied()
            };
            let Some(b) = b else {
                return false;
            };
            queue.push_back(Keccak256Hasher::hash_node(&a, &b));
        }

        proof_iter.next().is_none() && queue.len() == 1 && queue[0] == *root
    }
}

const fn sibling_index(i: usize) -> usize {
    if i % 2 == 0 {
        i - 1
    } else {
        i + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: u8) -> Vec<B256> {
        (0..n).map(|i| Keccak256Hasher::hash(&[i])).collect()
    }

    #[test]
    fn test_empty_tree() {
        assert_eq!(CompleteBinaryMerkleTree::new(&[]), Err(MerkleError::EmptyTree));
    }

    #[test]
    fn test_shape() {
        let tree = CompleteBinaryMerkleTree::new(&leaves(5)).unwrap();
        assert_eq!(tree.nodes().len(), 9);
        assert_eq!(tree.leaves_count(), 5);
        // leaves fill the array from the end
        assert_eq!(tree.nodes()[8], leaves(5)[0]);
        assert_eq!(tree.nodes()[4], leaves(5)[4]);
    }

    #[test]
    fn test_find_missing() {
        let tree = CompleteBinaryMerkleTree::new(&leaves(3)).unwrap();
        assert_eq!(tree.find(&B256::repeat_byte(9)), Err(MerkleError::NodeNotFound));
        assert_eq!(tree.get_proof(5), Err(MerkleError::IndexOutOfRange(5)));
    }

    #[test]
    fn test_every_leaf_verifies() {
        for n in 1..=9 {
            let leaves = leaves(n);
            let tree = CompleteBinaryMerkleTree::new(&leaves).unwrap();
            for leaf in &leaves {
                let proof = tree.get_proof(tree.find(leaf).unwrap()).unwrap();
                assert!(CompleteBinaryMerkleTree::verify(&tree.root(), leaf, &proof));
            }
        }
    }

    #[test]
    fn test_wrong_leaf_fails() {
        let leaves = leaves(4);
        let tree = CompleteBinaryMerkleTree::new(&leaves).unwrap();
        let proof = tree.get_proof(tree.find(&leaves[0]).unwrap()).unwrap();
        assert!(!CompleteBinaryMerkleTree::verify(&tree.root(), &leaves[1], &proof));
    }

    #[test]
    fn test_multi_proof_all_subsets() {
        for n in 1..=6u8 {
            let tree = CompleteBinaryMerkleTree::new(&leaves(n)).unwrap();
            let first_leaf = tree.nodes().len() - n as usize;
            for mask in 1u32..(1 << n) {
                let indices: Vec<usize> = (0..n as usize)
                    .filter(|b| mask & (1 << b) != 0)
                    .map(|b| first_leaf + b)
                    .collect();
                let multi = tree.get_multi_proof(&indices).unwrap();
                assert_eq!(multi.leaves.len(), indices.len());
                assert!(CompleteBinaryMerkleTree::verify_multi_proof(
                    &tree.root(),
                    &multi.leaves,
                    &multi.proof,
                    &multi.proof_flags
                ));
            }
        }
    }

    #[test]
    fn test_multi_proof_queue_order() {
        let tree = CompleteBinaryMerkleTree::new(&leaves(4)).unwrap();
        let nodes = tree.nodes();
        let multi = tree.get_multi_proof(&[3, 5]).unwrap();
        assert_eq!(multi.leaves, vec![nodes[5], nodes[3]]);
        assert_eq!(multi.proof, vec![nodes[6], nodes[4]]);
        assert_eq!(multi.proof_flags, vec![false, false, true]);
    }

    #[test]
    fn test_empty_multi_proof() {
        let tree = CompleteBinaryMerkleTree::new(&leaves(3)).unwrap();
        assert_eq!(tree.get_multi_proof(&[]).unwrap(), MultiProof::default());
        assert!(CompleteBinaryMerkleTree::verify_multi_proof(&tree.root(), &[], &[], &[]));
    }

    #[test]
    fn test_multi_proof_rejects_tampering() {
        let tree = CompleteBinaryMerkleTree::new(&leaves(5)).unwrap();
        let multi = tree.get_multi_proof(&[5, 7]).unwrap();
        let mut flags = multi.proof_flags.clone();
        flags.push(false);
        assert!(!CompleteBinaryMerkleTree::verify_multi_proof(
            &tree.root(),
            &multi.leaves,
            &multi.proof,
            &flags
        ));
        let mut forged = multi.leaves.clone();
        forged[0] = B256::repeat_byte(1);
        assert!(!CompleteBinaryMerkleTree::verify_multi_proof(
            &tree.root(),
            &forged,
            &multi.proof,
            &multi.proof_flags
        ));
        assert_eq!(tree.get_multi_proof(&[0]), Err(MerkleError::IndexOutOfRange(0)));
    }

    #[test]
    fn test_from_nodes_checks_hashes() {
        let tree = CompleteBinaryMerkleTree::new(&leaves(3)).unwrap();
        let rebuilt = CompleteBinaryMerkleTree::from_nodes(tree.nodes().to_vec()).unwrap();
        assert_eq!(rebuilt, tree);

        let mut nodes = tree.nodes().to_vec();
        nodes[1] = B256::repeat_byte(3);
        assert_eq!(CompleteBinaryMerkleTree::from_nodes(nodes), Err(MerkleError::InvalidTree));
    }
}
