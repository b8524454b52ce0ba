//! Keccak256 hasher for standard Merkle trees

use alloy_primitives::B256;
use tiny_keccak::{Hasher, Keccak};

/// Keccak256 hasher
#[derive(Clone, Copy, Debug)]
pub struct Keccak256Hasher;

impl Keccak256Hasher {
    /// Hash a single value
    pub fn hash(data: &[u8]) -> B256 {
        let mut hasher = Keccak::v256();
        hasher.update(data);
        let mut output = [0u8; 32];
        hasher.finalize(&mut output);
        B256::from(output)
    }

    /// Leaf hash of ABI encoded data: `keccak256(keccak256(data))`
    ///
    /// Double hashing keeps leaves from colliding with 64-byte internal nodes.
    pub fn hash_leaf(encoded: &[u8]) -> B256 {
        Self::hash(Self::hash(encoded).as_slice())
    }

    /// Commutative node hash: children are ordered before hashing
    pub fn hash_node(lhs: &B256, rhs: &B256) -> B256 {
        let (low, high) = if lhs <= rhs { (lhs, rhs) } else { (rhs, lhs) };
        let mut hasher = Keccak::v256();
        hasher.update(low.as_slice());
        hasher.update(high.as_slice());
        let mut output = [0u8; 32];
        hasher.finalize(&mut output);
        B256::from(output)
    }
}
