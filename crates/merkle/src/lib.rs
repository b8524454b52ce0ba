//! Standard Merkle Trees for Lido reward distribution
//!
//! This crate implements the OpenZeppelin `standard-v1` tree:
//! - Sorted, double hashed leaves over ABI encoded values
//! - Commutative Keccak256 node hashing
//! - Single and multi leaf proofs
//! - JSON dump format shared with the CSM oracle

mod hasher;
mod standard;
mod tree;
mod trees;
mod values;

pub use hasher::Keccak256Hasher;
pub use standard::{DumpValue, StandardMerkleTree, StandardTreeDump, StandardValue, FORMAT};
pub use tree::{CompleteBinaryMerkleTree, MultiProof};
pub use trees::{IcsTree, RewardsTree, StrikesTree};
pub use values::{value_from_json, value_to_json};

use lido_core::AbiError;
use thiserror::Error;

/// Merkle tree errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("Attempt to create an empty tree")]
    EmptyTree,
    #[error("Node not found")]
    NodeNotFound,
    #[error("node index {0} is out of range")]
    IndexOutOfRange(usize),
    #[error("node hashes do not form a valid tree")]
    InvalidTree,
    #[error("Unexpected dump format value")]
    UnexpectedFormat,
    #[error("No leaf encoding provided")]
    MissingLeafEncoding,
    #[error("No values provided")]
    MissingValues,
    #[error("Unsupported tree format")]
    UnsupportedFormat,
    #[error("invalid leaf value: {0}")]
    InvalidValue(String),
    #[error("{0}")]
    Abi(String),
    #[error("tree serialization failed: {0}")]
    Serialization(String),
}

impl From<AbiError> for MerkleError {
    fn from(err: AbiError) -> Self {
        Self::Abi(err.to_string())
    }
}
