//! Core codecs for Lido DAO governance tooling
//!
//! This crate contains the byte-exact encoders shared by every vote script:
//! - Solidity ABI helpers for runtime typed values
//! - Aragon EVM call scripts
//! - Aragon ACL permission parameters
//! - Accounting and exit bus oracle report tuples, extra data chains

pub mod abi;
pub mod evm_script;
pub mod extra_data;
pub mod hash;
pub mod oracle_report;
pub mod permission_params;
pub mod types;

pub use abi::{AbiError, DynSolType, DynSolValue};
pub use evm_script::{decode_call_script, encode_call_script, is_call_script, EvmScriptError, EMPTY_CALLSCRIPT};
pub use hash::{keccak256, role_id, selector};
pub use types::*;
