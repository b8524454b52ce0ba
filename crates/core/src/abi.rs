//! Dynamic Solidity ABI helpers
//!
//! Fixed contract interfaces are declared with `alloy_sol_types::sol!`. This
//! module covers the cases where types are only known at runtime: leaf
//! encodings read from a tree dump, known signatures used to render vote
//! items, and raw `eth_call` results.

use std::fmt;

pub use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Bytes, U256};
use thiserror::Error;

use crate::hash::selector;

/// ABI word size in bytes
pub const WORD: usize = 32;

/// ABI codec errors
#[derive(Debug, Error)]
pub enum AbiError {
    #[error(transparent)]
    Codec(#[from] alloy_dyn_abi::Error),
    #[error("invalid function signature: {0}")]
    InvalidSignature(String),
    #[error("value does not match ABI type {expected}: {value}")]
    TypeMismatch { expected: String, value: String },
    #[error("calldata is shorter than a selector")]
    MissingSelector,
    #[error("selector mismatch: expected 0x{expected}, got 0x{got}")]
    SelectorMismatch { expected: String, got: String },
}

/// Parse a canonical Solidity type, e.g. `(address,uint96,bytes)[]`
pub fn parse_type(s: &str) -> Result<DynSolType, AbiError> {
    Ok(DynSolType::parse(s.trim())?)
}

/// `abi.encode(values...)`
pub fn encode(values: &[DynSolValue]) -> Vec<u8> {
    DynSolValue::Tuple(values.to_vec()).abi_encode_params()
}

/// Decode `abi.encode` output for the given types
pub fn decode(types: &[DynSolType], data: &[u8]) -> Result<Vec<DynSolValue>, AbiError> {
    match DynSolType::Tuple(types.to_vec()).abi_decode_params(data)? {
        DynSolValue::Tuple(values) => Ok(values),
        other => Ok(vec![other]),
    }
}

/// Selector of `signature` followed by the encoded arguments
///
/// Every argument is checked against the signature before encoding.
pub fn encode_call(signature: &str, args: &[DynSolValue]) -> Result<Bytes, AbiError> {
    let (_, types) = parse_signature(signature)?;
    if types.len() != args.len() {
        return Err(AbiError::InvalidSignature(format!(
            "{signature} takes {} arguments, got {}",
            types.len(),
            args.len()
        )));
    }
    for (ty, value) in types.iter().zip(args) {
        if !type_check(value, ty) {
            return Err(AbiError::TypeMismatch {
                expected: ty.to_string(),
                value: Formatted(value).to_string(),
            });
        }
    }
    let mut calldata = selector(signature).to_vec();
    calldata.extend_from_slice(&encode(args));
    Ok(calldata.into())
}

/// Parse `name(type1,type2,...)` into its name and argument types
pub fn parse_signature(signature: &str) -> Result<(&str, Vec<DynSolType>), AbiError> {
    let invalid = || AbiError::InvalidSignature(signature.to_string());
    let open = signature.find('(').ok_or_else(invalid)?;
    let args = &signature[open..];
    if !args.ends_with(')') {
        return Err(invalid());
    }
    if args == "()" {
        return Ok((&signature[..open], Vec::new()));
    }
    match DynSolType::parse(args).map_err(|_| invalid())? {
        DynSolType::Tuple(types) => Ok((&signature[..open], types)),
        _ => Err(invalid()),
    }
}

/// Check the selector of `calldata` against `signature` and decode the arguments
pub fn decode_call(signature: &str, calldata: &[u8]) -> Result<Vec<DynSolValue>, AbiError> {
    let (_, types) = parse_signature(signature)?;
    let expected = selector(signature);
    let got = calldata.get(..4).ok_or(AbiError::MissingSelector)?;
    if got != expected {
        return Err(AbiError::SelectorMismatch {
            expected: hex::encode(expected),
            got: hex::encode(got),
        });
    }
    decode(&types, &calldata[4..])
}

/// Check that `value` can be encoded as `ty` without truncation
///
/// Integers must fit the bit width of `ty`, fixed bytes must not carry data
/// past their length and container lengths must agree.
pub fn type_check(value: &DynSolValue, ty: &DynSolType) -> bool {
    match (value, ty) {
        (DynSolValue::Address(_), DynSolType::Address)
        | (DynSolValue::Bool(_), DynSolType::Bool)
        | (DynSolValue::Bytes(_), DynSolType::Bytes)
        | (DynSolValue::String(_), DynSolType::String) => true,
        (DynSolValue::Uint(v, _), DynSolType::Uint(bits)) => v.bit_len() <= *bits,
        (DynSolValue::Int(v, _), DynSolType::Int(bits)) => int_fits(v.into_raw(), *bits),
        (DynSolValue::FixedBytes(word, _), DynSolType::FixedBytes(len)) => {
            word[*len..].iter().all(|b| *b == 0)
        }
        (DynSolValue::Array(items), DynSolType::Array(inner)) => {
            items.iter().all(|item| type_check(item, inner))
        }
        (DynSolValue::FixedArray(items), DynSolType::FixedArray(inner, len)) => {
            items.len() == *len && items.iter().all(|item| type_check(item, inner))
        }
        (DynSolValue::Tuple(items), DynSolType::Tuple(types)) => {
            items.len() == types.len() && items.iter().zip(types).all(|(item, ty)| type_check(item, ty))
        }
        _ => false,
    }
}

/// Two's complement `raw` sign extends from `bits`
fn int_fits(raw: U256, bits: usize) -> bool {
    if bits == 0 || bits > 256 {
        return false;
    }
    let high = raw >> (bits - 1);
    high == U256::ZERO || high == U256::MAX >> (bits - 1)
}

/// Human readable rendering of a value
#[derive(Clone, Copy, Debug)]
pub struct Formatted<'a>(pub &'a DynSolValue);

impl fmt::Display for Formatted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            DynSolValue::Address(a) => write!(f, "{a}"),
            DynSolValue::Bool(b) => write!(f, "{b}"),
            DynSolValue::Uint(v, _) => write!(f, "{v}"),
            DynSolValue::Int(v, _) => write!(f, "{v}"),
            DynSolValue::FixedBytes(word, len) => write!(f, "0x{}", hex::encode(&word[..*len])),
            DynSolValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            DynSolValue::String(s) => write!(f, "{s:?}"),
            DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
                write!(f, "[")?;
                write_joined(f, items)?;
                write!(f, "]")
            }
            DynSolValue::Tuple(items) => {
                write!(f, "(")?;
                write_joined(f, items)?;
                write!(f, ")")
            }
            other => write!(f, "{other:?}"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[DynSolValue]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", Formatted(item))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, I256};
    use alloy_sol_types::SolValue;

    fn word(hex_str: &str) -> String {
        format!("{hex_str:0>64}")
    }

    fn uint(v: u64) -> DynSolValue {
        DynSolValue::Uint(U256::from(v), 256)
    }

    fn int(v: i64, bits: usize) -> DynSolValue {
        DynSolValue::Int(I256::try_from(v).unwrap(), bits)
    }

    #[test]
    fn test_encode_matches_static_interface_encoding() {
        let dynamic = encode(&[uint(7), DynSolValue::Bytes(vec![0xab, 0xcd])]);
        let typed = (U256::from(7u64), alloy_primitives::Bytes::from(vec![0xab, 0xcd])).abi_encode_params();
        assert_eq!(dynamic, typed);
        let expected = format!("{}{}{}{:0<64}", word("7"), word("40"), word("2"), "abcd");
        assert_eq!(hex::encode(dynamic), expected);
    }

    #[test]
    fn test_encode_call_transfer() {
        let to: Address = "0x00000000000000000000000000000000000000ff".parse().unwrap();
        let calldata = encode_call("transfer(address,uint256)", &[DynSolValue::Address(to), uint(1)]).unwrap();
        assert_eq!(hex::encode(&calldata), format!("a9059cbb{}{}", word("ff"), word("1")));
    }

    #[test]
    fn test_encode_call_checks_arguments() {
        assert!(matches!(
            encode_call("executeVote(uint256)", &[]),
            Err(AbiError::InvalidSignature(_))
        ));
        assert!(matches!(
            encode_call("unsafelyChangeVoteTime(uint64)", &[uint(1), uint(0)]),
            Err(AbiError::InvalidSignature(_))
        ));
        assert!(matches!(
            encode_call("setLimit(uint8)", &[uint(256)]),
            Err(AbiError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_nested() {
        let ty = parse_type("(address,uint96,bytes)[]").unwrap();
        let calls = DynSolValue::Array(vec![
            DynSolValue::Tuple(vec![
                DynSolValue::Address(Address::repeat_byte(0x11)),
                DynSolValue::Uint(U256::ZERO, 96),
                DynSolValue::Bytes(vec![1, 2, 3]),
            ]),
            DynSolValue::Tuple(vec![
                DynSolValue::Address(Address::repeat_byte(0x22)),
                DynSolValue::Uint(U256::from(5u64), 96),
                DynSolValue::Bytes(vec![0xee; 40]),
            ]),
        ]);
        let args = [calls, DynSolValue::String("description".into())];
        let decoded = decode(&[ty, DynSolType::String], &encode(&args)).unwrap();
        assert_eq!(decoded, args);
    }

    #[test]
    fn test_decode_call_rejects_other_selector() {
        let calldata = encode_call("executeVote(uint256)", &[uint(3)]).unwrap();
        assert_eq!(decode_call("executeVote(uint256)", &calldata).unwrap(), vec![uint(3)]);
        assert!(matches!(
            decode_call("vote(uint256,bool,bool)", &calldata),
            Err(AbiError::SelectorMismatch { .. })
        ));
        assert!(matches!(decode_call("executeVote(uint256)", &[0xf9]), Err(AbiError::MissingSelector)));
    }

    #[test]
    fn test_decode_truncated() {
        let encoded = encode(&[DynSolValue::Bytes(vec![1u8; 40])]);
        assert!(decode(&[DynSolType::Bytes], &encoded[..70]).is_err());
    }

    #[test]
    fn test_type_check_uint_width() {
        assert!(type_check(&uint(255), &DynSolType::Uint(8)));
        assert!(!type_check(&uint(256), &DynSolType::Uint(8)));
        assert!(type_check(&DynSolValue::Uint(U256::MAX, 256), &DynSolType::Uint(256)));
        assert!(!type_check(&DynSolValue::Bool(true), &DynSolType::Uint(256)));
        assert!(type_check(
            &DynSolValue::Array(vec![uint(1), uint(2)]),
            &parse_type("uint256[]").unwrap()
        ));
    }

    #[test]
    fn test_type_check_int_width() {
        let int8 = DynSolType::Int(8);
        assert!(type_check(&int(127, 256), &int8));
        assert!(type_check(&int(-128, 256), &int8));
        assert!(!type_check(&int(128, 256), &int8));
        assert!(!type_check(&int(-129, 256), &int8));
        assert!(type_check(&DynSolValue::Int(I256::MIN, 256), &DynSolType::Int(256)));
        assert!(type_check(&DynSolValue::Int(I256::MAX, 256), &DynSolType::Int(256)));
        assert!(!type_check(&DynSolValue::Int(I256::MIN, 256), &DynSolType::Int(128)));
    }

    #[test]
    fn test_type_check_fixed_bytes_length() {
        let mut word = alloy_primitives::B256::ZERO;
        word[0] = 0xaa;
        assert!(type_check(&DynSolValue::FixedBytes(word, 1), &DynSolType::FixedBytes(1)));
        word[1] = 0xbb;
        assert!(!type_check(&DynSolValue::FixedBytes(word, 2), &DynSolType::FixedBytes(1)));
    }

    #[test]
    fn test_parse_signature() {
        let (name, types) = parse_signature("submitProposal((address,uint96,bytes)[],string)").unwrap();
        assert_eq!(name, "submitProposal");
        assert_eq!(types.len(), 2);
        let (name, types) = parse_signature("activateNextState()").unwrap();
        assert_eq!(name, "activateNextState");
        assert!(types.is_empty());
        assert!(parse_signature("noParens").is_err());
        assert!(parse_signature("bad(uint7)").is_err());
    }

    #[test]
    fn test_formatted() {
        let value = DynSolValue::Tuple(vec![
            uint(5),
            DynSolValue::Bytes(vec![0xab]),
            DynSolValue::Array(vec![DynSolValue::Bool(true), DynSolValue::String("x".into())]),
            int(-3, 256),
        ]);
        assert_eq!(Formatted(&value).to_string(), "(5, 0xab, [true, \"x\"], -3)");
    }
}
