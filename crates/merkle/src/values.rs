//! JSON representation of leaf values
//!
//! Integers map to JSON numbers of arbitrary size (decimal or `0x` strings
//! are accepted when reading), byte strings and addresses to `0x` hex.

use std::str::FromStr;

use alloy_primitives::{Address, B256, I256, U256};
use lido_core::abi::{type_check, Formatted};
use lido_core::{DynSolType, DynSolValue};
use serde_json::{Number, Value};

use crate::MerkleError;

/// Convert a JSON value into a value of type `ty`
///
/// Integers out of the range of `ty` are rejected.
pub fn value_from_json(ty: &DynSolType, value: &Value) -> Result<DynSolValue, MerkleError> {
    let invalid = || MerkleError::InvalidValue(format!("{value} is not a valid {ty}"));

    let parsed = match ty {
        DynSolType::Uint(bits) => parse_uint(value).map(|v| DynSolValue::Uint(v, *bits)),
        DynSolType::Int(bits) => parse_int(value).map(|v| DynSolValue::Int(v, *bits)),
        DynSolType::Address => value
            .as_str()
            .and_then(|s| Address::from_str(s).ok())
            .map(DynSolValue::Address),
        DynSolType::Bool => value.as_bool().map(DynSolValue::Bool),
        DynSolType::String => value.as_str().map(|s| DynSolValue::String(s.to_string())),
        DynSolType::Bytes => parse_hex(value).map(DynSolValue::Bytes),
        DynSolType::FixedBytes(len) => parse_hex(value)
            .filter(|b| b.len() == *len)
            .map(|b| DynSolValue::FixedBytes(B256::right_padding_from(&b), *len)),
        DynSolType::Array(inner) => {
            let items = value.as_array().ok_or_else(invalid)?;
            return items
                .iter()
                .map(|item| value_from_json(inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::Array);
        }
        DynSolType::FixedArray(inner, len) => {
            let items = value.as_array().filter(|a| a.len() == *len).ok_or_else(invalid)?;
            return items
                .iter()
                .map(|item| value_from_json(inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::FixedArray);
        }
        DynSolType::Tuple(types) => {
            let items = value
                .as_array()
                .filter(|a| a.len() == types.len())
                .ok_or_else(invalid)?;
            return types
                .iter()
                .zip(items)
                .map(|(ty, item)| value_from_json(ty, item))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::Tuple);
        }
        _ => None,
    };

    parsed.filter(|v| type_check(v, ty)).ok_or_else(invalid)
}

/// Convert a value into its JSON form
pub fn value_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Uint(v, _) => number(v.to_string()),
        DynSolValue::Int(v, _) => number(v.to_string()),
        DynSolValue::Address(a) => Value::String(a.to_checksum(None)),
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Bytes(b) => Value::String(format!("0x{}", hex::encode(b))),
        DynSolValue::FixedBytes(word, len) => Value::String(format!("0x{}", hex::encode(&word[..*len]))),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(value_to_json).collect())
        }
        other => Value::String(Formatted(other).to_string()),
    }
}

fn number(digits: String) -> Value {
    Number::from_str(&digits)
        .map(Value::Number)
        .unwrap_or(Value::String(digits))
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn parse_uint(value: &Value) -> Option<U256> {
    let text = text(value)?;
    match text.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16).ok(),
        None => U256::from_str_radix(&text, 10).ok(),
    }
}

fn parse_int(value: &Value) -> Option<I256> {
    I256::from_dec_str(&text(value)?).ok()
}

fn parse_hex(value: &Value) -> Option<Vec<u8>> {
    value
        .as_str()
        .and_then(|s| s.strip_prefix("0x"))
        .and_then(|s| hex::decode(s).ok())
}
