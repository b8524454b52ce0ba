//! Aragon ACL permission parameters
//!
//! A parameter packs `id (uint8) | op (uint8) | value (uint240)` into one
//! `uint256`. Op codes and special argument ids must match the deployed ACL.
//! See <https://hack.aragon.org/docs/aragonos-ref#parameter-interpretation>.

use std::fmt;

use alloy_primitives::{Address, U256};
use thiserror::Error;

/// `enum Op { NONE, EQ, NEQ, GT, LT, GTE, LTE, RET, NOT, AND, OR, XOR, IF_ELSE }`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Op {
    None = 0,
    Eq = 1,
    Neq = 2,
    Gt = 3,
    Lt = 4,
    Gte = 5,
    Lte = 6,
    Ret = 7,
    Not = 8,
    And = 9,
    Or = 10,
    Xor = 11,
    IfElse = 12,
}

impl TryFrom<u8> for Op {
    type Error = PermissionParamError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::None,
            1 => Self::Eq,
            2 => Self::Neq,
            3 => Self::Gt,
            4 => Self::Lt,
            5 => Self::Gte,
            6 => Self::Lte,
            7 => Self::Ret,
            8 => Self::Not,
            9 => Self::And,
            10 => Self::Or,
            11 => Self::Xor,
            12 => Self::IfElse,
            other => return Err(PermissionParamError::UnknownOp(other)),
        })
    }
}

/// Argument ids above 200 select special comparison sources
pub mod argument_id {
    pub const BLOCK_NUMBER: u8 = 200;
    pub const TIMESTAMP: u8 = 201;
    /// auth call to IACLOracle
    pub const ORACLE: u8 = 203;
    pub const LOGIC_OP: u8 = 204;
    /// plain value for use with `Op::Ret`
    pub const PARAM_VALUE: u8 = 205;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PermissionParamError {
    #[error("unknown ACL op code {0}")]
    UnknownOp(u8),
    #[error("invalid argument value: {0}")]
    InvalidValue(String),
}

/// Comparison value truncated to 240 bits
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ArgumentValue(U256);

impl ArgumentValue {
    pub fn new(value: U256) -> Self {
        Self(value & uint240_mask())
    }

    /// Parse a decimal or `0x` prefixed hex string
    pub fn parse(value: &str) -> Result<Self, PermissionParamError> {
        let parsed = match value.strip_prefix("0x") {
            Some(hex) => U256::from_str_radix(hex, 16),
            None => U256::from_str_radix(value, 10),
        };
        parsed
            .map(Self::new)
            .map_err(|_| PermissionParamError::InvalidValue(value.to_string()))
    }

    pub const fn get(self) -> U256 {
        self.0
    }
}

impl From<U256> for ArgumentValue {
    fn from(value: U256) -> Self {
        Self::new(value)
    }
}

impl From<u64> for ArgumentValue {
    fn from(value: u64) -> Self {
        Self::new(U256::from(value))
    }
}

impl From<Address> for ArgumentValue {
    fn from(value: Address) -> Self {
        Self::new(U256::from_be_slice(value.as_slice()))
    }
}

fn uint240_mask() -> U256 {
    (U256::from(1u64) << 240) - U256::from(1u64)
}

/// ACL permission parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Param {
    pub id: u8,
    pub op: Op,
    pub value: ArgumentValue,
}

impl Param {
    pub fn new(id: u8, op: Op, value: impl Into<ArgumentValue>) -> Self {
        Self {
            id,
            op,
            value: value.into(),
        }
    }

    /// `(id << 248) + (op << 240) + value`
    pub fn to_uint256(&self) -> U256 {
        (U256::from(self.id) << 248) + (U256::from(self.op as u8) << 240) + self.value.get()
    }

    /// Inverse of [`Param::to_uint256`]
    pub fn parse(raw: U256) -> Result<Self, PermissionParamError> {
        let bytes = raw.to_be_bytes::<32>();
        Ok(Self {
            id: bytes[0],
            op: Op::try_from(bytes[1])?,
            value: ArgumentValue::new(raw),
        })
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Param(id={}, op={:?}, value={})", self.id, self.op, self.value.get())
    }
}

/// Encode parameters in the order the ACL evaluates them
pub fn encode_permission_params(params: &[Param]) -> Vec<U256> {
    params.iter().map(Param::to_uint256).collect()
}

/// Value of a logic op parameter: indices of its left and right operands
pub fn encode_argument_value_op(left: u32, right: u32) -> ArgumentValue {
    encode_argument_value_if(left, right, 0)
}

/// Value of an `IF_ELSE` parameter: indices of the condition and both branches
pub fn encode_argument_value_if(condition: u32, success: u32, failure: u32) -> ArgumentValue {
    let value = U256::from(condition) + (U256::from(success) << 32) + (U256::from(failure) << 64);
    ArgumentValue::new(value)
}
