//! Common types

use std::fmt;

pub use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// One call of an EVM script: the contract to call and the ABI encoded input
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallScriptItem {
    pub target: Address,
    pub calldata: Bytes,
}

impl CallScriptItem {
    pub fn new(target: Address, calldata: impl Into<Bytes>) -> Self {
        Self {
            target,
            calldata: calldata.into(),
        }
    }

    /// First four bytes of the calldata, if present
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.calldata.get(..4).map(|s| [s[0], s[1], s[2], s[3]])
    }
}

impl fmt::Display for CallScriptItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- 0x{}", self.target, hex::encode(&self.calldata))
    }
}

/// Ten to the power of `exp` as a 256-bit integer
pub fn pow10(exp: u64) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

/// Whole token amount scaled to 18 decimals
pub fn ether(amount: u64) -> U256 {
    U256::from(amount) * pow10(18)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_of_short_calldata() {
        let item = CallScriptItem::new(Address::ZERO, vec![0xde, 0xad]);
        assert_eq!(item.selector(), None);

        let item = CallScriptItem::new(Address::ZERO, vec![0xa9, 0x05, 0x9c, 0xbb, 0x00]);
        assert_eq!(item.selector(), Some([0xa9, 0x05, 0x9c, 0xbb]));
    }

    #[test]
    fn test_ether() {
        assert_eq!(ether(1).to_string(), "1000000000000000000");
        assert_eq!(pow10(27).to_string(), format!("1{}", "0".repeat(27)));
    }
}
