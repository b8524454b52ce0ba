//! Keccak-256 helpers

use alloy_primitives::B256;
use tiny_keccak::{Hasher, Keccak};

/// Compute keccak256 hash
pub fn keccak256(data: impl AsRef<[u8]>) -> B256 {
    let mut hasher = Keccak::v256();
    hasher.update(data.as_ref());
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    B256::from(output)
}

/// Function selector: first four bytes of the signature hash
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Aragon and OpenZeppelin role identifier
///
/// A misspelled name yields a different, valid looking identifier.
pub fn role_id(name: &str) -> B256 {
    keccak256(name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_hash() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_selector() {
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(hex::encode(selector("forward(bytes)")), "d948d468");
    }

    #[test]
    fn test_role_id() {
        assert_eq!(
            hex::encode(role_id("BURN_ROLE")),
            "e97b137254058bd94f28d2f3eb79e2d34074ffb488d042e3bc958e0a57d2fa22"
        );
        assert_ne!(role_id("BURN_ROLE"), role_id("BURN_R0LE"));
    }
}
