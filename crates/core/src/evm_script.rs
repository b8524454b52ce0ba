//! Aragon EVM call script (spec id 1)
//!
//! Layout: `spec_id (4 bytes)` followed by repeated
//! `target (20 bytes) | calldata length (4 bytes, big endian) | calldata`.

use alloy_primitives::{Address, Bytes};
use thiserror::Error;

use crate::types::CallScriptItem;

/// Spec id of the call script executor
pub const CALLSCRIPT_SPEC_ID: u32 = 1;

/// Call script with no calls
pub const EMPTY_CALLSCRIPT: [u8; 4] = CALLSCRIPT_SPEC_ID.to_be_bytes();

const ADDRESS_LEN: usize = 20;
const LENGTH_LEN: usize = 4;

/// Call script decoding errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvmScriptError {
    #[error("call script is shorter than its spec id")]
    TooShort,
    #[error("unsupported call script spec id: {0}")]
    UnsupportedSpecId(u32),
    #[error("truncated call script item header at offset {0}")]
    TruncatedHeader(usize),
    #[error("call script item at offset {offset} declares {declared} bytes of calldata, {available} available")]
    TruncatedCalldata {
        offset: usize,
        declared: usize,
        available: usize,
    },
    #[error("calldata of {0} bytes does not fit the 4 byte length field")]
    CalldataTooLong(usize),
}

/// Pack calls into a spec id 1 call script
pub fn encode_call_script(items: &[CallScriptItem]) -> Result<Bytes, EvmScriptError> {
    let size = items
        .iter()
        .map(|i| ADDRESS_LEN + LENGTH_LEN + i.calldata.len())
        .sum::<usize>();
    let mut script = Vec::with_capacity(EMPTY_CALLSCRIPT.len() + size);
    script.extend_from_slice(&EMPTY_CALLSCRIPT);
    for item in items {
        script.extend_from_slice(item.target.as_slice());
        script.extend_from_slice(&length_field(item.calldata.len())?);
        script.extend_from_slice(&item.calldata);
    }
    Ok(script.into())
}

fn length_field(len: usize) -> Result<[u8; LENGTH_LEN], EvmScriptError> {
    u32::try_from(len)
        .map(u32::to_be_bytes)
        .map_err(|_| EvmScriptError::CalldataTooLong(len))
}

/// Unpack a spec id 1 call script
pub fn decode_call_script(script: &[u8]) -> Result<Vec<CallScriptItem>, EvmScriptError> {
    let spec_id = script
        .get(..4)
        .map(|s| u32::from_be_bytes([s[0], s[1], s[2], s[3]]))
        .ok_or(EvmScriptError::TooShort)?;
    if spec_id != CALLSCRIPT_SPEC_ID {
        return Err(EvmScriptError::UnsupportedSpecId(spec_id));
    }

    let mut items = Vec::new();
    let mut offset = 4;
    while offset < script.len() {
        let header = script
            .get(offset..offset + ADDRESS_LEN + LENGTH_LEN)
            .ok_or(EvmScriptError::TruncatedHeader(offset))?;
        let target = Address::from_slice(&header[..ADDRESS_LEN]);
        let len = u32::from_be_bytes([header[20], header[21], header[22], header[23]]) as usize;

        let start = offset + ADDRESS_LEN + LENGTH_LEN;
        let calldata = script
            .get(start..start + len)
            .ok_or(EvmScriptError::TruncatedCalldata {
                offset,
                declared: len,
                available: script.len() - start,
            })?;
        items.push(CallScriptItem::new(target, calldata.to_vec()));
        offset = start + len;
    }
    Ok(items)
}

/// Whether `data` starts with the spec id 1 prefix
pub fn is_call_script(data: &[u8]) -> bool {
    data.starts_with(&EMPTY_CALLSCRIPT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(byte: u8, calldata: &[u8]) -> CallScriptItem {
        CallScriptItem::new(Address::repeat_byte(byte), calldata.to_vec())
    }

    #[test]
    fn test_empty_script() {
        assert_eq!(&encode_call_script(&[]).unwrap()[..], &[0u8, 0, 0, 1]);
        assert!(decode_call_script(&EMPTY_CALLSCRIPT).unwrap().is_empty());
    }

    #[test]
    fn test_layout() {
        let script = encode_call_script(&[item(0xaa, &[1, 2, 3])]).unwrap();
        let expected = format!("00000001{}00000003010203", "aa".repeat(20));
        assert_eq!(hex::encode(&script), expected);
    }

    #[test]
    fn test_decode_multiple_items() {
        let items = vec![item(0x01, &[0xde, 0xad, 0xbe, 0xef]), item(0x02, &[]), item(0x03, &[7; 100])];
        let script = encode_call_script(&items).unwrap();
        assert_eq!(decode_call_script(&script).unwrap(), items);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode_call_script(&[0, 0]), Err(EvmScriptError::TooShort));
        assert_eq!(
            decode_call_script(&[0, 0, 0, 2]),
            Err(EvmScriptError::UnsupportedSpecId(2))
        );

        let script = encode_call_script(&[item(0x01, &[1, 2, 3, 4])]).unwrap();
        assert_eq!(
            decode_call_script(&script[..10]),
            Err(EvmScriptError::TruncatedHeader(4))
        );
        assert!(matches!(
            decode_call_script(&script[..script.len() - 1]),
            Err(EvmScriptError::TruncatedCalldata { declared: 4, available: 3, .. })
        ));
    }

    #[test]
    fn test_length_field_bounds() {
        assert_eq!(length_field(3).unwrap(), [0, 0, 0, 3]);
        assert_eq!(length_field(u32::MAX as usize).unwrap(), [0xff; 4]);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(
            length_field(u32::MAX as usize + 1),
            Err(EvmScriptError::CalldataTooLong(u32::MAX as usize + 1))
        );
    }
}
