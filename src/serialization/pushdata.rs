//! Script push-data encoding
//!
//! Variable-length state fields (item names) are embedded in the locking
//! script as minimal data pushes:
//! - empty data: `OP_0`
//! - 1..=75 bytes: single length byte
//! - up to 0xff bytes: `OP_PUSHDATA1` + 1-byte length
//! - up to 0xffff bytes: `OP_PUSHDATA2` + 2-byte length (little-endian)
//! - otherwise: `OP_PUSHDATA4` + 4-byte length (little-endian)

use super::reader::ByteReader;
use crate::error::{MarketplaceError, Result};
use crate::opcodes::{OP_0, OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4};
use std::borrow::Cow;

/// Append a minimal push of `data` to `script`
pub fn write_push(script: &mut Vec<u8>, data: &[u8]) -> Result<()> {
    let len = data.len();
    match len {
        0 => script.push(OP_0),
        1..=0x4b => script.push(len as u8),
        0x4c..=0xff => {
            script.push(OP_PUSHDATA1);
            script.push(len as u8);
        }
        0x100..=0xffff => {
            script.push(OP_PUSHDATA2);
            script.extend_from_slice(&(len as u16).to_le_bytes());
        }
        _ => {
            let len = u32::try_from(len).map_err(|_| {
                MarketplaceError::Serialization(Cow::Owned(format!(
                    "Push of {len} bytes exceeds OP_PUSHDATA4 range"
                )))
            })?;
            script.push(OP_PUSHDATA4);
            script.extend_from_slice(&len.to_le_bytes());
        }
    }
    script.extend_from_slice(data);
    Ok(())
}

/// Size of the push header `write_push` emits for `len` data bytes
pub fn push_header_len(len: usize) -> usize {
    match len {
        0..=0x4b => 1,
        0x4c..=0xff => 2,
        0x100..=0xffff => 3,
        _ => 5,
    }
}

/// Read one data push, rejecting non-minimal encodings
pub fn read_push<'a>(reader: &mut ByteReader<'a>) -> Result<&'a [u8]> {
    let opcode = reader.read_u8()?;
    let (len, minimum) = match opcode {
        OP_0 => return Ok(&[]),
        1..=0x4b => (opcode as usize, 1),
        OP_PUSHDATA1 => (reader.read_u8()? as usize, 0x4c),
        OP_PUSHDATA2 => (reader.read_u16_le()? as usize, 0x100),
        OP_PUSHDATA4 => (reader.read_u32_le()? as usize, 0x10000),
        other => {
            return Err(MarketplaceError::Serialization(Cow::Owned(format!(
                "Expected data push, found opcode 0x{other:02x}"
            ))))
        }
    };
    if len < minimum {
        return Err(MarketplaceError::Serialization(Cow::Owned(format!(
            "Non-minimal push of {len} bytes with opcode 0x{opcode:02x}"
        ))));
    }
    reader.take(len)
}
