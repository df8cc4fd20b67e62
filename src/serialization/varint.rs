//! Bitcoin VarInt (CompactSize) encoding/decoding
//!
//! Encoding rules:
//! - If value < 0xfd: single byte
//! - If value <= 0xffff: 0xfd prefix + 2 bytes (little-endian)
//! - If value <= 0xffffffff: 0xfe prefix + 4 bytes (little-endian)
//! - Otherwise: 0xff prefix + 8 bytes (little-endian)
//!
//! Output script lengths are committed through this encoding, so a
//! non-canonical length prefix would change the commitment hash. Decoding
//! therefore rejects any value that was not encoded in its shortest form.

use crate::error::{MarketplaceError, Result};
use std::borrow::Cow;

/// Error type for VarInt decoding failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarIntError {
    /// Insufficient bytes to decode VarInt
    InsufficientBytes,
    /// Value was not encoded in its shortest form
    NonCanonical,
}

impl std::fmt::Display for VarIntError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarIntError::InsufficientBytes => write!(f, "Insufficient bytes to decode VarInt"),
            VarIntError::NonCanonical => write!(f, "Non-canonical VarInt encoding"),
        }
    }
}

impl std::error::Error for VarIntError {}

impl From<VarIntError> for MarketplaceError {
    fn from(err: VarIntError) -> Self {
        MarketplaceError::Serialization(Cow::Owned(err.to_string()))
    }
}

/// Append the VarInt encoding of `value` to `out`
pub fn write_varint(out: &mut Vec<u8>, value: u64) {
    match value {
        0..=0xfc => out.push(value as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(value as u16).to_le_bytes());
        }
        0x10000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(value as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
}

/// Encode a u64 value as a Bitcoin VarInt
///
/// # Examples
///
/// ```
/// use marketplace_covenant::serialization::varint::encode_varint;
///
/// assert_eq!(encode_varint(0), vec![0]);
/// assert_eq!(encode_varint(252), vec![252]);
/// assert_eq!(encode_varint(253), vec![0xfd, 253, 0]);
/// assert_eq!(encode_varint(65536), vec![0xfe, 0, 0, 1, 0]);
/// ```
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut result = Vec::with_capacity(9);
    write_varint(&mut result, value);
    result
}

/// Number of bytes `encode_varint(value)` produces
pub fn varint_len(value: u64) -> usize {
    match value {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x10000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Decode a Bitcoin VarInt from bytes
///
/// Returns the decoded value and the number of bytes consumed.
///
/// ```
/// use marketplace_covenant::serialization::varint::decode_varint;
///
/// assert_eq!(decode_varint(&[252]), Ok((252, 1)));
/// assert_eq!(decode_varint(&[0xfd, 253, 0]), Ok((253, 3)));
/// assert!(decode_varint(&[0xfd, 252, 0]).is_err());
/// ```
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize)> {
    let (&first_byte, rest) = data.split_first().ok_or(VarIntError::InsufficientBytes)?;

    let (value, width, minimum) = match first_byte {
        b if b < 0xfd => return Ok((b as u64, 1)),
        0xfd => {
            let bytes: [u8; 2] = take_array(rest)?;
            (u16::from_le_bytes(bytes) as u64, 3, 0xfd)
        }
        0xfe => {
            let bytes: [u8; 4] = take_array(rest)?;
            (u32::from_le_bytes(bytes) as u64, 5, 0x10000)
        }
        _ => {
            let bytes: [u8; 8] = take_array(rest)?;
            (u64::from_le_bytes(bytes), 9, 0x1_0000_0000)
        }
    };

    if value < minimum {
        return Err(VarIntError::NonCanonical.into());
    }
    Ok((value, width))
}

fn take_array<const N: usize>(data: &[u8]) -> std::result::Result<[u8; N], VarIntError> {
    data.get(..N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(VarIntError::InsufficientBytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_varint_boundaries() {
        assert_eq!(encode_varint(0xfc), vec![0xfc]);
        assert_eq!(encode_varint(0xfd), vec![0xfd, 0xfd, 0]);
        assert_eq!(encode_varint(0xffff), vec![0xfd, 255, 255]);
        assert_eq!(encode_varint(0x10000), vec![0xfe, 0, 0, 1, 0]);
        assert_eq!(encode_varint(0xffffffff), vec![0xfe, 255, 255, 255, 255]);
        assert_eq!(
            encode_varint(0x100000000),
            vec![0xff, 0, 0, 0, 0, 1, 0, 0, 0]
        );
    }

    #[test]
    fn test_varint_len_matches_encoding() {
        for value in [0, 0xfc, 0xfd, 0xffff, 0x10000, 0xffffffff, 0x100000000, u64::MAX] {
            assert_eq!(varint_len(value), encode_varint(value).len());
        }
    }

    #[test]
    fn test_decode_varint_insufficient_bytes() {
        assert!(decode_varint(&[]).is_err());
        assert!(decode_varint(&[0xfd, 0]).is_err());
        assert!(decode_varint(&[0xfe, 0, 0, 0]).is_err());
        assert!(decode_varint(&[0xff, 0, 0, 0, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_decode_varint_rejects_non_canonical() {
        // 252 must use the single-byte form
        assert!(decode_varint(&[0xfd, 252, 0]).is_err());
        // 65535 must use the 0xfd form
        assert!(decode_varint(&[0xfe, 255, 255, 0, 0]).is_err());
        // 0xffffffff must use the 0xfe form
        assert!(decode_varint(&[0xff, 255, 255, 255, 255, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        assert_eq!(decode_varint(&[0x05, 0xaa, 0xbb]), Ok((5, 1)));
        assert_eq!(decode_varint(&[0xfd, 0x00, 0x01, 0xaa]), Ok((256, 3)));
    }
}
