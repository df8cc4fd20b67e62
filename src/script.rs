//! Locking script assembly
//!
//! Two script shapes appear in marketplace transactions:
//! - P2PKH: `OP_DUP OP_HASH160 <20-byte hash> OP_EQUALVERIFY OP_CHECKSIG`
//!   for seller payments and change.
//! - Stateful contract script: `code || OP_RETURN || state || state_len(4 LE) || version`.
//!   The code part is the compiled covenant and never changes over the
//!   contract's lifetime; only the state region differs between states.

use crate::constants::{P2PKH_SCRIPT_LEN, STATE_LEN_BYTES, STATE_VERSION};
use crate::error::{MarketplaceError, Result};
use crate::opcodes::{OP_CHECKSIG, OP_DUP, OP_EQUALVERIFY, OP_HASH160, OP_RETURN};
use crate::types::{ByteString, PubKeyHash};
use std::borrow::Cow;

/// Build a P2PKH locking script paying to `pubkey_hash`
pub fn build_p2pkh_script(pubkey_hash: &PubKeyHash) -> ByteString {
    let mut script = Vec::with_capacity(P2PKH_SCRIPT_LEN);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    script.push(0x14);
    script.extend_from_slice(pubkey_hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

/// Extract the public key hash from a P2PKH locking script
pub fn parse_p2pkh_script(script: &[u8]) -> Option<PubKeyHash> {
    if script.len() != P2PKH_SCRIPT_LEN
        || script[0] != OP_DUP
        || script[1] != OP_HASH160
        || script[2] != 0x14
        || script[23] != OP_EQUALVERIFY
        || script[24] != OP_CHECKSIG
    {
        return None;
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&script[3..23]);
    Some(hash)
}

/// Assemble a stateful locking script from the contract code and serialized state
pub fn build_stateful_script(code: &[u8], state: &[u8]) -> Result<ByteString> {
    let state_len = u32::try_from(state.len()).map_err(|_| {
        MarketplaceError::Serialization(Cow::Owned(format!(
            "State of {} bytes does not fit the 4-byte length field",
            state.len()
        )))
    })?;

    let mut script = Vec::with_capacity(code.len() + 1 + state.len() + STATE_LEN_BYTES + 1);
    script.extend_from_slice(code);
    script.push(OP_RETURN);
    script.extend_from_slice(state);
    script.extend_from_slice(&state_len.to_le_bytes());
    script.push(STATE_VERSION);
    Ok(script)
}

/// Split a stateful locking script back into its code part and state bytes.
///
/// The split is driven from the tail (version byte, then state length), so
/// the code part may itself contain `OP_RETURN` bytes.
pub fn split_stateful_script(script: &[u8]) -> Result<(&[u8], &[u8])> {
    let trailer = STATE_LEN_BYTES + 1;
    if script.len() < trailer + 1 {
        return Err(MarketplaceError::Serialization(Cow::Borrowed(
            "Locking script too short to carry contract state",
        )));
    }

    let version = script[script.len() - 1];
    if version != STATE_VERSION {
        return Err(MarketplaceError::Serialization(Cow::Owned(format!(
            "Unsupported state version 0x{version:02x}"
        ))));
    }

    let len_start = script.len() - trailer;
    let mut len_bytes = [0u8; STATE_LEN_BYTES];
    len_bytes.copy_from_slice(&script[len_start..len_start + STATE_LEN_BYTES]);
    let state_len = u32::from_le_bytes(len_bytes) as usize;

    // OP_RETURN + state must fit in front of the trailer
    let state_start = len_start.checked_sub(state_len).filter(|&start| start >= 1).ok_or_else(|| {
        MarketplaceError::Serialization(Cow::Owned(format!(
            "State length {state_len} exceeds script body of {len_start} bytes"
        )))
    })?;

    if script[state_start - 1] != OP_RETURN {
        return Err(MarketplaceError::Serialization(Cow::Borrowed(
            "Missing OP_RETURN separator before contract state",
        )));
    }

    Ok((&script[..state_start - 1], &script[state_start..len_start]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p2pkh_layout() {
        let script = build_p2pkh_script(&[0xab; 20]);
        assert_eq!(script.len(), 25);
        assert_eq!(&script[..3], &[0x76, 0xa9, 0x14]);
        assert_eq!(&script[23..], &[0x88, 0xac]);
        assert_eq!(parse_p2pkh_script(&script), Some([0xab; 20]));
    }

    #[test]
    fn test_parse_p2pkh_rejects_other_scripts() {
        assert_eq!(parse_p2pkh_script(&[0x51]), None);
        let mut script = build_p2pkh_script(&[1; 20]);
        script[24] = 0xad;
        assert_eq!(parse_p2pkh_script(&script), None);
    }

    #[test]
    fn test_stateful_script_split() {
        let code = [0x51, 0x6a, 0x52];
        let state = [1, 2, 3, 4];
        let script = build_stateful_script(&code, &state).unwrap();
        assert_eq!(
            script,
            vec![0x51, 0x6a, 0x52, 0x6a, 1, 2, 3, 4, 4, 0, 0, 0, 0x00]
        );
        let (code_part, state_part) = split_stateful_script(&script).unwrap();
        assert_eq!(code_part, &code);
        assert_eq!(state_part, &state);
    }

    #[test]
    fn test_split_with_empty_code() {
        let script = build_stateful_script(&[], &[9]).unwrap();
        let (code_part, state_part) = split_stateful_script(&script).unwrap();
        assert!(code_part.is_empty());
        assert_eq!(state_part, &[9]);
    }

    #[test]
    fn test_split_rejects_bad_trailer() {
        let mut script = build_stateful_script(&[0x51], &[1, 2]).unwrap();
        let last = script.len() - 1;
        script[last] = 0x01;
        assert!(split_stateful_script(&script).is_err());

        let mut script = build_stateful_script(&[0x51], &[1, 2]).unwrap();
        // claim a longer state than the script carries
        let len_at = script.len() - 5;
        script[len_at] = 0x40;
        assert!(split_stateful_script(&script).is_err());
    }

    #[test]
    fn test_split_requires_separator() {
        let mut script = build_stateful_script(&[0x51], &[1, 2]).unwrap();
        script[1] = 0x00;
        assert!(split_stateful_script(&script).is_err());
    }
}
