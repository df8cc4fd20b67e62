//! Commitment codec: contract state <-> locking script bytes, and the output hash
//!
//! This module is the single definition of the byte layout that both the
//! transition validator and the transaction builder reconstruct. Any change
//! here changes every commitment hash.
//!
//! State layout (one entry per slot, in slot order):
//! - name: minimal data push
//! - price: 8 bytes, little-endian
//! - seller address: 20 bytes
//! - empty-slot flag: 1 byte, 0x00 or 0x01
//!
//! **CommitmentHash**: `hash256(serialize_output(o_0) || ... || serialize_output(o_n))`,
//! the same digest a BIP143-style sighash preimage carries as `hashOutputs`.

use crate::constants::{ITEM_FIXED_BYTES, ITEM_SLOTS};
use crate::crypto::{hash256, sha256};
use crate::error::{MarketplaceError, Result};
use crate::script::{build_stateful_script, split_stateful_script};
use crate::serialization::pushdata::push_header_len;
use crate::serialization::transaction::output_size;
use crate::serialization::{read_push, write_output, write_push, ByteReader};
use crate::types::*;
use std::borrow::Cow;

/// Serialize the slot table into the state region of the locking script
pub fn serialize_state(state: &ContractState) -> Result<ByteString> {
    let estimated_size = state
        .slots
        .iter()
        .map(|item| push_header_len(item.name.len()) + item.name.len() + ITEM_FIXED_BYTES)
        .sum::<usize>();
    let mut out = Vec::with_capacity(estimated_size);

    for item in &state.slots {
        write_push(&mut out, &item.name)?;
        out.extend_from_slice(&item.price.to_le_bytes());
        out.extend_from_slice(&item.seller_address);
        out.push(u8::from(item.is_empty_slot));
    }

    debug_assert_eq!(out.len(), estimated_size);
    Ok(out)
}

/// Parse the state region of a locking script; `balance` comes from the output value
pub fn deserialize_state(data: &[u8], balance: u64) -> Result<ContractState> {
    let mut reader = ByteReader::new(data);
    let mut slots: Vec<Item> = Vec::with_capacity(ITEM_SLOTS);

    for index in 0..ITEM_SLOTS {
        let name = read_push(&mut reader)?.to_vec();
        let price = reader.read_u64_le()?;
        let seller_address = reader.read_array::<20>()?;
        let is_empty_slot = match reader.read_u8()? {
            0 => false,
            1 => true,
            other => {
                return Err(MarketplaceError::Serialization(Cow::Owned(format!(
                    "Slot {index}: invalid empty-slot flag 0x{other:02x}"
                ))))
            }
        };
        slots.push(Item {
            name,
            price,
            seller_address,
            is_empty_slot,
        });
    }
    reader.finish()?;

    let slots: Slots = slots.try_into().map_err(|_| {
        MarketplaceError::Serialization(Cow::Borrowed("Slot table has wrong length"))
    })?;
    Ok(ContractState { slots, balance })
}

/// Full locking script carrying `state` under contract `code`
pub fn locking_script(code: &[u8], state: &ContractState) -> Result<ByteString> {
    build_stateful_script(code, &serialize_state(state)?)
}

/// The state-continuation output for `state`: its locking script with the state balance
pub fn state_output(code: &[u8], state: &ContractState) -> Result<TransactionOutput> {
    Ok(TransactionOutput {
        value: state.balance,
        script_pubkey: locking_script(code, state)?,
    })
}

/// Recover the contract state carried by a state output.
///
/// Inverse of [`state_output`]: the code part must match exactly, so an
/// output locked under different contract code is never read as ours.
pub fn deserialize_state_output(code: &[u8], output: &TransactionOutput) -> Result<ContractState> {
    let (code_part, state_bytes) = split_stateful_script(&output.script_pubkey)?;
    if code_part != code {
        return Err(MarketplaceError::Serialization(Cow::Borrowed(
            "Locking script code part does not match contract code",
        )));
    }
    deserialize_state(state_bytes, output.value)
}

/// Serialize one output: value (8 bytes LE) || VarInt(script length) || script
pub fn serialize_output(output: &TransactionOutput) -> ByteString {
    let mut out = Vec::with_capacity(output_size(output));
    write_output(&mut out, output);
    out
}

/// Concatenate the serialization of every output, in order
pub fn serialize_outputs(outputs: &[TransactionOutput]) -> ByteString {
    let mut out = Vec::with_capacity(outputs.iter().map(output_size).sum());
    for output in outputs {
        write_output(&mut out, output);
    }
    out
}

/// Commitment hash of an ordered output set
pub fn commitment_hash(outputs: &[TransactionOutput]) -> Hash {
    hash256(&serialize_outputs(outputs))
}

/// Check a reconstructed output set against the committed hash
pub fn verify_commitment(outputs: &[TransactionOutput], committed: &Hash) -> Result<()> {
    let actual = commitment_hash(outputs);
    if &actual != committed {
        return Err(MarketplaceError::CommitmentMismatch {
            expected: *committed,
            actual,
        });
    }
    Ok(())
}

/// Script hash as chain indexers key it: SHA256 of the script, byte-reversed, hex
pub fn script_hash(script: &[u8]) -> String {
    let mut hash = sha256(script);
    hash.reverse();
    hex::encode(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODE: &[u8] = &[0x51, 0x52, 0x93];

    fn sword() -> Item {
        Item::new("sword", 500_000, [0x11; 20])
    }

    #[test]
    fn test_genesis_state_layout() {
        let state = ContractState::genesis(1);
        let bytes = serialize_state(&state).unwrap();
        // OP_0 name push + fixed fields, ten times
        assert_eq!(bytes.len(), ITEM_SLOTS * (1 + ITEM_FIXED_BYTES));

        let mut empty_slot = vec![0x00];
        empty_slot.extend_from_slice(&[0u8; 8]);
        empty_slot.extend_from_slice(&[0u8; 20]);
        empty_slot.push(0x01);
        assert_eq!(&bytes[..1 + ITEM_FIXED_BYTES], empty_slot.as_slice());
    }

    #[test]
    fn test_occupied_slot_layout() {
        let mut state = ContractState::genesis(1);
        state.slots[0] = sword();
        let bytes = serialize_state(&state).unwrap();
        assert_eq!(&bytes[..6], &[0x05, b's', b'w', b'o', b'r', b'd']);
        assert_eq!(&bytes[6..14], &500_000u64.to_le_bytes());
        assert_eq!(&bytes[14..34], &[0x11; 20]);
        assert_eq!(bytes[34], 0x00);
    }

    #[test]
    fn test_state_output_round_trip() {
        let mut state = ContractState::genesis(42);
        state.slots[3] = sword();
        let output = state_output(CODE, &state).unwrap();
        assert_eq!(output.value, 42);
        assert!(output.script_pubkey.starts_with(CODE));
        assert_eq!(deserialize_state_output(CODE, &output).unwrap(), state);
    }

    #[test]
    fn test_deserialize_rejects_foreign_code() {
        let output = state_output(CODE, &ContractState::genesis(1)).unwrap();
        assert!(deserialize_state_output(&[0x51], &output).is_err());
    }

    #[test]
    fn test_deserialize_rejects_bad_flag() {
        let mut bytes = serialize_state(&ContractState::genesis(1)).unwrap();
        let last = bytes.len() - 1;
        bytes[last] = 0x02;
        assert!(deserialize_state(&bytes, 1).is_err());
    }

    #[test]
    fn test_deserialize_rejects_truncated_and_trailing() {
        let bytes = serialize_state(&ContractState::genesis(1)).unwrap();
        assert!(deserialize_state(&bytes[..bytes.len() - 1], 1).is_err());
        let mut longer = bytes.clone();
        longer.push(0);
        assert!(deserialize_state(&longer, 1).is_err());
    }

    #[test]
    fn test_stale_fields_of_empty_slot_affect_commitment() {
        let genesis = ContractState::genesis(1);
        let mut stale = genesis.clone();
        stale.slots[0] = Item {
            is_empty_slot: true,
            ..sword()
        };
        let a = commitment_hash(&[state_output(CODE, &genesis).unwrap()]);
        let b = commitment_hash(&[state_output(CODE, &stale).unwrap()]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_commitment_hash_is_order_sensitive() {
        let first = TransactionOutput {
            value: 1,
            script_pubkey: vec![0x51],
        };
        let second = TransactionOutput {
            value: 2,
            script_pubkey: vec![0x52],
        };
        assert_ne!(
            commitment_hash(&[first.clone(), second.clone()]),
            commitment_hash(&[second, first])
        );
    }

    #[test]
    fn test_serialize_output_layout() {
        let output = TransactionOutput {
            value: 0x0102,
            script_pubkey: vec![0xaa, 0xbb],
        };
        assert_eq!(
            serialize_output(&output),
            vec![0x02, 0x01, 0, 0, 0, 0, 0, 0, 0x02, 0xaa, 0xbb]
        );
    }

    #[test]
    fn test_verify_commitment_reports_both_hashes() {
        let outputs = vec![state_output(CODE, &ContractState::genesis(1)).unwrap()];
        let actual = commitment_hash(&outputs);
        assert!(verify_commitment(&outputs, &actual).is_ok());
        assert_eq!(
            verify_commitment(&outputs, &[0u8; 32]),
            Err(MarketplaceError::CommitmentMismatch {
                expected: [0u8; 32],
                actual,
            })
        );
    }

    #[test]
    fn test_script_hash_is_reversed_sha256() {
        let script = [0x51];
        let mut expected = sha256(&script);
        expected.reverse();
        assert_eq!(script_hash(&script), hex::encode(expected));
    }
}
