//! Transaction wire format serialization/deserialization
//!
//! Legacy (non-witness) layout. The output encoding here is the same one the
//! commitment hash is computed over, so `serialize_output` is shared with
//! `commitment`.

use super::reader::ByteReader;
use super::varint::{varint_len, write_varint};
use crate::constants::MAX_TX_SIZE;
use crate::crypto::hash256;
use crate::error::{MarketplaceError, Result};
use crate::types::*;
use std::borrow::Cow;

/// Append one output: value (8 bytes LE), script length (VarInt), script bytes
pub fn write_output(out: &mut Vec<u8>, output: &TransactionOutput) {
    out.extend_from_slice(&output.value.to_le_bytes());
    write_varint(out, output.script_pubkey.len() as u64);
    out.extend_from_slice(&output.script_pubkey);
}

/// Serialized size of one output
pub fn output_size(output: &TransactionOutput) -> usize {
    8 + varint_len(output.script_pubkey.len() as u64) + output.script_pubkey.len()
}

/// Serialize a transaction to wire format
///
/// Format:
/// - Version (4 bytes, little-endian, signed)
/// - Input count (VarInt)
/// - For each input: prevout hash (32), prevout index (4 LE),
///   script length (VarInt), script bytes, sequence (4 LE)
/// - Output count (VarInt)
/// - For each output: value (8 LE), script length (VarInt), script bytes
/// - Lock time (4 bytes, little-endian)
pub fn serialize_transaction(tx: &Transaction) -> Vec<u8> {
    let estimated_size = 4
        + 9
        + tx.inputs.iter().map(|i| 41 + 9 + i.script_sig.len()).sum::<usize>()
        + 9
        + tx.outputs.iter().map(output_size).sum::<usize>()
        + 4;
    let mut result = Vec::with_capacity(estimated_size);

    result.extend_from_slice(&tx.version.to_le_bytes());

    write_varint(&mut result, tx.inputs.len() as u64);
    for input in &tx.inputs {
        result.extend_from_slice(&input.prevout.hash);
        result.extend_from_slice(&input.prevout.index.to_le_bytes());
        write_varint(&mut result, input.script_sig.len() as u64);
        result.extend_from_slice(&input.script_sig);
        result.extend_from_slice(&input.sequence.to_le_bytes());
    }

    write_varint(&mut result, tx.outputs.len() as u64);
    for output in &tx.outputs {
        write_output(&mut result, output);
    }

    result.extend_from_slice(&tx.lock_time.to_le_bytes());

    result
}

/// Read one output in wire format
pub fn read_output(reader: &mut ByteReader<'_>) -> Result<TransactionOutput> {
    let value = reader.read_u64_le()?;
    let script_pubkey = reader.read_var_bytes()?.to_vec();
    Ok(TransactionOutput {
        value,
        script_pubkey,
    })
}

/// Deserialize a transaction from wire format
pub fn deserialize_transaction(data: &[u8]) -> Result<Transaction> {
    if data.len() > MAX_TX_SIZE {
        return Err(MarketplaceError::Serialization(Cow::Owned(format!(
            "Transaction of {} bytes exceeds maximum size {}",
            data.len(),
            MAX_TX_SIZE
        ))));
    }

    let mut reader = ByteReader::new(data);
    let version = reader.read_i32_le()?;

    // Each input occupies at least 41 bytes, each output at least 9; bound
    // the counts before allocating.
    let input_count = bounded_count(&mut reader, 41, "input")?;
    let mut inputs = Vec::with_capacity(input_count);
    for _ in 0..input_count {
        let hash = reader.read_array::<32>()?;
        let index = reader.read_u32_le()?;
        let script_sig = reader.read_var_bytes()?.to_vec();
        let sequence = reader.read_u32_le()?;
        inputs.push(TransactionInput {
            prevout: OutPoint { hash, index },
            sequence,
            script_sig,
        });
    }

    let output_count = bounded_count(&mut reader, 9, "output")?;
    let mut outputs = Vec::with_capacity(output_count);
    for _ in 0..output_count {
        outputs.push(read_output(&mut reader)?);
    }

    let lock_time = reader.read_u32_le()?;
    reader.finish()?;

    Ok(Transaction {
        version,
        inputs,
        outputs,
        lock_time,
    })
}

fn bounded_count(reader: &mut ByteReader<'_>, min_item_size: usize, what: &str) -> Result<usize> {
    let count = reader.read_varint()?;
    let max = (reader.remaining() / min_item_size) as u64;
    if count > max {
        return Err(MarketplaceError::Serialization(Cow::Owned(format!(
            "Invalid {what} count {count}: at most {max} fit in remaining bytes"
        ))));
    }
    Ok(count as usize)
}

/// Transaction id: double SHA256 of the serialized transaction (internal byte order)
pub fn txid(tx: &Transaction) -> Hash {
    hash256(&serialize_transaction(tx))
}

/// Transaction id in the reversed hex form block explorers display
pub fn txid_hex(tx: &Transaction) -> String {
    let mut id = txid(tx);
    id.reverse();
    hex::encode(id)
}
