//! Wire format serialization/deserialization
//!
//! Consensus-critical encoders shared by the transition validator and the
//! transaction builder. All integers are little-endian.

pub mod pushdata;
pub mod reader;
pub mod transaction;
pub mod varint;

pub use pushdata::{read_push, write_push};
pub use reader::ByteReader;
pub use transaction::{
    deserialize_transaction, serialize_transaction, txid, txid_hex, write_output,
};
pub use varint::{decode_varint, encode_varint, VarIntError};
