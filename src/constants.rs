//! Marketplace contract constants

/// Number of item slots in the marketplace table
pub const ITEM_SLOTS: usize = 10;

/// Satoshis per BSV
pub const SATOSHIS_PER_BSV: u64 = 100_000_000;

/// Maximum money supply: 21,000,000 coins in satoshis
pub const MAX_MONEY: u64 = 21_000_000 * SATOSHIS_PER_BSV;

/// Trailing byte of every stateful locking script
pub const STATE_VERSION: u8 = 0x00;

/// Width of the state-length field that precedes the version byte
pub const STATE_LEN_BYTES: usize = 4;

/// Serialized width of one slot excluding the name push: price(8) + seller(20) + flag(1)
pub const ITEM_FIXED_BYTES: usize = 8 + 20 + 1;

/// Length of a P2PKH locking script
pub const P2PKH_SCRIPT_LEN: usize = 25;

/// Default transaction version
pub const TX_VERSION: i32 = 1;

/// Sequence number for final transaction
pub const SEQUENCE_FINAL: u32 = 0xffffffff;

/// Output index of the state continuation output in every transition transaction
pub const STATE_OUTPUT_INDEX: u32 = 0;

/// Input index of the contract input in every transition transaction
pub const CONTRACT_INPUT_INDEX: usize = 0;

/// Maximum transaction size accepted by the deserializer: 1MB
pub const MAX_TX_SIZE: usize = 1_000_000;
