//! Script opcode constants used by the marketplace locking scripts
//!
//! Reference: Bitcoin Core `script/script.h`

/// OP_0 / OP_FALSE - Push empty array
pub const OP_0: u8 = 0x00;

/// OP_PUSHDATA1 - Push next byte as data length
pub const OP_PUSHDATA1: u8 = 0x4c;

/// OP_PUSHDATA2 - Push next 2 bytes (little-endian) as data length
pub const OP_PUSHDATA2: u8 = 0x4d;

/// OP_PUSHDATA4 - Push next 4 bytes (little-endian) as data length
pub const OP_PUSHDATA4: u8 = 0x4e;

/// OP_RETURN - Separates the contract code from its serialized state
pub const OP_RETURN: u8 = 0x6a;

/// OP_DUP - Duplicates the top stack item
pub const OP_DUP: u8 = 0x76;

/// OP_EQUALVERIFY - OP_EQUAL followed by OP_VERIFY
pub const OP_EQUALVERIFY: u8 = 0x88;

/// OP_HASH160 - RIPEMD160(SHA256(x))
pub const OP_HASH160: u8 = 0xa9;

/// OP_CHECKSIG - Verify signature against public key
pub const OP_CHECKSIG: u8 = 0xac;
