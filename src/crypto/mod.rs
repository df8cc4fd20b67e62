//! Hash functions used by the commitment codec and P2PKH addressing
//!
//! All digests go through the `sha2` and `ripemd` crates. Nothing here is
//! allowed to vary between the validation and construction paths.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::types::{Hash, PubKeyHash};

/// Single SHA256
pub fn sha256(data: &[u8]) -> Hash {
    let hash = Sha256::digest(data);
    let mut result = [0u8; 32];
    result.copy_from_slice(&hash);
    result
}

/// Double SHA256 (SHA256(SHA256(data))), the chain's standard digest
pub fn hash256(data: &[u8]) -> Hash {
    let first_hash = Sha256::digest(data);
    let second_hash = Sha256::digest(first_hash);
    let mut result = [0u8; 32];
    result.copy_from_slice(&second_hash);
    result
}

/// RIPEMD160(SHA256(data)), used to derive P2PKH addresses from public keys
pub fn hash160(data: &[u8]) -> PubKeyHash {
    let sha256_hash = Sha256::digest(data);
    let ripemd160_hash = Ripemd160::digest(sha256_hash);
    let mut result = [0u8; 20];
    result.copy_from_slice(&ripemd160_hash);
    result
}
