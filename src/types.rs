//! Core types: the marketplace state model and the transaction shapes it is carried in

use serde::{Deserialize, Serialize};

use crate::constants::ITEM_SLOTS;

/// Hash type: 256-bit hash
pub type Hash = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

/// 20-byte public key hash identifying a P2PKH destination
pub type PubKeyHash = [u8; 20];

/// Fixed-length slot table
pub type Slots = [Item; ITEM_SLOTS];

/// OutPoint: reference to a transaction output (txid, vout)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: Hash,
    pub index: u32,
}

/// Transaction Input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub prevout: OutPoint,
    pub sequence: u32,
    pub script_sig: ByteString,
}

/// Transaction Output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: u64,
    pub script_pubkey: ByteString,
}

/// Transaction (legacy, non-witness layout)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

/// A product listed in one marketplace slot.
///
/// Every field is serialized into the locking script, including the fields
/// of a vacant slot, so stale data left behind by a purchase still takes part
/// in the commitment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    /// UTF-8 text stored as raw bytes
    pub name: ByteString,
    /// Price in satoshis
    pub price: u64,
    pub seller_address: PubKeyHash,
    pub is_empty_slot: bool,
}

impl Item {
    /// Create an occupied slot entry
    pub fn new(name: impl Into<ByteString>, price: u64, seller_address: PubKeyHash) -> Self {
        Self {
            name: name.into(),
            price,
            seller_address,
            is_empty_slot: false,
        }
    }

    /// The vacant-slot value every slot holds at genesis
    pub fn empty_slot() -> Self {
        Self {
            name: ByteString::new(),
            price: 0,
            seller_address: [0u8; 20],
            is_empty_slot: true,
        }
    }

    /// Item name as text, replacing invalid UTF-8 sequences
    pub fn name_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }
}

/// Marketplace contract state: the slot table and the value of the UTXO carrying it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractState {
    pub slots: Slots,
    /// Value of the state UTXO; not part of the script bytes
    pub balance: u64,
}

impl ContractState {
    /// Genesis state: every slot vacant
    pub fn genesis(balance: u64) -> Self {
        Self {
            slots: std::array::from_fn(|_| Item::empty_slot()),
            balance,
        }
    }

    /// Look up a slot, rejecting indices outside the table
    pub fn slot(&self, index: u64) -> crate::error::Result<&Item> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.slots.get(i))
            .ok_or(crate::error::MarketplaceError::IndexOutOfRange {
                index,
                slots: ITEM_SLOTS,
            })
    }

    /// Number of occupied slots
    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|item| !item.is_empty_slot).count()
    }
}

/// A contract state together with the outpoint currently carrying it.
///
/// The core never remembers which UTXO is current; callers thread this pair
/// through every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInstance {
    pub state: ContractState,
    pub location: OutPoint,
}

/// The single UTXO consumed by a transition transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingUtxo {
    pub outpoint: OutPoint,
    pub value: u64,
}

/// Change returned to the caller. A zero amount means the transaction has no change output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOutput {
    pub address: PubKeyHash,
    pub amount: u64,
}

/// The part of the spending transaction's signature context a transition checks against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Double SHA-256 over all serialized outputs of the spending transaction
    pub hash_outputs: Hash,
    pub change: ChangeOutput,
}
