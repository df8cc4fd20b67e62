//! Error types for marketplace transitions, transaction building and the wire codec

use std::borrow::Cow;
use thiserror::Error;

use crate::types::Hash;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum MarketplaceError {
    #[error("Slot index {index} out of range (table has {slots} slots)")]
    IndexOutOfRange { index: u64, slots: usize },

    #[error("Item slot {0} is not empty")]
    SlotNotEmpty(usize),

    #[error("Invalid new item: {0}")]
    InvalidNewItem(Cow<'static, str>),

    #[error("hashOutputs mismatch: committed {}, reconstructed {}", hex::encode(.expected), hex::encode(.actual))]
    CommitmentMismatch { expected: Hash, actual: Hash },

    #[error("Insufficient funds: outputs require {required} satoshis, funding UTXO holds {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("Invalid funding UTXO: {0}")]
    InvalidFunding(Cow<'static, str>),

    #[error("Cannot resolve payment output: {0}")]
    InvalidPayment(Cow<'static, str>),

    #[error("All item slots are filled")]
    NoEmptySlot,

    #[error("No transaction builder registered for transition '{0}'")]
    UnknownTransition(Cow<'static, str>),

    #[error("Serialization error: {0}")]
    Serialization(Cow<'static, str>),

    #[error("Invalid amount: {0}")]
    InvalidAmount(Cow<'static, str>),

    #[error("Signer rejected transaction: {0}")]
    SignerRejected(Cow<'static, str>),

    #[error("Ledger rejected transaction: {0}")]
    ExternalRejection(Cow<'static, str>),

    #[error("State sync failed: {0}")]
    StateSync(Cow<'static, str>),

    #[error("Configuration error: {0}")]
    Config(Cow<'static, str>),
}

impl MarketplaceError {
    /// Whether the failure happened after the transaction left the core
    /// (signing or broadcast). Everything else is detected before signing.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            MarketplaceError::SignerRejected(_)
                | MarketplaceError::ExternalRejection(_)
                | MarketplaceError::StateSync(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MarketplaceError>;
