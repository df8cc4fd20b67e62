//! # Marketplace Covenant
//!
//! A ten-slot on-chain marketplace held in the locking script of a single
//! UTXO. Sellers list items into empty slots; buyers pay a listed item's
//! price to its seller and free the slot. The contract never signs anything:
//! a state transition is authorized only when the spending transaction's
//! outputs hash to exactly what the contract reconstructs for the
//! successor state.
//!
//! ## Architecture
//!
//! - `types`, `constants`: the state model (`Item`, `ContractState`) and transaction shapes
//! - `serialization`, `script`: output wire format, push-data and the stateful locking script
//! - `commitment`: state <-> script bytes and the double-SHA256 output commitment
//! - `transition`: the pure validator for `addItem` and `buyItem`
//! - `builder`: the per-transition transaction builder that produces the other side of that equality
//! - `sync`: state sync, signer and broadcaster interfaces and the client that drives them
//!
//! ## Usage
//!
//! ```rust
//! use marketplace_covenant::builder::TxBuilder;
//! use marketplace_covenant::transition::validate_add_item;
//! use marketplace_covenant::types::*;
//!
//! let code = vec![0x51];
//! let builder = TxBuilder::new(code.clone());
//! let current = ContractInstance {
//!     state: ContractState::genesis(1),
//!     location: OutPoint { hash: [0xc0; 32], index: 0 },
//! };
//! let item = Item::new("sword", 500_000, [0x11; 20]);
//! let funding = FundingUtxo {
//!     outpoint: OutPoint { hash: [0xaa; 32], index: 0 },
//!     value: 10_000,
//! };
//!
//! let unsigned = builder
//!     .build_add_item(&current, &item, 0, &[0x22; 20], &funding)
//!     .unwrap();
//! assert_eq!(unsigned.tx.inputs[0].prevout, current.location);
//! let next = validate_add_item(&code, &current.state, &item, 0, &unsigned.call_context()).unwrap();
//! assert_eq!(next, unsigned.next_state);
//! ```

pub mod builder;
pub mod commitment;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod opcodes;
pub mod script;
pub mod serialization;
pub mod sync;
pub mod transition;
pub mod types;

pub use builder::{TxBuilder, UnsignedTransaction};
pub use config::{get_marketplace_config, init_marketplace_config, MarketplaceConfig};
pub use error::{MarketplaceError, Result};
pub use sync::{Broadcaster, MarketplaceClient, Signer, StateSync, Subscription};
pub use transition::TransitionCall;
pub use types::*;

/// Marketplace - wrapper struct bound to one deployed contract's code
///
/// Provides the validator, codec and builder entry points for a single
/// contract code part. All methods delegate to the corresponding module
/// functions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Marketplace {
    code: ByteString,
}

impl Marketplace {
    /// Create a Marketplace for the given contract code part
    pub fn new(code: impl Into<ByteString>) -> Self {
        Self { code: code.into() }
    }

    /// Create a Marketplace from configuration
    pub fn from_config(config: &MarketplaceConfig) -> Result<Self> {
        Ok(Self::new(config.contract.code_script()?))
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Genesis state with every slot vacant
    pub fn genesis(&self, balance: u64) -> ContractState {
        ContractState::genesis(balance)
    }

    /// Locking script carrying `state`
    pub fn locking_script(&self, state: &ContractState) -> Result<ByteString> {
        commitment::locking_script(&self.code, state)
    }

    /// Recover the state carried by one of this contract's outputs
    pub fn read_state(&self, output: &TransactionOutput) -> Result<ContractState> {
        commitment::deserialize_state_output(&self.code, output)
    }

    /// Indexer script hash of the locking script carrying `state`
    pub fn script_hash(&self, state: &ContractState) -> Result<String> {
        Ok(commitment::script_hash(&self.locking_script(state)?))
    }

    /// Validate an `addItem` call
    pub fn validate_add_item(
        &self,
        state: &ContractState,
        item: &Item,
        index: u64,
        ctx: &CallContext,
    ) -> Result<ContractState> {
        transition::validate_add_item(&self.code, state, item, index, ctx)
    }

    /// Validate a `buyItem` call
    pub fn validate_buy_item(
        &self,
        state: &ContractState,
        index: u64,
        ctx: &CallContext,
    ) -> Result<ContractState> {
        transition::validate_buy_item(&self.code, state, index, ctx)
    }

    /// Validate any transition call
    pub fn validate_transition(
        &self,
        state: &ContractState,
        call: &TransitionCall,
        ctx: &CallContext,
    ) -> Result<ContractState> {
        transition::validate_transition(&self.code, state, call, ctx)
    }

    /// Transaction builder for this contract with default settings
    pub fn builder(&self) -> TxBuilder {
        TxBuilder::new(self.code.clone())
    }
}
