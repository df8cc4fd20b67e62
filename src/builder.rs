//! Transaction builder: the contract's off-chain half
//!
//! Given the current contract instance, a transition call and a funding
//! UTXO, the builder produces an unsigned transaction that spends the
//! instance's carrying UTXO and whose outputs are, byte for byte, the
//! outputs the transition validator reconstructs.
//!
//! Inputs:
//! - input 0: the contract UTXO at `instance.location`, worth `state.balance`
//! - input 1: the funding UTXO paying for side effects
//!
//! Outputs:
//! - output 0: state continuation carrying the next state and the unchanged balance
//! - outputs 1..: transition side effects (the seller payment for `buyItem`)
//! - last: change of `sum(inputs) - sum(outputs)` to the caller, when positive
//!
//! Spending the contract UTXO is what serializes transitions: two
//! transactions built against the same instance conflict on input 0 and the
//! ledger accepts at most one of them.
//!
//! Builders are registered per transition name, mirroring how each contract
//! method binds its own transaction shape. The builder never checks the
//! commitment itself unless runtime assertions are enabled, in which case the
//! freshly built transaction is run through the validator before it is
//! returned.

use std::borrow::Cow;
use std::collections::HashMap;
use tracing::debug;

use crate::commitment::{commitment_hash, state_output};
use crate::config::{BuilderConfig, MarketplaceConfig};
use crate::constants::{CONTRACT_INPUT_INDEX, STATE_OUTPUT_INDEX};
use crate::error::{MarketplaceError, Result};
use crate::serialization::txid;
use crate::transition::{
    next_state_after_add, next_state_after_buy, p2pkh_output, validate_transition,
    TransitionCall, ADD_ITEM, BUY_ITEM,
};
use crate::types::*;

/// Name under which deploy transactions are reported
pub const DEPLOY: &str = "deploy";

/// A transaction ready for the signer, with everything needed to check or follow it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub tx: Transaction,
    /// Transition this transaction performs
    pub transition: &'static str,
    /// Input spending the current contract UTXO; `None` for deploy
    pub contract_input: Option<usize>,
    /// Input spending the funding UTXO
    pub funding_input: usize,
    /// State carried by the continuation output
    pub next_state: ContractState,
    /// Output index of the continuation output
    pub next_output_index: u32,
    /// Change returned to the caller (zero amount when there is no change output)
    pub change: ChangeOutput,
}

impl UnsignedTransaction {
    /// Signature-context fields the validator consumes for this transaction
    pub fn call_context(&self) -> CallContext {
        CallContext {
            hash_outputs: commitment_hash(&self.tx.outputs),
            change: self.change,
        }
    }

    /// Contract instance created once `signed` (this transaction, signed) confirms
    pub fn next_instance(&self, signed: &Transaction) -> ContractInstance {
        ContractInstance {
            state: self.next_state.clone(),
            location: OutPoint {
                hash: txid(signed),
                index: self.next_output_index,
            },
        }
    }

    /// Sum of all output values
    pub fn total_output_value(&self) -> u64 {
        self.tx.outputs.iter().map(|o| o.value).sum()
    }
}

/// Per-transition build function
pub type BuildFn = fn(
    &TxBuilder,
    &ContractInstance,
    &TransitionCall,
    &PubKeyHash,
    &FundingUtxo,
) -> Result<UnsignedTransaction>;

/// Transaction builder with a registry of per-transition build functions
#[derive(Clone)]
pub struct TxBuilder {
    code: ByteString,
    config: BuilderConfig,
    runtime_assertions: bool,
    registry: HashMap<&'static str, BuildFn>,
}

impl std::fmt::Debug for TxBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut transitions: Vec<_> = self.registry.keys().collect();
        transitions.sort();
        f.debug_struct("TxBuilder")
            .field("code", &hex::encode(&self.code))
            .field("config", &self.config)
            .field("runtime_assertions", &self.runtime_assertions)
            .field("transitions", &transitions)
            .finish()
    }
}

impl TxBuilder {
    /// Builder for contract `code` with default settings and both transitions registered
    pub fn new(code: impl Into<ByteString>) -> Self {
        let mut builder = Self {
            code: code.into(),
            config: BuilderConfig::default(),
            runtime_assertions: true,
            registry: HashMap::new(),
        };
        builder.register(ADD_ITEM, build_add_item_call);
        builder.register(BUY_ITEM, build_buy_item_call);
        builder
    }

    /// Builder configured from a full marketplace config
    pub fn from_config(config: &MarketplaceConfig) -> Result<Self> {
        let mut builder = Self::new(config.contract.code_script()?);
        builder.config = config.builder.clone();
        builder.runtime_assertions = config.debug.enable_runtime_assertions;
        Ok(builder)
    }

    pub fn with_builder_config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_runtime_assertions(mut self, enabled: bool) -> Self {
        self.runtime_assertions = enabled;
        self
    }

    /// Bind (or replace) the build function for a transition
    pub fn register(&mut self, transition: &'static str, build: BuildFn) {
        self.registry.insert(transition, build);
    }

    /// Contract code part every state output is locked under
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Build a transaction for any registered transition
    pub fn build(
        &self,
        instance: &ContractInstance,
        call: &TransitionCall,
        change_address: &PubKeyHash,
        funding: &FundingUtxo,
    ) -> Result<UnsignedTransaction> {
        if funding.outpoint == instance.location {
            return Err(MarketplaceError::InvalidFunding(Cow::Borrowed(
                "funding UTXO is the contract UTXO itself",
            )));
        }
        let build = self
            .registry
            .get(call.name())
            .ok_or(MarketplaceError::UnknownTransition(Cow::Borrowed(call.name())))?;
        let unsigned = build(self, instance, call, change_address, funding)?;

        if self.runtime_assertions {
            validate_transition(&self.code, &instance.state, call, &unsigned.call_context())?;
        }

        debug!(
            transition = unsigned.transition,
            index = call.index(),
            outputs = unsigned.tx.outputs.len(),
            change = unsigned.change.amount,
            "built transition transaction"
        );
        Ok(unsigned)
    }

    /// Build an `addItem` transaction: continuation output, then change
    pub fn build_add_item(
        &self,
        instance: &ContractInstance,
        item: &Item,
        index: u64,
        change_address: &PubKeyHash,
        funding: &FundingUtxo,
    ) -> Result<UnsignedTransaction> {
        self.build(
            instance,
            &TransitionCall::AddItem {
                item: item.clone(),
                index,
            },
            change_address,
            funding,
        )
    }

    /// Build a `buyItem` transaction: continuation output, seller payment, then change
    pub fn build_buy_item(
        &self,
        instance: &ContractInstance,
        index: u64,
        change_address: &PubKeyHash,
        funding: &FundingUtxo,
    ) -> Result<UnsignedTransaction> {
        self.build(
            instance,
            &TransitionCall::BuyItem { index },
            change_address,
            funding,
        )
    }

    /// Build the deployment transaction: the genesis state output, then change
    pub fn build_deploy(
        &self,
        balance: u64,
        change_address: &PubKeyHash,
        funding: &FundingUtxo,
    ) -> Result<UnsignedTransaction> {
        if balance == 0 {
            return Err(MarketplaceError::InvalidAmount(Cow::Borrowed(
                "genesis balance must be at least one satoshi",
            )));
        }
        let unsigned = self.assemble(
            DEPLOY,
            None,
            ContractState::genesis(balance),
            Vec::new(),
            change_address,
            funding,
        )?;
        debug!(balance, change = unsigned.change.amount, "built deploy transaction");
        Ok(unsigned)
    }

    fn input(&self, prevout: OutPoint) -> TransactionInput {
        TransactionInput {
            prevout,
            sequence: self.config.input_sequence,
            script_sig: Vec::new(),
        }
    }

    /// Lay out the inputs, outputs and change shared by every transition
    fn assemble(
        &self,
        transition: &'static str,
        contract: Option<&ContractInstance>,
        next_state: ContractState,
        side_effects: Vec<TransactionOutput>,
        change_address: &PubKeyHash,
        funding: &FundingUtxo,
    ) -> Result<UnsignedTransaction> {
        let mut inputs = Vec::with_capacity(2);
        let mut available = funding.value;
        if let Some(instance) = contract {
            inputs.push(self.input(instance.location));
            available = available.checked_add(instance.state.balance).ok_or(
                MarketplaceError::InvalidAmount(Cow::Borrowed("input values overflow")),
            )?;
        }
        inputs.push(self.input(funding.outpoint));
        let funding_input = inputs.len() - 1;

        let mut outputs = Vec::with_capacity(side_effects.len() + 2);
        outputs.push(state_output(&self.code, &next_state)?);
        outputs.extend(side_effects);

        let required = outputs
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.value))
            .ok_or(MarketplaceError::InsufficientFunds {
                required: u64::MAX,
                available,
            })?;
        let amount = available
            .checked_sub(required)
            .ok_or(MarketplaceError::InsufficientFunds {
                required,
                available,
            })?;

        let change = ChangeOutput {
            address: *change_address,
            amount,
        };
        if amount > 0 {
            outputs.push(p2pkh_output(change_address, amount));
        }

        let tx = Transaction {
            version: self.config.tx_version,
            inputs,
            outputs,
            lock_time: self.config.lock_time,
        };

        Ok(UnsignedTransaction {
            tx,
            transition,
            contract_input: contract.map(|_| CONTRACT_INPUT_INDEX),
            funding_input,
            next_state,
            next_output_index: STATE_OUTPUT_INDEX,
            change,
        })
    }
}

fn build_add_item_call(
    builder: &TxBuilder,
    instance: &ContractInstance,
    call: &TransitionCall,
    change_address: &PubKeyHash,
    funding: &FundingUtxo,
) -> Result<UnsignedTransaction> {
    let TransitionCall::AddItem { item, index } = call else {
        return Err(MarketplaceError::UnknownTransition(Cow::Borrowed(call.name())));
    };
    let next = next_state_after_add(&instance.state, item, *index)?;
    builder.assemble(ADD_ITEM, Some(instance), next, Vec::new(), change_address, funding)
}

fn build_buy_item_call(
    builder: &TxBuilder,
    instance: &ContractInstance,
    call: &TransitionCall,
    change_address: &PubKeyHash,
    funding: &FundingUtxo,
) -> Result<UnsignedTransaction> {
    let TransitionCall::BuyItem { index } = call else {
        return Err(MarketplaceError::UnknownTransition(Cow::Borrowed(call.name())));
    };
    let (next, item) = next_state_after_buy(&instance.state, *index)?;

    if item.price == 0 {
        return Err(MarketplaceError::InvalidPayment(Cow::Owned(format!(
            "slot {index} has no price to pay"
        ))));
    }
    if item.seller_address == [0u8; 20] {
        return Err(MarketplaceError::InvalidPayment(Cow::Owned(format!(
            "slot {index} has no seller address"
        ))));
    }

    let payment = p2pkh_output(&item.seller_address, item.price);
    builder.assemble(BUY_ITEM, Some(instance), next, vec![payment], change_address, funding)
}
