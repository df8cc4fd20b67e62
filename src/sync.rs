//! External collaborators and the client that drives them
//!
//! The core never talks to a chain. Locating the latest contract instance,
//! signing and broadcasting are all behind traits; [`MarketplaceClient`]
//! composes them into the fetch, build, sign, submit sequence of one
//! marketplace action. Failures after the transaction leaves the builder are
//! surfaced as-is and never retried: a double-spend loss means the caller
//! has to refetch the state and decide again.

use std::borrow::Cow;
use tracing::{debug, info, warn};

use crate::builder::{TxBuilder, UnsignedTransaction};
use crate::commitment::commitment_hash;
use crate::constants::{MAX_MONEY, SATOSHIS_PER_BSV};
use crate::crypto::hash160;
use crate::error::{MarketplaceError, Result};
use crate::transition::TransitionCall;
use crate::types::*;

/// Resolves the current instance of a deployed contract from its genesis outpoint
pub trait StateSync {
    /// Latest confirmed (or accepted) instance in the chain of states rooted at `genesis`
    fn latest_state(&self, genesis: &OutPoint) -> Result<ContractInstance>;

    /// Invoke `on_update` for every new instance until the subscription is dropped
    fn subscribe(
        &self,
        genesis: &OutPoint,
        on_update: Box<dyn FnMut(ContractInstance) + Send>,
    ) -> Result<Subscription>;
}

/// Produces the unlocking data for a built transaction
pub trait Signer {
    fn sign(&self, unsigned: &UnsignedTransaction) -> Result<Transaction>;
}

/// Submits a signed transaction to the ledger and returns its id
pub trait Broadcaster {
    fn submit(&self, tx: &Transaction) -> Result<Hash>;
}

impl<T: StateSync + ?Sized> StateSync for &T {
    fn latest_state(&self, genesis: &OutPoint) -> Result<ContractInstance> {
        (**self).latest_state(genesis)
    }

    fn subscribe(
        &self,
        genesis: &OutPoint,
        on_update: Box<dyn FnMut(ContractInstance) + Send>,
    ) -> Result<Subscription> {
        (**self).subscribe(genesis, on_update)
    }
}

impl<T: Signer + ?Sized> Signer for &T {
    fn sign(&self, unsigned: &UnsignedTransaction) -> Result<Transaction> {
        (**self).sign(unsigned)
    }
}

impl<T: Broadcaster + ?Sized> Broadcaster for &T {
    fn submit(&self, tx: &Transaction) -> Result<Hash> {
        (**self).submit(tx)
    }
}

/// Handle to an active state subscription. Unsubscribes when dropped.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop receiving updates now rather than at drop
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Index of the first vacant slot, scanning from slot 0
pub fn first_empty_slot(state: &ContractState) -> Option<usize> {
    state.slots.iter().position(|item| item.is_empty_slot)
}

/// Convert a BSV amount to satoshis, rounding to the nearest satoshi
pub fn bsv_to_satoshis(amount: f64) -> Result<u64> {
    if !amount.is_finite() {
        return Err(MarketplaceError::InvalidAmount(Cow::Owned(format!(
            "{amount} is not a finite amount"
        ))));
    }
    if amount < 0.0 {
        return Err(MarketplaceError::InvalidAmount(Cow::Owned(format!(
            "{amount} is negative"
        ))));
    }
    let satoshis = (amount * SATOSHIS_PER_BSV as f64).round();
    if satoshis > MAX_MONEY as f64 {
        return Err(MarketplaceError::InvalidAmount(Cow::Owned(format!(
            "{amount} BSV exceeds the money supply"
        ))));
    }
    Ok(satoshis as u64)
}

/// P2PKH address (HASH160) of a serialized public key
pub fn seller_address_from_pubkey(pubkey: &[u8]) -> PubKeyHash {
    hash160(pubkey)
}

/// Runs marketplace actions against external state sync, signer and broadcaster
pub struct MarketplaceClient<S, G, B> {
    genesis: OutPoint,
    builder: TxBuilder,
    change_address: PubKeyHash,
    state_sync: S,
    signer: G,
    broadcaster: B,
}

impl<S, G, B> MarketplaceClient<S, G, B>
where
    S: StateSync,
    G: Signer,
    B: Broadcaster,
{
    pub fn new(
        genesis: OutPoint,
        builder: TxBuilder,
        change_address: PubKeyHash,
        state_sync: S,
        signer: G,
        broadcaster: B,
    ) -> Self {
        Self {
            genesis,
            builder,
            change_address,
            state_sync,
            signer,
            broadcaster,
        }
    }

    pub fn genesis(&self) -> &OutPoint {
        &self.genesis
    }

    pub fn builder(&self) -> &TxBuilder {
        &self.builder
    }

    /// Latest instance of this client's contract
    pub fn latest(&self) -> Result<ContractInstance> {
        self.state_sync.latest_state(&self.genesis)
    }

    /// Watch this client's contract for new instances
    pub fn subscribe(
        &self,
        on_update: impl FnMut(ContractInstance) + Send + 'static,
    ) -> Result<Subscription> {
        self.state_sync.subscribe(&self.genesis, Box::new(on_update))
    }

    /// List an item in the first empty slot
    pub fn add_item(
        &self,
        name: &str,
        price: u64,
        seller_address: PubKeyHash,
        funding: &FundingUtxo,
    ) -> Result<(Hash, ContractInstance)> {
        let current = self.latest()?;
        let index = first_empty_slot(&current.state).ok_or(MarketplaceError::NoEmptySlot)?;
        let call = TransitionCall::AddItem {
            item: Item::new(name, price, seller_address),
            index: index as u64,
        };
        self.execute(&current, &call, funding)
    }

    /// Buy the item in slot `index`
    pub fn buy_item(&self, index: u64, funding: &FundingUtxo) -> Result<(Hash, ContractInstance)> {
        let current = self.latest()?;
        self.execute(&current, &TransitionCall::BuyItem { index }, funding)
    }

    fn execute(
        &self,
        current: &ContractInstance,
        call: &TransitionCall,
        funding: &FundingUtxo,
    ) -> Result<(Hash, ContractInstance)> {
        let unsigned = self
            .builder
            .build(current, call, &self.change_address, funding)?;

        let signed = self.signer.sign(&unsigned).map_err(|err| match err {
            MarketplaceError::SignerRejected(_) => err,
            other => MarketplaceError::SignerRejected(Cow::Owned(other.to_string())),
        })?;
        if commitment_hash(&signed.outputs) != unsigned.call_context().hash_outputs {
            return Err(MarketplaceError::SignerRejected(Cow::Borrowed(
                "signed transaction outputs differ from the built ones",
            )));
        }

        let txid = self.broadcaster.submit(&signed).map_err(|err| {
            warn!(transition = unsigned.transition, error = %err, "broadcast rejected");
            match err {
                MarketplaceError::ExternalRejection(_) => err,
                other => MarketplaceError::ExternalRejection(Cow::Owned(other.to_string())),
            }
        })?;

        let mut next = unsigned.next_instance(&signed);
        if next.location.hash != txid {
            debug!(
                computed = %hex::encode(next.location.hash),
                reported = %hex::encode(txid),
                "broadcaster reported a different txid"
            );
            next.location.hash = txid;
        }

        info!(
            transition = unsigned.transition,
            index = call.index(),
            txid = %hex::encode(txid),
            "transition broadcast"
        );
        Ok((txid, next))
    }
}
