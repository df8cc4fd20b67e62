//! Transition validator: the contract's on-chain logic
//!
//! Each transition checks its preconditions, computes the successor state,
//! reconstructs the exact output set the spending transaction must carry and
//! compares its hash with the `hashOutputs` committed by the signature
//! context. That equality is the only authorization: a transition is
//! accepted only if the spender recreated the prescribed next state.
//!
//! Validation is pure. Nothing is mutated; the caller gets either the next
//! state or the first failed check.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::{debug, warn};

use crate::commitment::{state_output, verify_commitment};
use crate::config::log_rejections;
use crate::error::{MarketplaceError, Result};
use crate::script::build_p2pkh_script;
use crate::types::*;

/// Registry name of the add-item transition
pub const ADD_ITEM: &str = "addItem";

/// Registry name of the buy-item transition
pub const BUY_ITEM: &str = "buyItem";

/// A public contract method call with its arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionCall {
    AddItem { item: Item, index: u64 },
    BuyItem { index: u64 },
}

impl TransitionCall {
    /// Method name, used as the builder registry key
    pub fn name(&self) -> &'static str {
        match self {
            TransitionCall::AddItem { .. } => ADD_ITEM,
            TransitionCall::BuyItem { .. } => BUY_ITEM,
        }
    }

    pub fn index(&self) -> u64 {
        match self {
            TransitionCall::AddItem { index, .. } | TransitionCall::BuyItem { index } => *index,
        }
    }
}

/// A P2PKH output paying `value` to `address`
pub fn p2pkh_output(address: &PubKeyHash, value: u64) -> TransactionOutput {
    TransactionOutput {
        value,
        script_pubkey: build_p2pkh_script(address),
    }
}

/// The change output, or nothing when there is no change
pub fn change_output(change: &ChangeOutput) -> Option<TransactionOutput> {
    (change.amount > 0).then(|| p2pkh_output(&change.address, change.amount))
}

/// Check the preconditions of adding `item` at `index` without touching any hash
pub fn check_add_item(state: &ContractState, item: &Item, index: u64) -> Result<usize> {
    let slot = state.slot(index)?;
    let index = index as usize;
    if !slot.is_empty_slot {
        return Err(MarketplaceError::SlotNotEmpty(index));
    }
    if item.is_empty_slot {
        return Err(MarketplaceError::InvalidNewItem(Cow::Borrowed(
            "new item cannot have the \"isEmptySlot\" flag set to true",
        )));
    }
    if item.price == 0 {
        return Err(MarketplaceError::InvalidNewItem(Cow::Borrowed(
            "item price must be at least one satoshi",
        )));
    }
    Ok(index)
}

/// Successor state of an add-item call. Balance is unchanged.
pub fn next_state_after_add(state: &ContractState, item: &Item, index: u64) -> Result<ContractState> {
    let index = check_add_item(state, item, index)?;
    let mut next = state.clone();
    next.slots[index] = item.clone();
    Ok(next)
}

/// Successor state of a buy-item call: the slot is flagged empty, its other
/// fields stay behind. Balance is unchanged.
///
/// An already-empty slot is accepted and yields a state identical to the
/// current one.
pub fn next_state_after_buy(state: &ContractState, index: u64) -> Result<(ContractState, Item)> {
    let item = state.slot(index)?.clone();
    let mut next = state.clone();
    next.slots[index as usize].is_empty_slot = true;
    Ok((next, item))
}

/// Validate an `addItem` call.
///
/// Required outputs, in order: the state continuation for the next state,
/// then the caller's change (omitted when the change amount is zero).
pub fn validate_add_item(
    code: &[u8],
    state: &ContractState,
    item: &Item,
    index: u64,
    ctx: &CallContext,
) -> Result<ContractState> {
    report(ADD_ITEM, index, add_item_inner(code, state, item, index, ctx))
}

fn add_item_inner(
    code: &[u8],
    state: &ContractState,
    item: &Item,
    index: u64,
    ctx: &CallContext,
) -> Result<ContractState> {
    let next = next_state_after_add(state, item, index)?;

    let mut outputs = vec![state_output(code, &next)?];
    outputs.extend(change_output(&ctx.change));
    verify_commitment(&outputs, &ctx.hash_outputs)?;

    Ok(next)
}

/// Validate a `buyItem` call.
///
/// Required outputs, in order: the state continuation (unchanged balance),
/// the payment of the item's price to its seller, then the buyer's change.
pub fn validate_buy_item(
    code: &[u8],
    state: &ContractState,
    index: u64,
    ctx: &CallContext,
) -> Result<ContractState> {
    report(BUY_ITEM, index, buy_item_inner(code, state, index, ctx))
}

fn buy_item_inner(
    code: &[u8],
    state: &ContractState,
    index: u64,
    ctx: &CallContext,
) -> Result<ContractState> {
    let (next, item) = next_state_after_buy(state, index)?;

    let mut outputs = vec![
        state_output(code, &next)?,
        p2pkh_output(&item.seller_address, item.price),
    ];
    outputs.extend(change_output(&ctx.change));
    verify_commitment(&outputs, &ctx.hash_outputs)?;

    Ok(next)
}

/// Validate any transition call
pub fn validate_transition(
    code: &[u8],
    state: &ContractState,
    call: &TransitionCall,
    ctx: &CallContext,
) -> Result<ContractState> {
    match call {
        TransitionCall::AddItem { item, index } => validate_add_item(code, state, item, *index, ctx),
        TransitionCall::BuyItem { index } => validate_buy_item(code, state, *index, ctx),
    }
}

fn report(transition: &str, index: u64, result: Result<ContractState>) -> Result<ContractState> {
    match &result {
        Ok(next) => debug!(
            transition,
            index,
            occupied = next.occupied_count(),
            "transition accepted"
        ),
        Err(err) if log_rejections() => {
            warn!(transition, index, error = %err, "transition rejected")
        }
        Err(err) => debug!(transition, index, error = %err, "transition rejected"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::commitment_hash;
    use crate::constants::ITEM_SLOTS;

    const CODE: &[u8] = &[0x51];
    const BUYER: PubKeyHash = [0x22; 20];

    fn sword() -> Item {
        Item::new("sword", 500_000, [0x11; 20])
    }

    fn ctx_for(outputs: &[TransactionOutput], change_amount: u64) -> CallContext {
        CallContext {
            hash_outputs: commitment_hash(outputs),
            change: ChangeOutput {
                address: BUYER,
                amount: change_amount,
            },
        }
    }

    #[test]
    fn test_add_item_accepts_matching_outputs() {
        let state = ContractState::genesis(1);
        let mut expected = state.clone();
        expected.slots[2] = sword();

        let outputs = vec![
            state_output(CODE, &expected).unwrap(),
            p2pkh_output(&BUYER, 900),
        ];
        let next = validate_add_item(CODE, &state, &sword(), 2, &ctx_for(&outputs, 900)).unwrap();
        assert_eq!(next, expected);
    }

    #[test]
    fn test_add_item_without_change() {
        let state = ContractState::genesis(1);
        let mut expected = state.clone();
        expected.slots[0] = sword();
        let outputs = vec![state_output(CODE, &expected).unwrap()];
        assert!(validate_add_item(CODE, &state, &sword(), 0, &ctx_for(&outputs, 0)).is_ok());
    }

    #[test]
    fn test_add_item_rejects_occupied_slot() {
        let mut state = ContractState::genesis(1);
        state.slots[4] = sword();
        let ctx = ctx_for(&[], 0);
        assert_eq!(
            validate_add_item(CODE, &state, &Item::new("shield", 1, [3; 20]), 4, &ctx),
            Err(MarketplaceError::SlotNotEmpty(4))
        );
    }

    #[test]
    fn test_add_item_rejects_invalid_items() {
        let state = ContractState::genesis(1);
        let ctx = ctx_for(&[], 0);

        let free = Item::new("free", 0, [3; 20]);
        assert!(matches!(
            validate_add_item(CODE, &state, &free, 0, &ctx),
            Err(MarketplaceError::InvalidNewItem(_))
        ));

        let flagged = Item {
            is_empty_slot: true,
            ..sword()
        };
        assert!(matches!(
            validate_add_item(CODE, &state, &flagged, 0, &ctx),
            Err(MarketplaceError::InvalidNewItem(_))
        ));
    }

    #[test]
    fn test_add_item_rejects_wrong_commitment() {
        let state = ContractState::genesis(1);
        // outputs that carry the unchanged state instead of the successor
        let outputs = vec![state_output(CODE, &state).unwrap()];
        assert!(matches!(
            validate_add_item(CODE, &state, &sword(), 0, &ctx_for(&outputs, 0)),
            Err(MarketplaceError::CommitmentMismatch { .. })
        ));
    }

    #[test]
    fn test_index_out_of_range() {
        let state = ContractState::genesis(1);
        let ctx = ctx_for(&[], 0);
        for index in [ITEM_SLOTS as u64, 11, u64::MAX] {
            assert_eq!(
                validate_add_item(CODE, &state, &sword(), index, &ctx),
                Err(MarketplaceError::IndexOutOfRange {
                    index,
                    slots: ITEM_SLOTS
                })
            );
            assert_eq!(
                validate_buy_item(CODE, &state, index, &ctx),
                Err(MarketplaceError::IndexOutOfRange {
                    index,
                    slots: ITEM_SLOTS
                })
            );
        }
    }

    #[test]
    fn test_buy_item_requires_payment_output() {
        let mut state = ContractState::genesis(1);
        state.slots[1] = sword();
        let mut next = state.clone();
        next.slots[1].is_empty_slot = true;

        let with_payment = vec![
            state_output(CODE, &next).unwrap(),
            p2pkh_output(&[0x11; 20], 500_000),
        ];
        assert_eq!(
            validate_buy_item(CODE, &state, 1, &ctx_for(&with_payment, 0)).unwrap(),
            next
        );

        let underpaid = vec![
            state_output(CODE, &next).unwrap(),
            p2pkh_output(&[0x11; 20], 499_999),
        ];
        assert!(matches!(
            validate_buy_item(CODE, &state, 1, &ctx_for(&underpaid, 0)),
            Err(MarketplaceError::CommitmentMismatch { .. })
        ));
    }

    #[test]
    fn test_buy_keeps_stale_fields() {
        let mut state = ContractState::genesis(7);
        state.slots[0] = sword();
        let (next, bought) = next_state_after_buy(&state, 0).unwrap();
        assert_eq!(bought, sword());
        assert!(next.slots[0].is_empty_slot);
        assert_eq!(next.slots[0].name, b"sword".to_vec());
        assert_eq!(next.slots[0].price, 500_000);
        assert_eq!(next.balance, 7);
    }

    #[test]
    fn test_transition_call_dispatch() {
        let state = ContractState::genesis(1);
        let call = TransitionCall::AddItem {
            item: sword(),
            index: 0,
        };
        assert_eq!(call.name(), ADD_ITEM);
        let next = next_state_after_add(&state, &sword(), 0).unwrap();
        let outputs = vec![state_output(CODE, &next).unwrap()];
        assert_eq!(
            validate_transition(CODE, &state, &call, &ctx_for(&outputs, 0)).unwrap(),
            next
        );
        assert_eq!(TransitionCall::BuyItem { index: 3 }.name(), BUY_ITEM);
        assert_eq!(TransitionCall::BuyItem { index: 3 }.index(), 3);
    }
}
