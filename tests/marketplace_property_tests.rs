//! Property-based tests for marketplace invariants
//!
//! Uses PropTest to generate random slot tables and calls, checking the
//! codec laws and builder/validator agreement over the whole input space.


use marketplace_covenant::builder::TxBuilder;
use marketplace_covenant::commitment::{
    commitment_hash, deserialize_state, deserialize_state_output, serialize_state, state_output,
};
use marketplace_covenant::constants::ITEM_SLOTS;
use marketplace_covenant::transition::{validate_add_item, validate_buy_item};
use marketplace_covenant::types::*;
use marketplace_covenant::MarketplaceError;
use proptest::prelude::*;
use test_helpers::*;

fn arb_item() -> impl Strategy<Value = Item> {
    (
        prop::collection::vec(any::<u8>(), 0..300),
        any::<u64>(),
        any::<[u8; 20]>(),
        any::<bool>(),
    )
        .prop_map(|(name, price, seller_address, is_empty_slot)| Item {
            name,
            price,
            seller_address,
            is_empty_slot,
        })
}

fn arb_state() -> impl Strategy<Value = ContractState> {
    (
        prop::collection::vec(arb_item(), ITEM_SLOTS),
        1u64..1_000_000,
    )
        .prop_map(|(items, balance)| {
            let mut state = ContractState::genesis(balance);
            for (slot, item) in state.slots.iter_mut().zip(items) {
                *slot = item;
            }
            state
        })
}

fn arb_listing() -> impl Strategy<Value = Item> {
    (
        "[a-z ]{0,40}",
        1u64..1_000_000_000,
        any::<[u8; 20]>(),
    )
        .prop_map(|(name, price, seller)| Item::new(name, price, seller))
}

proptest! {
    #[test]
    fn state_round_trips(state in arb_state()) {
        let bytes = serialize_state(&state).unwrap();
        prop_assert_eq!(deserialize_state(&bytes, state.balance).unwrap(), state.clone());

        let output = state_output(CODE, &state).unwrap();
        prop_assert_eq!(deserialize_state_output(CODE, &output).unwrap(), state);
    }

    #[test]
    fn distinct_states_commit_differently(a in arb_state(), b in arb_state()) {
        prop_assume!(a != b);
        let ha = commitment_hash(&[state_output(CODE, &a).unwrap()]);
        let hb = commitment_hash(&[state_output(CODE, &b).unwrap()]);
        prop_assert_ne!(ha, hb);
    }

    #[test]
    fn add_succeeds_on_every_empty_index(
        state in arb_state(),
        item in arb_listing(),
        index in 0u64..ITEM_SLOTS as u64,
        extra in 0u64..100_000,
    ) {
        let builder = TxBuilder::new(CODE).with_runtime_assertions(false);
        let current = instance_of(state.clone());
        let built = builder.build_add_item(&current, &item, index, &BUYER, &funding(0x01, extra));

        if state.slots[index as usize].is_empty_slot {
            let unsigned = built.unwrap();
            let next = validate_add_item(CODE, &state, &item, index, &unsigned.call_context()).unwrap();
            prop_assert_eq!(&next.slots[index as usize], &item);
            prop_assert_eq!(next.balance, state.balance);
            for (i, (before, after)) in state.slots.iter().zip(next.slots.iter()).enumerate() {
                if i != index as usize {
                    prop_assert_eq!(before, after);
                }
            }
        } else {
            prop_assert_eq!(built.unwrap_err(), MarketplaceError::SlotNotEmpty(index as usize));
        }
    }

    #[test]
    fn buy_frees_the_slot_and_pays_the_seller(
        state in arb_state(),
        index in 0usize..ITEM_SLOTS,
        price in 1u64..1_000_000_000,
        seller in any::<[u8; 20]>().prop_filter("seller must be set", |s| s != &[0u8; 20]),
    ) {
        let mut state = state;
        state.slots[index] = Item::new("lot", price, seller);
        let builder = TxBuilder::new(CODE);
        let current = instance_of(state.clone());

        // the contract input carries the balance; the funding coin pays exactly the price
        let unsigned = builder
            .build_buy_item(&current, index as u64, &BUYER, &funding(0x02, price))
            .unwrap();
        let next = validate_buy_item(CODE, &state, index as u64, &unsigned.call_context()).unwrap();
        prop_assert!(next.slots[index].is_empty_slot);
        prop_assert_eq!(next.slots[index].price, price);
        prop_assert_eq!(unsigned.tx.outputs.len(), 2);
        prop_assert_eq!(unsigned.tx.outputs[1].value, price);
    }

    #[test]
    fn out_of_range_index_always_fails(
        state in arb_state(),
        index in (ITEM_SLOTS as u64)..u64::MAX,
    ) {
        let ctx = CallContext {
            hash_outputs: [0u8; 32],
            change: ChangeOutput { address: BUYER, amount: 0 },
        };
        let expected = MarketplaceError::IndexOutOfRange { index, slots: ITEM_SLOTS };
        prop_assert_eq!(
            validate_add_item(CODE, &state, &Item::new("x", 1, SELLER), index, &ctx),
            Err(expected.clone())
        );
        prop_assert_eq!(validate_buy_item(CODE, &state, index, &ctx), Err(expected));
    }
}
