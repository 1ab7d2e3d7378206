//! # Property-Based Tests
//!
//! Scoring, ordering and determinism invariants checked with proptest.

use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeMap;
use vouch_core::{
    Balances, CallContext, Genesis, ItemId, MemoryStore, Participant, Registry, RegistrySnapshot,
    snapshot_from_bytes, snapshot_to_bytes,
};

const LINK: &str = "https://example.org/story";
const VOTERS: [&str; 4] = ["ann", "ben", "cat", "dan"];

fn open(items: u64) -> Registry<MemoryStore, Balances> {
    let ledger = Balances::with_allocations([(Participant::new("author"), 1_000_000)])
        .expect("genesis");
    let mut reg = Registry::open(
        MemoryStore::new(),
        ledger,
        Genesis::new(Participant::new("admin")).with_charge(1),
    )
    .expect("open");
    for height in 1..=items {
        reg.submit(
            &CallContext::new(Participant::new("author"), height),
            "Headline",
            LINK,
            "science",
        )
        .expect("submit");
    }
    reg
}

fn vote_value() -> impl Strategy<Value = i64> {
    prop_oneof![Just(1i64), Just(-1i64)]
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Item score equals the sum of each voter's latest vote.
    #[test]
    fn score_is_sum_of_latest_votes(
        votes in vec((0usize..VOTERS.len(), vote_value()), 1..60)
    ) {
        let mut reg = open(1);
        let mut latest: BTreeMap<usize, i64> = BTreeMap::new();

        for (height, (voter, value)) in (10u64..).zip(votes.iter()) {
            let ctx = CallContext::new(Participant::new(VOTERS[*voter]), height);
            reg.appraise(&ctx, ItemId(1), *value).expect("appraise");
            latest.insert(*voter, *value);
        }

        let expected: i64 = latest.values().sum();
        let item = reg.get_item(ItemId(1)).expect("get").expect("present");
        prop_assert_eq!(item.score, expected);
    }

    /// Reputation equals the raw sum of every vote a participant cast.
    #[test]
    fn reputation_is_raw_sum(
        votes in vec((0u64..3, vote_value()), 1..60)
    ) {
        let mut reg = open(3);
        let voter = Participant::new("ann");
        let mut expected = 0i64;

        for (height, (item, value)) in (10u64..).zip(votes.iter()) {
            let ctx = CallContext::new(voter.clone(), height);
            reg.appraise(&ctx, ItemId(item + 1), *value).expect("appraise");
            expected += *value;
        }

        prop_assert_eq!(reg.get_reputation(&voter).expect("rep"), expected);
    }

    /// Top items are bounded, non-negative, and strictly ascending.
    #[test]
    fn top_items_bounded_and_ascending(
        items in 0u64..20,
        limit in 0u64..30,
        downvoted in vec(1u64..20, 0..10)
    ) {
        let mut reg = open(items);
        for (height, id) in (100u64..).zip(downvoted.iter()) {
            if *id <= items {
                let ctx = CallContext::new(Participant::new("ann"), height);
                reg.appraise(&ctx, ItemId(*id), -1).expect("appraise");
            }
        }

        let top = reg.get_top(limit).expect("top");
        prop_assert!(top.len() as u64 <= limit.min(items).min(10));
        prop_assert!(top.iter().all(|item| item.score >= 0));
        prop_assert!(top.windows(2).all(|pair| pair[0].id < pair[1].id));
    }

    /// Same operations produce byte-identical snapshots.
    #[test]
    fn determinism_identical_input_produces_identical_snapshot(
        items in 1u64..8,
        votes in vec((0usize..VOTERS.len(), 1u64..8, vote_value()), 0..30)
    ) {
        let run = || {
            let mut reg = open(items);
            for (height, (voter, id, value)) in (50u64..).zip(votes.iter()) {
                let ctx = CallContext::new(Participant::new(VOTERS[*voter]), height);
                let _ = reg.appraise(&ctx, ItemId(*id), *value);
            }
            let snapshot = RegistrySnapshot::capture(reg.store()).expect("capture");
            snapshot_to_bytes(&snapshot).expect("serialize")
        };

        let first = run();
        let second = run();
        prop_assert_eq!(&first, &second);

        let restored = snapshot_from_bytes(&first).expect("deserialize");
        prop_assert_eq!(snapshot_to_bytes(&restored).expect("serialize"), first);
    }

    /// Event sequences are gapless from 1.
    #[test]
    fn event_sequences_are_gapless(flags in 1usize..40) {
        let mut reg = open(1);
        for height in 0..flags {
            let ctx = CallContext::new(Participant::new("ann"), height as u64 + 10);
            reg.flag(&ctx, ItemId(1)).expect("flag");
        }

        let events = reg.events(1, 1000).expect("events");
        for (expected, record) in (1u64..).zip(events.iter()) {
            prop_assert_eq!(record.sequence, expected);
        }
        prop_assert_eq!(events.len(), flags + 1);
    }
}
