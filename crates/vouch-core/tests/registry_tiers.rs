//! # Registry Tier Tests (T0-T5)
//!
//! If ANY tier fails, the registry is INVALID.
//!
//! ## Tiers
//! - T0: Submission
//! - T1: Appraisal and Reputation
//! - T2: Value Flows and Atomicity
//! - T3: Administration
//! - T4: Queries
//! - T5: Persistence

use vouch_core::{
    Balances, CallContext, ChangeSet, EventRecord, Genesis, Item, ItemId, MemoryStore, Participant,
    RedbStore, Registry, RegistryStore, ValueTransfer, Vote, VouchError,
};

const LINK: &str = "https://example.org/story";

fn who(name: &str) -> Participant {
    Participant::new(name)
}

fn ctx(name: &str, height: u64) -> CallContext {
    CallContext::new(who(name), height)
}

fn funded() -> Balances {
    Balances::with_allocations([(who("alice"), 1_000), (who("bob"), 1_000), (who("x"), 1_000)])
        .expect("genesis")
}

fn registry(charge: u64) -> Registry<MemoryStore, Balances> {
    Registry::open(
        MemoryStore::new(),
        funded(),
        Genesis::new(who("admin")).with_charge(charge),
    )
    .expect("open")
}

// =============================================================================
// TIER T0: SUBMISSION
// =============================================================================

mod t0_submission {
    use super::*;

    /// T0.1: Identifiers start at 1 and increase by one.
    #[test]
    fn identifiers_are_sequential() {
        let mut reg = registry(10);
        for expected in 1..=5 {
            let id = reg
                .submit(&ctx("alice", expected), "Headline", LINK, "technology")
                .expect("submit");
            assert_eq!(id, ItemId(expected));
        }
        assert_eq!(reg.get_total().expect("total"), 5);
    }

    /// T0.2: A new item starts with zeroed counters and the call height.
    #[test]
    fn new_item_is_zeroed() {
        let mut reg = registry(10);
        let id = reg
            .submit(&ctx("alice", 42), "Headline", LINK, "culture")
            .expect("submit");
        let item = reg.get_item(id).expect("get").expect("present");

        assert_eq!(item.score, 0);
        assert_eq!(item.tips, 0);
        assert_eq!(item.flags, 0);
        assert_eq!(item.created_at, 42);
        assert_eq!(item.topic, "culture");
    }

    /// T0.3: Every length boundary is enforced.
    #[test]
    fn length_boundaries() {
        let mut reg = registry(0);
        let c = ctx("alice", 1);
        let long_headline = "h".repeat(101);
        let long_link = format!("https://{}", "a".repeat(200));

        assert!(matches!(reg.submit(&c, "", LINK, "science"), Err(VouchError::InvalidInput(_))));
        assert!(matches!(
            reg.submit(&c, &long_headline, LINK, "science"),
            Err(VouchError::InvalidInput(_))
        ));
        assert!(matches!(
            reg.submit(&c, "Headline", "short", "science"),
            Err(VouchError::InvalidInput(_))
        ));
        assert!(matches!(
            reg.submit(&c, "Headline", &long_link, "science"),
            Err(VouchError::InvalidInput(_))
        ));
        assert!(matches!(
            reg.submit(&c, "Headline", LINK, ""),
            Err(VouchError::InvalidInput(_))
        ));

        assert!(reg.submit(&c, &"h".repeat(100), "0123456789", "science").is_ok());
    }

    /// T0.4: Topics must be in the catalog at submission time.
    #[test]
    fn topic_must_be_listed() {
        let mut reg = registry(0);
        assert!(matches!(
            reg.submit(&ctx("alice", 1), "Headline", LINK, "gardening"),
            Err(VouchError::InvalidInput(_))
        ));
        reg.add_topic(&ctx("admin", 2), "gardening").expect("add");
        assert!(reg.submit(&ctx("alice", 3), "Headline", LINK, "gardening").is_ok());
    }

    /// T0.5: A failed submission consumes no identifier.
    #[test]
    fn failed_submission_consumes_nothing() {
        let mut reg = registry(10);
        let _ = reg.submit(&ctx("nobody", 1), "Headline", LINK, "science");
        let id = reg
            .submit(&ctx("alice", 2), "Headline", LINK, "science")
            .expect("submit");
        assert_eq!(id, ItemId(1));
    }

    /// T0.6: An exhausted identifier space refuses the submission.
    #[test]
    fn exhausted_identifiers_overflow() {
        let mut store = MemoryStore::new();
        store
            .commit(ChangeSet {
                administrator: Some(who("admin")),
                appended_topics: vec!["science".to_string()],
                submission_count: Some(u64::MAX),
                submission_charge: Some(10),
                ..ChangeSet::default()
            })
            .expect("seed");
        let mut reg =
            Registry::open(store, funded(), Genesis::new(who("admin"))).expect("open");

        let result = reg.submit(&ctx("alice", 1), "Headline", LINK, "science");
        assert_eq!(result, Err(VouchError::Overflow));
        assert_eq!(reg.get_total().expect("total"), u64::MAX);
        assert!(reg.events(1, 10).expect("events").is_empty());
        assert_eq!(reg.balance(&who("alice")), 1_000);
        assert_eq!(reg.balance(&who("admin")), 0);
    }
}

// =============================================================================
// TIER T1: APPRAISAL AND REPUTATION
// =============================================================================

mod t1_appraisal {
    use super::*;

    /// T1.1: Worked example of delta scoring against raw reputation.
    #[test]
    fn revote_sequence() {
        let mut reg = registry(10);
        let id = reg
            .submit(&ctx("alice", 1), "Headline", LINK, "science")
            .expect("submit");
        assert_eq!(id, ItemId(1));

        let steps = [(1, 1, 1), (1, 1, 2), (-1, -1, 1)];
        for (height, (vote, score, reputation)) in (2u64..).zip(steps) {
            reg.appraise(&ctx("x", height), id, vote).expect("appraise");
            let item = reg.get_item(id).expect("get").expect("present");
            assert_eq!(item.score, score);
            assert_eq!(reg.get_reputation(&who("x")).expect("rep"), reputation);
        }
    }

    /// T1.2: Score is the sum of the latest vote of every voter.
    #[test]
    fn score_tracks_latest_votes() {
        let mut reg = registry(0);
        let id = reg
            .submit(&ctx("alice", 1), "Headline", LINK, "science")
            .expect("submit");

        reg.appraise(&ctx("bob", 2), id, 1).expect("vote");
        reg.appraise(&ctx("x", 3), id, -1).expect("vote");
        reg.appraise(&ctx("alice", 4), id, 1).expect("vote");
        reg.appraise(&ctx("x", 5), id, 1).expect("vote");

        assert_eq!(reg.get_item(id).expect("get").expect("present").score, 3);
    }

    /// T1.3: Never-voted is distinguishable from any vote.
    #[test]
    fn absent_appraisal_and_zero_reputation() {
        let mut reg = registry(0);
        let id = reg
            .submit(&ctx("alice", 1), "Headline", LINK, "science")
            .expect("submit");

        assert_eq!(reg.get_appraisal(&who("bob"), id).expect("vote"), None);
        assert_eq!(reg.get_reputation(&who("bob")).expect("rep"), 0);
        reg.appraise(&ctx("bob", 2), id, -1).expect("vote");
        assert_eq!(reg.get_appraisal(&who("bob"), id).expect("vote"), Some(Vote::Down));
    }

    /// T1.4: Out-of-domain values are rejected before anything changes.
    #[test]
    fn invalid_values_rejected() {
        let mut reg = registry(0);
        let id = reg
            .submit(&ctx("alice", 1), "Headline", LINK, "science")
            .expect("submit");

        for value in [0, 2, -2, i64::MAX, i64::MIN] {
            assert!(matches!(
                reg.appraise(&ctx("bob", 2), id, value),
                Err(VouchError::InvalidInput(_))
            ));
        }
        assert_eq!(reg.get_reputation(&who("bob")).expect("rep"), 0);
    }
}

// =============================================================================
// TIER T2: VALUE FLOWS AND ATOMICITY
// =============================================================================

mod t2_value_flows {
    use super::*;

    /// Ledger that refuses every transfer.
    struct FrozenLedger(Balances);

    impl ValueTransfer for FrozenLedger {
        fn balance(&self, who: &Participant) -> u64 {
            self.0.balance(who)
        }

        fn transfer(&mut self, _: &Participant, _: &Participant, _: u64) -> Result<(), VouchError> {
            Err(VouchError::IoError("ledger frozen".to_string()))
        }
    }

    /// Store that fails every commit after genesis.
    #[derive(Default)]
    struct BrittleStore {
        inner: MemoryStore,
        commits: u32,
    }

    impl RegistryStore for BrittleStore {
        fn administrator(&self) -> Result<Option<Participant>, VouchError> {
            self.inner.administrator()
        }
        fn item(&self, id: ItemId) -> Result<Option<Item>, VouchError> {
            self.inner.item(id)
        }
        fn appraisal(&self, who: &Participant, id: ItemId) -> Result<Option<Vote>, VouchError> {
            self.inner.appraisal(who, id)
        }
        fn reputation(&self, who: &Participant) -> Result<Option<i64>, VouchError> {
            self.inner.reputation(who)
        }
        fn topics(&self) -> Result<Vec<String>, VouchError> {
            self.inner.topics()
        }
        fn submission_count(&self) -> Result<u64, VouchError> {
            self.inner.submission_count()
        }
        fn submission_charge(&self) -> Result<u64, VouchError> {
            self.inner.submission_charge()
        }
        fn event_count(&self) -> Result<u64, VouchError> {
            self.inner.event_count()
        }
        fn events(&self, from: u64, limit: usize) -> Result<Vec<EventRecord>, VouchError> {
            self.inner.events(from, limit)
        }
        fn items(&self) -> Result<Vec<Item>, VouchError> {
            self.inner.items()
        }
        fn appraisals(&self) -> Result<Vec<(Participant, ItemId, Vote)>, VouchError> {
            self.inner.appraisals()
        }
        fn reputations(&self) -> Result<Vec<(Participant, i64)>, VouchError> {
            self.inner.reputations()
        }
        fn live_items(&self) -> Result<u64, VouchError> {
            self.inner.live_items()
        }
        fn commit(&mut self, changes: ChangeSet) -> Result<(), VouchError> {
            self.commits += 1;
            if self.commits > 1 {
                return Err(VouchError::IoError("disk full".to_string()));
            }
            self.inner.commit(changes)
        }
    }

    /// T2.1: Submission fee goes to the administrator.
    #[test]
    fn fee_goes_to_admin() {
        let mut reg = registry(25);
        reg.submit(&ctx("alice", 1), "Headline", LINK, "science")
            .expect("submit");
        assert_eq!(reg.balance(&who("alice")), 975);
        assert_eq!(reg.balance(&who("admin")), 25);
    }

    /// T2.2: Rewards accumulate on the item and move value to the originator.
    #[test]
    fn rewards_accumulate() {
        let mut reg = registry(0);
        let id = reg
            .submit(&ctx("alice", 1), "Headline", LINK, "science")
            .expect("submit");
        reg.reward(&ctx("bob", 2), id, 30).expect("reward");
        reg.reward(&ctx("x", 3), id, 12).expect("reward");

        assert_eq!(reg.get_item(id).expect("get").expect("present").tips, 42);
        assert_eq!(reg.balance(&who("alice")), 1_042);
    }

    /// T2.3: A refused transfer leaves no bookkeeping behind.
    #[test]
    fn refused_transfer_rolls_back() {
        let mut reg = Registry::open(
            MemoryStore::new(),
            FrozenLedger(funded()),
            Genesis::new(who("admin")).with_charge(10),
        )
        .expect("open");

        let result = reg.submit(&ctx("alice", 1), "Headline", LINK, "science");
        assert!(matches!(result, Err(VouchError::IoError(_))));
        assert_eq!(reg.get_total().expect("total"), 0);
        assert!(reg.events(1, 10).expect("events").is_empty());
    }

    /// T2.4: A failed commit reverses the transfer already made.
    #[test]
    fn failed_commit_reverses_transfer() {
        let mut reg = Registry::open(
            BrittleStore::default(),
            funded(),
            Genesis::new(who("admin")).with_charge(10),
        )
        .expect("open");

        let result = reg.submit(&ctx("alice", 1), "Headline", LINK, "science");
        assert!(matches!(result, Err(VouchError::IoError(_))));
        assert_eq!(reg.balance(&who("alice")), 1_000);
        assert_eq!(reg.balance(&who("admin")), 0);
        assert_eq!(reg.get_total().expect("total"), 0);
    }

    /// T2.5: Self-reward is allowed and moves nothing.
    #[test]
    fn self_reward_keeps_balance() {
        let mut reg = registry(0);
        let id = reg
            .submit(&ctx("alice", 1), "Headline", LINK, "science")
            .expect("submit");
        reg.reward(&ctx("alice", 2), id, 50).expect("reward");
        assert_eq!(reg.balance(&who("alice")), 1_000);
        assert_eq!(reg.get_item(id).expect("get").expect("present").tips, 50);
    }

    /// T2.6: A zero reward succeeds and is journaled.
    #[test]
    fn zero_reward_succeeds() {
        let mut reg = registry(0);
        let id = reg
            .submit(&ctx("alice", 1), "Headline", LINK, "science")
            .expect("submit");
        reg.reward(&ctx("bob", 2), id, 0).expect("reward");

        assert_eq!(reg.get_item(id).expect("get").expect("present").tips, 0);
        assert_eq!(reg.balance(&who("bob")), 1_000);
        let events = reg.events(2, 10).expect("events");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.kind(), "reward");
    }
}

// =============================================================================
// TIER T3: ADMINISTRATION
// =============================================================================

mod t3_administration {
    use super::*;

    /// T3.1: The new charge applies to the next submission.
    #[test]
    fn charge_change_applies_next() {
        let mut reg = registry(10);
        reg.set_charge(&ctx("admin", 1), u64::MAX).expect("charge");
        assert_eq!(reg.charge().expect("charge"), u64::MAX);
        assert!(matches!(
            reg.submit(&ctx("alice", 2), "Headline", LINK, "science"),
            Err(VouchError::InsufficientFunds { .. })
        ));
    }

    /// T3.2: Duplicate labels are accepted.
    #[test]
    fn duplicate_topic_accepted() {
        let mut reg = registry(0);
        reg.add_topic(&ctx("admin", 1), "science").expect("add");
        let topics = reg.topics().expect("topics");
        assert_eq!(topics.iter().filter(|t| *t == "science").count(), 2);
    }

    /// T3.3: Non-admins cannot remove items.
    #[test]
    fn removal_requires_admin() {
        let mut reg = registry(0);
        let id = reg
            .submit(&ctx("alice", 1), "Headline", LINK, "science")
            .expect("submit");
        assert_eq!(reg.remove_item(&ctx("alice", 2), id), Err(VouchError::Unauthorized));
        assert!(reg.get_item(id).expect("get").is_some());
    }

    /// T3.4: A removed item can no longer be appraised, rewarded or flagged.
    #[test]
    fn removed_item_is_gone() {
        let mut reg = registry(0);
        let id = reg
            .submit(&ctx("alice", 1), "Headline", LINK, "science")
            .expect("submit");
        reg.remove_item(&ctx("admin", 2), id).expect("remove");

        assert_eq!(reg.appraise(&ctx("bob", 3), id, 1), Err(VouchError::NotFound(id)));
        assert_eq!(reg.reward(&ctx("bob", 3), id, 1), Err(VouchError::NotFound(id)));
        assert_eq!(reg.flag(&ctx("bob", 3), id), Err(VouchError::NotFound(id)));
    }
}

// =============================================================================
// TIER T4: QUERIES
// =============================================================================

mod t4_queries {
    use super::*;

    /// T4.1: Top items are filtered but never reordered.
    #[test]
    fn top_preserves_identifier_order() {
        let mut reg = registry(0);
        for height in 1..=4 {
            reg.submit(&ctx("alice", height), "Headline", LINK, "science")
                .expect("submit");
        }
        reg.appraise(&ctx("bob", 5), ItemId(4), 1).expect("vote");
        reg.appraise(&ctx("x", 6), ItemId(4), 1).expect("vote");
        reg.appraise(&ctx("bob", 7), ItemId(2), -1).expect("vote");
        reg.remove_item(&ctx("admin", 8), ItemId(3)).expect("remove");

        let ids: Vec<ItemId> = reg.get_top(10).expect("top").iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![ItemId(1), ItemId(4)]);
    }

    /// T4.2: The window never reaches past the tenth identifier.
    #[test]
    fn top_ignores_items_past_window() {
        let mut reg = registry(0);
        for height in 1..=12 {
            reg.submit(&ctx("alice", height), "Headline", LINK, "science")
                .expect("submit");
        }
        let top = reg.get_top(u64::MAX).expect("top");
        assert_eq!(top.len(), 10);
        assert!(top.iter().all(|item| item.id.value() <= 10));
    }

    /// T4.3: Rejected operations emit nothing.
    #[test]
    fn events_only_for_commits() {
        let mut reg = registry(0);
        let id = reg
            .submit(&ctx("alice", 1), "Headline", LINK, "science")
            .expect("submit");
        let _ = reg.flag(&ctx("alice", 2), id);
        let _ = reg.set_charge(&ctx("bob", 3), 1);
        reg.flag(&ctx("bob", 4), id).expect("flag");

        let events = reg.events(0, 100).expect("events");
        let sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
        assert_eq!(events[1].height, 4);
    }
}

// =============================================================================
// TIER T5: PERSISTENCE
// =============================================================================

mod t5_persistence {
    use super::*;
    use tempfile::tempdir;

    /// T5.1: State survives closing and reopening the database.
    #[test]
    fn registry_state_survives_reopen() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("vouch.redb");

        {
            let store = RedbStore::open(&path).expect("open db");
            let mut reg =
                Registry::open(store, funded(), Genesis::new(who("admin")).with_charge(5))
                    .expect("open");
            let id = reg
                .submit(&ctx("alice", 1), "Headline", LINK, "science")
                .expect("submit");
            reg.appraise(&ctx("x", 2), id, 1).expect("vote");
            reg.add_topic(&ctx("admin", 3), "sports").expect("topic");
        }

        let store = RedbStore::open(&path).expect("reopen db");
        // Genesis charge is ignored for an initialized store.
        let reg = Registry::open(store, funded(), Genesis::new(who("admin")).with_charge(99))
            .expect("open");
        assert_eq!(reg.get_total().expect("total"), 1);
        assert_eq!(reg.charge().expect("charge"), 5);
        assert_eq!(reg.get_reputation(&who("x")).expect("rep"), 1);
        assert_eq!(reg.topics().expect("topics").len(), 6);
        assert_eq!(reg.last_height().expect("height"), 3);
    }

    /// T5.2: Memory and disk backends agree on every query.
    #[test]
    fn backends_agree() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("vouch.redb")).expect("open db");

        let mut disk = Registry::open(store, funded(), Genesis::new(who("admin")).with_charge(3))
            .expect("open");
        let mut memory = registry(3);

        for height in 1..=3 {
            disk.submit(&ctx("alice", height), "Headline", LINK, "finance")
                .expect("submit");
            memory
                .submit(&ctx("alice", height), "Headline", LINK, "finance")
                .expect("submit");
        }
        disk.appraise(&ctx("bob", 4), ItemId(2), -1).expect("vote");
        memory.appraise(&ctx("bob", 4), ItemId(2), -1).expect("vote");

        assert_eq!(disk.get_top(10).expect("top"), memory.get_top(10).expect("top"));
        assert_eq!(
            disk.events(0, 100).expect("events"),
            memory.events(0, 100).expect("events")
        );
    }
}
