//! # Registry Store
//!
//! The durable state owned by the registry, behind one trait so the
//! engine runs unchanged over memory and over disk.
//!
//! State held by every store:
//! - Items: `ItemId -> Item`
//! - Appraisals: `(Participant, ItemId) -> Vote`
//! - Reputations: `Participant -> i64`
//! - Topic catalog (ordered)
//! - Scalars: submission count, submission charge, administrator
//! - Event journal, in commit order
//!
//! Stores never validate. The engine decides *what* to write; a store only
//! applies a `ChangeSet` all at once.

use crate::changeset::ChangeSet;
use crate::primitives::MAX_EVENT_PAGE;
use crate::{EventRecord, Item, ItemId, Participant, VouchError, Vote};
use std::collections::BTreeMap;

// =============================================================================
// REGISTRYSTORE TRAIT
// =============================================================================

/// Storage operations needed by the engine and the query layer.
///
/// All fallible operations return `Result<T, VouchError>` to support both
/// in-memory and persistent backends uniformly.
pub trait RegistryStore {
    /// Administrator recorded at genesis, `None` for an uninitialized store.
    fn administrator(&self) -> Result<Option<Participant>, VouchError>;

    /// Lookup an item. Removed and never-issued ids are both `None`.
    fn item(&self, id: ItemId) -> Result<Option<Item>, VouchError>;

    /// Latest appraisal of `who` for `id`.
    fn appraisal(&self, who: &Participant, id: ItemId) -> Result<Option<Vote>, VouchError>;

    /// Stored reputation of `who`, `None` if they never appraised.
    fn reputation(&self, who: &Participant) -> Result<Option<i64>, VouchError>;

    /// Topic catalog in insertion order.
    fn topics(&self) -> Result<Vec<String>, VouchError>;

    /// Number of items ever submitted (also the last issued id).
    fn submission_count(&self) -> Result<u64, VouchError>;

    /// Current submission charge.
    fn submission_charge(&self) -> Result<u64, VouchError>;

    /// Number of journaled events (also the last sequence number).
    fn event_count(&self) -> Result<u64, VouchError>;

    /// Events with `sequence >= from`, at most `limit` (capped at `MAX_EVENT_PAGE`).
    fn events(&self, from: u64, limit: usize) -> Result<Vec<EventRecord>, VouchError>;

    /// All items in id order.
    fn items(&self) -> Result<Vec<Item>, VouchError>;

    /// All appraisals in key order.
    fn appraisals(&self) -> Result<Vec<(Participant, ItemId, Vote)>, VouchError>;

    /// All reputations in participant order.
    fn reputations(&self) -> Result<Vec<(Participant, i64)>, VouchError>;

    /// Number of items currently present (removed items excluded).
    fn live_items(&self) -> Result<u64, VouchError>;

    /// Apply every write of `changes` atomically.
    fn commit(&mut self, changes: ChangeSet) -> Result<(), VouchError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-memory registry state.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    administrator: Option<Participant>,
    items: BTreeMap<ItemId, Item>,
    appraisals: BTreeMap<(Participant, ItemId), Vote>,
    reputations: BTreeMap<Participant, i64>,
    topics: Vec<String>,
    submission_count: u64,
    submission_charge: u64,
    events: Vec<EventRecord>,
}

impl MemoryStore {
    /// Create an empty, uninitialized store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryStore for MemoryStore {
    fn administrator(&self) -> Result<Option<Participant>, VouchError> {
        Ok(self.administrator.clone())
    }

    fn item(&self, id: ItemId) -> Result<Option<Item>, VouchError> {
        Ok(self.items.get(&id).cloned())
    }

    fn appraisal(&self, who: &Participant, id: ItemId) -> Result<Option<Vote>, VouchError> {
        Ok(self.appraisals.get(&(who.clone(), id)).copied())
    }

    fn reputation(&self, who: &Participant) -> Result<Option<i64>, VouchError> {
        Ok(self.reputations.get(who).copied())
    }

    fn topics(&self) -> Result<Vec<String>, VouchError> {
        Ok(self.topics.clone())
    }

    fn submission_count(&self) -> Result<u64, VouchError> {
        Ok(self.submission_count)
    }

    fn submission_charge(&self) -> Result<u64, VouchError> {
        Ok(self.submission_charge)
    }

    fn event_count(&self) -> Result<u64, VouchError> {
        Ok(self.events.len() as u64)
    }

    fn events(&self, from: u64, limit: usize) -> Result<Vec<EventRecord>, VouchError> {
        let skip = usize::try_from(from.saturating_sub(1)).unwrap_or(usize::MAX);
        Ok(self
            .events
            .iter()
            .skip(skip)
            .take(limit.min(MAX_EVENT_PAGE))
            .cloned()
            .collect())
    }

    fn items(&self) -> Result<Vec<Item>, VouchError> {
        Ok(self.items.values().cloned().collect())
    }

    fn appraisals(&self) -> Result<Vec<(Participant, ItemId, Vote)>, VouchError> {
        Ok(self
            .appraisals
            .iter()
            .map(|((who, id), vote)| (who.clone(), *id, *vote))
            .collect())
    }

    fn reputations(&self) -> Result<Vec<(Participant, i64)>, VouchError> {
        Ok(self
            .reputations
            .iter()
            .map(|(who, value)| (who.clone(), *value))
            .collect())
    }

    fn live_items(&self) -> Result<u64, VouchError> {
        u64::try_from(self.items.len()).map_err(|_| VouchError::Overflow)
    }

    fn commit(&mut self, changes: ChangeSet) -> Result<(), VouchError> {
        // In-memory application cannot fail part-way.
        if let Some(admin) = changes.administrator {
            self.administrator = Some(admin);
        }
        for (id, item) in changes.items {
            match item {
                Some(item) => {
                    self.items.insert(id, item);
                }
                None => {
                    self.items.remove(&id);
                }
            }
        }
        self.appraisals.extend(changes.appraisals);
        self.reputations.extend(changes.reputations);
        self.topics.extend(changes.appended_topics);
        if let Some(count) = changes.submission_count {
            self.submission_count = count;
        }
        if let Some(charge) = changes.submission_charge {
            self.submission_charge = charge;
        }
        self.events.extend(changes.events);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RegistryEvent;

    fn item(id: u64, owner: &str) -> Item {
        Item::new(
            ItemId(id),
            Participant::new(owner),
            "headline",
            "https://example.org",
            "science",
            1,
        )
    }

    #[test]
    fn commit_applies_every_table() {
        let mut store = MemoryStore::new();
        let alice = Participant::new("alice");

        let mut changes = ChangeSet::new();
        changes.administrator = Some(alice.clone());
        changes.items.insert(ItemId(1), Some(item(1, "alice")));
        changes.appraisals.insert((alice.clone(), ItemId(1)), Vote::Up);
        changes.reputations.insert(alice.clone(), 1);
        changes.appended_topics.push("science".to_string());
        changes.submission_count = Some(1);
        changes.submission_charge = Some(25);
        store.commit(changes).expect("commit");

        assert_eq!(store.administrator().expect("admin"), Some(alice.clone()));
        assert!(store.item(ItemId(1)).expect("item").is_some());
        assert_eq!(store.appraisal(&alice, ItemId(1)).expect("vote"), Some(Vote::Up));
        assert_eq!(store.reputation(&alice).expect("rep"), Some(1));
        assert_eq!(store.topics().expect("topics"), vec!["science".to_string()]);
        assert_eq!(store.submission_count().expect("count"), 1);
        assert_eq!(store.submission_charge().expect("charge"), 25);
    }

    #[test]
    fn deletion_keeps_appraisals() {
        let mut store = MemoryStore::new();
        let bob = Participant::new("bob");

        let mut changes = ChangeSet::new();
        changes.items.insert(ItemId(1), Some(item(1, "alice")));
        changes.appraisals.insert((bob.clone(), ItemId(1)), Vote::Down);
        store.commit(changes).expect("commit");

        let mut removal = ChangeSet::new();
        removal.items.insert(ItemId(1), None);
        store.commit(removal).expect("commit");

        assert_eq!(store.item(ItemId(1)).expect("item"), None);
        assert_eq!(store.live_items().expect("live"), 0);
        assert_eq!(store.appraisal(&bob, ItemId(1)).expect("vote"), Some(Vote::Down));
    }

    #[test]
    fn events_page_from_sequence() {
        let mut store = MemoryStore::new();
        let mut changes = ChangeSet::new();
        for sequence in 1..=5 {
            changes.events.push(EventRecord {
                sequence,
                height: sequence,
                event: RegistryEvent::ItemRemoved {
                    item: ItemId(sequence),
                },
            });
        }
        store.commit(changes).expect("commit");

        let page = store.events(3, 2).expect("events");
        let sequences: Vec<u64> = page.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![3, 4]);
        assert!(store.events(6, 10).expect("events").is_empty());
        assert_eq!(store.events(0, 10).expect("events").len(), 5);
    }
}
