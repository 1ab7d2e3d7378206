//! # Staged Writes
//!
//! Copy-on-write staging for a single registry operation.
//!
//! An operation never writes to the store directly. It opens a
//! `Transaction` over the store, reads through it (staged values shadow
//! committed ones), stages its writes, and hands the resulting `ChangeSet`
//! to the engine. The engine commits the `ChangeSet` in one step only after
//! every precondition has passed; dropping it discards the operation.

use crate::store::RegistryStore;
use crate::{EventRecord, Item, ItemId, Participant, RegistryEvent, VouchError, Vote};
use std::collections::BTreeMap;

/// All writes produced by one operation.
///
/// `items` maps to `None` for a deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Set only at genesis.
    pub administrator: Option<Participant>,
    pub items: BTreeMap<ItemId, Option<Item>>,
    pub appraisals: BTreeMap<(Participant, ItemId), Vote>,
    pub reputations: BTreeMap<Participant, i64>,
    /// Labels appended to the end of the catalog, in order.
    pub appended_topics: Vec<String>,
    pub submission_count: Option<u64>,
    pub submission_charge: Option<u64>,
    pub events: Vec<EventRecord>,
}

impl ChangeSet {
    /// Create an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Read-through view of a store with staged writes on top.
pub struct Transaction<'a, S: RegistryStore + ?Sized> {
    store: &'a S,
    changes: ChangeSet,
    height: u64,
}

impl<'a, S: RegistryStore + ?Sized> Transaction<'a, S> {
    /// Open a transaction for a call made at `height`.
    pub fn begin(store: &'a S, height: u64) -> Self {
        Self {
            store,
            changes: ChangeSet::new(),
            height,
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub fn item(&self, id: ItemId) -> Result<Option<Item>, VouchError> {
        match self.changes.items.get(&id) {
            Some(staged) => Ok(staged.clone()),
            None => self.store.item(id),
        }
    }

    pub fn appraisal(&self, who: &Participant, id: ItemId) -> Result<Option<Vote>, VouchError> {
        match self.changes.appraisals.get(&(who.clone(), id)) {
            Some(vote) => Ok(Some(*vote)),
            None => self.store.appraisal(who, id),
        }
    }

    pub fn reputation(&self, who: &Participant) -> Result<i64, VouchError> {
        match self.changes.reputations.get(who) {
            Some(value) => Ok(*value),
            None => Ok(self.store.reputation(who)?.unwrap_or(0)),
        }
    }

    pub fn topics(&self) -> Result<Vec<String>, VouchError> {
        let mut topics = self.store.topics()?;
        topics.extend(self.changes.appended_topics.iter().cloned());
        Ok(topics)
    }

    pub fn submission_count(&self) -> Result<u64, VouchError> {
        match self.changes.submission_count {
            Some(count) => Ok(count),
            None => self.store.submission_count(),
        }
    }

    pub fn submission_charge(&self) -> Result<u64, VouchError> {
        match self.changes.submission_charge {
            Some(charge) => Ok(charge),
            None => self.store.submission_charge(),
        }
    }

    // =========================================================================
    // STAGED WRITES
    // =========================================================================

    pub fn put_item(&mut self, item: Item) {
        self.changes.items.insert(item.id, Some(item));
    }

    pub fn delete_item(&mut self, id: ItemId) {
        self.changes.items.insert(id, None);
    }

    pub fn put_appraisal(&mut self, who: &Participant, id: ItemId, vote: Vote) {
        self.changes.appraisals.insert((who.clone(), id), vote);
    }

    pub fn put_reputation(&mut self, who: &Participant, value: i64) {
        self.changes.reputations.insert(who.clone(), value);
    }

    pub fn append_topic(&mut self, label: impl Into<String>) {
        self.changes.appended_topics.push(label.into());
    }

    pub fn set_submission_count(&mut self, count: u64) {
        self.changes.submission_count = Some(count);
    }

    pub fn set_submission_charge(&mut self, charge: u64) {
        self.changes.submission_charge = Some(charge);
    }

    /// Stage an event after everything already committed or staged.
    pub fn emit(&mut self, event: RegistryEvent) -> Result<(), VouchError> {
        let staged = self.changes.events.len() as u64;
        let sequence = self
            .store
            .event_count()?
            .checked_add(staged)
            .and_then(|n| n.checked_add(1))
            .ok_or(VouchError::Overflow)?;
        self.changes.events.push(EventRecord {
            sequence,
            height: self.height,
            event,
        });
        Ok(())
    }

    /// Finish staging and hand over the writes.
    #[must_use]
    pub fn into_changes(self) -> ChangeSet {
        self.changes
    }
}

// =============================================================================
// TESTS
// =============================================================================
