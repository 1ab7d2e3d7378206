//! # redb-backed Registry Storage
//!
//! A disk-backed registry store using the redb embedded database.
//!
//! Each `commit` is one redb write transaction, so a `ChangeSet` either
//! lands completely or not at all, including across a crash.
//!
//! Items and events are stored as postcard bytes; everything else is
//! stored in native redb key/value types.

use crate::changeset::ChangeSet;
use crate::primitives::MAX_EVENT_PAGE;
use crate::store::RegistryStore;
use crate::{EventRecord, Item, ItemId, Participant, VouchError, Vote};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for items: ItemId(u64) -> serialized Item bytes
const ITEMS: TableDefinition<u64, &[u8]> = TableDefinition::new("items");

/// Table for appraisals: (participant, item id) -> +1 / -1
const APPRAISALS: TableDefinition<(&str, u64), i64> = TableDefinition::new("appraisals");

/// Table for reputations: participant -> cumulative value
const REPUTATIONS: TableDefinition<&str, i64> = TableDefinition::new("reputations");

/// Table for the topic catalog: position -> label
const TOPICS: TableDefinition<u64, &str> = TableDefinition::new("topics");

/// Table for scalar counters: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

/// Table for string settings: key string -> value string
const SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings");

/// Table for the event journal: sequence -> serialized EventRecord bytes
const EVENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("events");

const SUBMISSION_COUNT: &str = "submission_count";
const SUBMISSION_CHARGE: &str = "submission_charge";
const EVENT_COUNT: &str = "event_count";
const ADMINISTRATOR: &str = "administrator";

fn io_err(e: impl std::fmt::Display) -> VouchError {
    VouchError::IoError(e.to_string())
}

fn ser_err(e: impl std::fmt::Display) -> VouchError {
    VouchError::SerializationError(e.to_string())
}

/// A disk-backed registry store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a registry database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VouchError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(ITEMS).map_err(io_err)?;
            let _ = write_txn.open_table(APPRAISALS).map_err(io_err)?;
            let _ = write_txn.open_table(REPUTATIONS).map_err(io_err)?;
            let _ = write_txn.open_table(TOPICS).map_err(io_err)?;
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
            let _ = write_txn.open_table(SETTINGS).map_err(io_err)?;
            let _ = write_txn.open_table(EVENTS).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    fn metadata(&self, key: &str) -> Result<u64, VouchError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(METADATA).map_err(io_err)?;
        Ok(table
            .get(key)
            .map_err(io_err)?
            .map(|v| v.value())
            .unwrap_or(0))
    }
}

impl RegistryStore for RedbStore {
    fn administrator(&self) -> Result<Option<Participant>, VouchError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(SETTINGS).map_err(io_err)?;
        Ok(table
            .get(ADMINISTRATOR)
            .map_err(io_err)?
            .map(|v| Participant::new(v.value())))
    }

    fn item(&self, id: ItemId) -> Result<Option<Item>, VouchError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ITEMS).map_err(io_err)?;

        match table.get(id.0).map_err(io_err)? {
            Some(data) => {
                let item: Item = postcard::from_bytes(data.value()).map_err(ser_err)?;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    fn appraisal(&self, who: &Participant, id: ItemId) -> Result<Option<Vote>, VouchError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(APPRAISALS).map_err(io_err)?;
        table
            .get((who.as_str(), id.0))
            .map_err(io_err)?
            .map(|v| Vote::try_from(v.value()))
            .transpose()
    }

    fn reputation(&self, who: &Participant) -> Result<Option<i64>, VouchError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(REPUTATIONS).map_err(io_err)?;
        Ok(table.get(who.as_str()).map_err(io_err)?.map(|v| v.value()))
    }

    fn topics(&self) -> Result<Vec<String>, VouchError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(TOPICS).map_err(io_err)?;

        let mut topics = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, label) = entry.map_err(io_err)?;
            topics.push(label.value().to_string());
        }
        Ok(topics)
    }

    fn submission_count(&self) -> Result<u64, VouchError> {
        self.metadata(SUBMISSION_COUNT)
    }

    fn submission_charge(&self) -> Result<u64, VouchError> {
        self.metadata(SUBMISSION_CHARGE)
    }

    fn event_count(&self) -> Result<u64, VouchError> {
        self.metadata(EVENT_COUNT)
    }

    fn events(&self, from: u64, limit: usize) -> Result<Vec<EventRecord>, VouchError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(EVENTS).map_err(io_err)?;

        let mut events = Vec::new();
        for entry in table
            .range(from.max(1)..)
            .map_err(io_err)?
            .take(limit.min(MAX_EVENT_PAGE))
        {
            let (_, data) = entry.map_err(io_err)?;
            let record: EventRecord = postcard::from_bytes(data.value()).map_err(ser_err)?;
            events.push(record);
        }
        Ok(events)
    }

    fn items(&self) -> Result<Vec<Item>, VouchError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ITEMS).map_err(io_err)?;

        let mut items = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, data) = entry.map_err(io_err)?;
            let item: Item = postcard::from_bytes(data.value()).map_err(ser_err)?;
            items.push(item);
        }
        Ok(items)
    }

    fn appraisals(&self) -> Result<Vec<(Participant, ItemId, Vote)>, VouchError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(APPRAISALS).map_err(io_err)?;

        let mut appraisals = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (key, value) = entry.map_err(io_err)?;
            let (who, id) = key.value();
            appraisals.push((Participant::new(who), ItemId(id), Vote::try_from(value.value())?));
        }
        Ok(appraisals)
    }

    fn reputations(&self) -> Result<Vec<(Participant, i64)>, VouchError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(REPUTATIONS).map_err(io_err)?;

        let mut reputations = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (key, value) = entry.map_err(io_err)?;
            reputations.push((Participant::new(key.value()), value.value()));
        }
        Ok(reputations)
    }

    fn live_items(&self) -> Result<u64, VouchError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ITEMS).map_err(io_err)?;
        table.len().map_err(io_err)
    }

    fn commit(&mut self, changes: ChangeSet) -> Result<(), VouchError> {
        // Serialize everything before the write transaction opens.
        let mut item_writes = Vec::with_capacity(changes.items.len());
        for (id, item) in &changes.items {
            let bytes = item
                .as_ref()
                .map(|item| postcard::to_allocvec(item).map_err(ser_err))
                .transpose()?;
            item_writes.push((id.0, bytes));
        }
        let mut event_writes = Vec::with_capacity(changes.events.len());
        for record in &changes.events {
            event_writes.push((record.sequence, postcard::to_allocvec(record).map_err(ser_err)?));
        }

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut items = write_txn.open_table(ITEMS).map_err(io_err)?;
            for (id, bytes) in &item_writes {
                match bytes {
                    Some(bytes) => {
                        items.insert(*id, bytes.as_slice()).map_err(io_err)?;
                    }
                    None => {
                        items.remove(*id).map_err(io_err)?;
                    }
                }
            }

            let mut appraisals = write_txn.open_table(APPRAISALS).map_err(io_err)?;
            for ((who, id), vote) in &changes.appraisals {
                appraisals
                    .insert((who.as_str(), id.0), vote.value())
                    .map_err(io_err)?;
            }

            let mut reputations = write_txn.open_table(REPUTATIONS).map_err(io_err)?;
            for (who, value) in &changes.reputations {
                reputations.insert(who.as_str(), *value).map_err(io_err)?;
            }

            let mut topics = write_txn.open_table(TOPICS).map_err(io_err)?;
            let mut position = topics.len().map_err(io_err)?;
            for label in &changes.appended_topics {
                topics.insert(position, label.as_str()).map_err(io_err)?;
                position = position.checked_add(1).ok_or(VouchError::Overflow)?;
            }

            let mut settings = write_txn.open_table(SETTINGS).map_err(io_err)?;
            if let Some(admin) = &changes.administrator {
                settings.insert(ADMINISTRATOR, admin.as_str()).map_err(io_err)?;
            }

            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;
            if let Some(count) = changes.submission_count {
                meta.insert(SUBMISSION_COUNT, count).map_err(io_err)?;
            }
            if let Some(charge) = changes.submission_charge {
                meta.insert(SUBMISSION_CHARGE, charge).map_err(io_err)?;
            }

            let mut events = write_txn.open_table(EVENTS).map_err(io_err)?;
            let mut last = None;
            for (sequence, bytes) in &event_writes {
                events.insert(*sequence, bytes.as_slice()).map_err(io_err)?;
                last = Some(*sequence);
            }
            if let Some(last) = last {
                meta.insert(EVENT_COUNT, last).map_err(io_err)?;
            }
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }
}
