//! # Session Module
//!
//! A registry bound to one of the two storage backends.
//!
//! ## Storage Backends
//!
//! - `InMemory`: `MemoryStore` (fast, volatile unless saved as a snapshot)
//! - `Persistent`: `RedbStore` for disk-backed ACID storage
//!
//! The app layer holds a `Session` so the CLI and the HTTP server do not
//! need to be generic over the store type.

use crate::engine::{Genesis, Registry};
use crate::formats::RegistrySnapshot;
use crate::ledger::Balances;
use crate::storage::RedbStore;
use crate::store::{MemoryStore, RegistryStore};
use crate::{CallContext, EventRecord, Item, ItemId, Participant, VouchError, Vote};
use std::path::Path;

/// Storage backend for a Session.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory registry (fast, volatile).
    InMemory(Registry<MemoryStore, Balances>),
    /// Disk-backed registry using redb (ACID, persistent).
    Persistent(Registry<RedbStore, Balances>),
}

/// Run `$body` with `$reg` bound to the registry of either backend.
macro_rules! with_registry {
    ($self:expr, $reg:ident => $body:expr) => {
        match $self {
            StorageBackend::InMemory($reg) => $body,
            StorageBackend::Persistent($reg) => $body,
        }
    };
}

/// A registry session over either backend.
#[derive(Debug)]
pub struct Session {
    backend: StorageBackend,
}

impl Session {
    /// Create a session with a fresh in-memory store.
    pub fn new(ledger: Balances, genesis: Genesis) -> Result<Self, VouchError> {
        Self::with_store(MemoryStore::new(), ledger, genesis)
    }

    /// Create a session over an existing in-memory store.
    pub fn with_store(
        store: MemoryStore,
        ledger: Balances,
        genesis: Genesis,
    ) -> Result<Self, VouchError> {
        Ok(Self {
            backend: StorageBackend::InMemory(Registry::open(store, ledger, genesis)?),
        })
    }

    /// Create a session with persistent redb storage.
    ///
    /// Opens or creates a redb database at the given path.
    pub fn with_redb(
        path: impl AsRef<Path>,
        ledger: Balances,
        genesis: Genesis,
    ) -> Result<Self, VouchError> {
        let store = RedbStore::open(path)?;
        Ok(Self {
            backend: StorageBackend::Persistent(Registry::open(store, ledger, genesis)?),
        })
    }

    /// Create an in-memory session holding the state of `snapshot`.
    pub fn from_snapshot(
        snapshot: RegistrySnapshot,
        ledger: Balances,
        genesis: Genesis,
    ) -> Result<Self, VouchError> {
        let mut store = MemoryStore::new();
        snapshot.restore(&mut store)?;
        Self::with_store(store, ledger, genesis)
    }

    /// Load `snapshot` into an uninitialized redb database.
    pub fn restore_redb(
        path: impl AsRef<Path>,
        snapshot: RegistrySnapshot,
        ledger: Balances,
        genesis: Genesis,
    ) -> Result<Self, VouchError> {
        let mut store = RedbStore::open(path)?;
        snapshot.restore(&mut store)?;
        Ok(Self {
            backend: StorageBackend::Persistent(Registry::open(store, ledger, genesis)?),
        })
    }

    /// Check if this session uses persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    /// Get a reference to the storage backend.
    #[must_use]
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    pub fn submit(
        &mut self,
        ctx: &CallContext,
        headline: &str,
        hyperlink: &str,
        topic: &str,
    ) -> Result<ItemId, VouchError> {
        with_registry!(&mut self.backend, reg => reg.submit(ctx, headline, hyperlink, topic))
    }

    pub fn appraise(&mut self, ctx: &CallContext, id: ItemId, value: i64) -> Result<(), VouchError> {
        with_registry!(&mut self.backend, reg => reg.appraise(ctx, id, value))
    }

    pub fn reward(&mut self, ctx: &CallContext, id: ItemId, amount: u64) -> Result<(), VouchError> {
        with_registry!(&mut self.backend, reg => reg.reward(ctx, id, amount))
    }

    pub fn flag(&mut self, ctx: &CallContext, id: ItemId) -> Result<(), VouchError> {
        with_registry!(&mut self.backend, reg => reg.flag(ctx, id))
    }

    pub fn set_charge(&mut self, ctx: &CallContext, charge: u64) -> Result<(), VouchError> {
        with_registry!(&mut self.backend, reg => reg.set_charge(ctx, charge))
    }

    pub fn remove_item(&mut self, ctx: &CallContext, id: ItemId) -> Result<(), VouchError> {
        with_registry!(&mut self.backend, reg => reg.remove_item(ctx, id))
    }

    pub fn add_topic(&mut self, ctx: &CallContext, label: &str) -> Result<(), VouchError> {
        with_registry!(&mut self.backend, reg => reg.add_topic(ctx, label))
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn get_item(&self, id: ItemId) -> Result<Option<Item>, VouchError> {
        with_registry!(&self.backend, reg => reg.get_item(id))
    }

    pub fn get_appraisal(&self, who: &Participant, id: ItemId) -> Result<Option<Vote>, VouchError> {
        with_registry!(&self.backend, reg => reg.get_appraisal(who, id))
    }

    pub fn get_reputation(&self, who: &Participant) -> Result<i64, VouchError> {
        with_registry!(&self.backend, reg => reg.get_reputation(who))
    }

    pub fn get_total(&self) -> Result<u64, VouchError> {
        with_registry!(&self.backend, reg => reg.get_total())
    }

    pub fn get_top(&self, limit: u64) -> Result<Vec<Item>, VouchError> {
        with_registry!(&self.backend, reg => reg.get_top(limit))
    }

    pub fn topics(&self) -> Result<Vec<String>, VouchError> {
        with_registry!(&self.backend, reg => reg.topics())
    }

    pub fn charge(&self) -> Result<u64, VouchError> {
        with_registry!(&self.backend, reg => reg.charge())
    }

    pub fn events(&self, from: u64, limit: usize) -> Result<Vec<EventRecord>, VouchError> {
        with_registry!(&self.backend, reg => reg.events(from, limit))
    }

    /// Number of journaled events.
    pub fn event_count(&self) -> Result<u64, VouchError> {
        with_registry!(&self.backend, reg => reg.store().event_count())
    }

    /// Number of items still present.
    pub fn live_items(&self) -> Result<u64, VouchError> {
        with_registry!(&self.backend, reg => reg.store().live_items())
    }

    pub fn last_height(&self) -> Result<u64, VouchError> {
        with_registry!(&self.backend, reg => reg.last_height())
    }

    pub fn balance(&self, who: &Participant) -> u64 {
        with_registry!(&self.backend, reg => reg.balance(who))
    }

    pub fn administrator(&self) -> &Participant {
        with_registry!(&self.backend, reg => reg.administrator())
    }

    /// Capture the full registry state from either backend.
    pub fn snapshot(&self) -> Result<RegistrySnapshot, VouchError> {
        with_registry!(&self.backend, reg => RegistrySnapshot::capture(reg.store()))
    }
}
