//! # vouch-core
//!
//! The deterministic registry engine for Vouch - THE LOGIC.
//!
//! Participants submit items (headline, hyperlink, topic) for a fee,
//! appraise them with +1/-1 votes, tip their originators, and flag them.
//! An administrator tunes the fee, curates the topic catalog and removes
//! items.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Is the ONLY place where registry state is mutated
//! - Applies every operation atomically (all writes plus at most one
//!   value transfer, or nothing)
//! - Is deterministic: `BTreeMap` only, no floats, checked integer arithmetic
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod changeset;
pub mod engine;
pub mod formats;
pub mod ledger;
pub mod primitives;
pub mod query;
pub mod session;
pub mod storage;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    CallContext, EventRecord, Item, ItemId, Participant, RegistryEvent, Vote, VouchError,
};

// =============================================================================
// RE-EXPORTS: Registry Engine
// =============================================================================

pub use changeset::{ChangeSet, Transaction};
pub use engine::{Genesis, Registry};
pub use ledger::{Balances, ValueTransfer};
pub use query::top_items;
pub use session::{Session, StorageBackend};
pub use storage::RedbStore;
pub use store::{MemoryStore, RegistryStore};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{RegistrySnapshot, snapshot_checksum, snapshot_from_bytes, snapshot_to_bytes};
