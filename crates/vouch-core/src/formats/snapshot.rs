//! # Snapshot Format
//!
//! Portable, deterministic serialization of a whole registry.
//!
//! Format: Header (13 bytes) + postcard-serialized snapshot.
//! - 4 bytes: Magic ("VOCH")
//! - 1 byte: Version
//! - 8 bytes: FNV-1a checksum of the payload (little endian)
//!
//! Every collection in a snapshot is sorted by key, so two stores holding
//! the same state produce identical bytes regardless of backend.
//! File I/O is left to the app layer.

use crate::changeset::ChangeSet;
use crate::primitives;
use crate::store::RegistryStore;
use crate::{EventRecord, Item, ItemId, Participant, VouchError, Vote};
use serde::{Deserialize, Serialize};

/// Maximum accepted snapshot size.
///
/// Validated before any payload parsing.
pub const MAX_SNAPSHOT_SIZE: usize = 256 * 1024 * 1024; // 256 MB

const HEADER_LEN: usize = 13;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Complete registry state in canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub administrator: Participant,
    pub submission_count: u64,
    pub submission_charge: u64,
    /// Catalog order.
    pub topics: Vec<String>,
    /// Sorted by id.
    pub items: Vec<Item>,
    /// Sorted by (participant, id).
    pub appraisals: Vec<(Participant, ItemId, Vote)>,
    /// Sorted by participant.
    pub reputations: Vec<(Participant, i64)>,
    /// Sorted by sequence.
    pub events: Vec<EventRecord>,
}

impl RegistrySnapshot {
    /// Capture the full state of an initialized store.
    pub fn capture<S: RegistryStore + ?Sized>(store: &S) -> Result<Self, VouchError> {
        let administrator = store.administrator()?.ok_or_else(|| {
            VouchError::InvalidInput("cannot snapshot an uninitialized store".to_string())
        })?;

        let total = store.event_count()?;
        let mut events = Vec::new();
        let mut next = 1u64;
        while next <= total {
            let page = store.events(next, primitives::MAX_EVENT_PAGE)?;
            let Some(last) = page.last() else { break };
            next = last.sequence.checked_add(1).ok_or(VouchError::Overflow)?;
            events.extend(page);
        }

        let mut items = store.items()?;
        items.sort_by_key(|item| item.id);
        let mut appraisals = store.appraisals()?;
        appraisals.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));
        let mut reputations = store.reputations()?;
        reputations.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(Self {
            administrator,
            submission_count: store.submission_count()?,
            submission_charge: store.submission_charge()?,
            topics: store.topics()?,
            items,
            appraisals,
            reputations,
            events,
        })
    }

    /// Convert into one `ChangeSet` that recreates this state in an empty store.
    #[must_use]
    pub fn into_changes(self) -> ChangeSet {
        ChangeSet {
            administrator: Some(self.administrator),
            items: self
                .items
                .into_iter()
                .map(|item| (item.id, Some(item)))
                .collect(),
            appraisals: self
                .appraisals
                .into_iter()
                .map(|(who, id, vote)| ((who, id), vote))
                .collect(),
            reputations: self.reputations.into_iter().collect(),
            appended_topics: self.topics,
            submission_count: Some(self.submission_count),
            submission_charge: Some(self.submission_charge),
            events: self.events,
        }
    }

    /// Load this snapshot into an uninitialized store.
    pub fn restore<S: RegistryStore + ?Sized>(self, store: &mut S) -> Result<(), VouchError> {
        if let Some(existing) = store.administrator()? {
            return Err(VouchError::Conflict(format!(
                "store already initialized by {existing}"
            )));
        }
        store.commit(self.into_changes())
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// FNV-1a 64-bit hash of raw bytes.
#[must_use]
pub fn snapshot_checksum(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Serialize a snapshot to bytes (header + payload).
pub fn snapshot_to_bytes(snapshot: &RegistrySnapshot) -> Result<Vec<u8>, VouchError> {
    let payload = postcard::to_stdvec(snapshot)
        .map_err(|e| VouchError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(primitives::MAGIC_BYTES);
    result.push(primitives::FORMAT_VERSION);
    result.extend_from_slice(&snapshot_checksum(&payload).to_le_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize a snapshot from bytes.
///
/// Size, header and checksum are all validated before the payload is parsed.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<RegistrySnapshot, VouchError> {
    if bytes.len() < HEADER_LEN {
        return Err(VouchError::SerializationError(format!(
            "Data too short: minimum {HEADER_LEN} bytes required"
        )));
    }
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(VouchError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    let (header, payload) = bytes.split_at(HEADER_LEN);
    if &header[0..4] != primitives::MAGIC_BYTES {
        return Err(VouchError::SerializationError(
            "Invalid magic bytes".to_string(),
        ));
    }
    if header[4] != primitives::FORMAT_VERSION {
        return Err(VouchError::SerializationError(format!(
            "Unsupported version: {} (expected {})",
            header[4],
            primitives::FORMAT_VERSION
        )));
    }

    let mut expected = [0u8; 8];
    expected.copy_from_slice(&header[5..13]);
    let expected = u64::from_le_bytes(expected);
    let actual = snapshot_checksum(payload);
    if expected != actual {
        return Err(VouchError::SerializationError(format!(
            "Checksum mismatch: expected {expected:016x}, got {actual:016x}"
        )));
    }

    postcard::from_bytes(payload).map_err(|e| {
        VouchError::SerializationError(format!("Failed to deserialize snapshot: {e}"))
    })
}

/// BLAKE3 hash of raw bytes as a 64-character hex string.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn compute_blake3_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

// =============================================================================
// TESTS
// =============================================================================
