//! # Core Type Definitions
//!
//! This module contains all core types for the Vouch registry:
//! - Identifiers (`ItemId`, `Participant`)
//! - Stored records (`Item`, `Vote`)
//! - Call metadata supplied by the host (`CallContext`)
//! - Emitted events (`RegistryEvent`, `EventRecord`)
//! - Error types (`VouchError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` where they key a `BTreeMap`
//! - Never wrap silently: counters use checked arithmetic and surface `Overflow`

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a submitted item.
///
/// Issued sequentially from 1 and never reused, even after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Get the raw identifier value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a participant (caller, originator, administrator).
///
/// The core treats identities as opaque principals; the host decides
/// how they are authenticated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Participant(pub String);

impl Participant {
    /// Create a participant from any string-like identity.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// VOTE
// =============================================================================

/// A participant's appraisal of an item.
///
/// The value domain is exactly {+1, -1}. Zero is not representable, so an
/// absent appraisal is unambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum Vote {
    Up,
    Down,
}

impl Vote {
    /// Signed value of the vote.
    #[must_use]
    pub const fn value(self) -> i64 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

impl From<Vote> for i64 {
    fn from(vote: Vote) -> Self {
        vote.value()
    }
}

impl TryFrom<i64> for Vote {
    type Error = VouchError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Up),
            -1 => Ok(Self::Down),
            other => Err(VouchError::InvalidInput(format!(
                "appraisal value must be 1 or -1, got {other}"
            ))),
        }
    }
}

// =============================================================================
// ITEM
// =============================================================================

/// A submitted content reference with its aggregate bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Sequential identifier.
    pub id: ItemId,
    /// Participant who submitted the item and receives tips.
    pub originator: Participant,
    /// Short title.
    pub headline: String,
    /// Link to the referenced content.
    pub hyperlink: String,
    /// Catalog topic at submission time.
    pub topic: String,
    /// Block height at submission.
    pub created_at: u64,
    /// Sum of the latest appraisal of every participant.
    pub score: i64,
    /// Cumulative tips received.
    pub tips: u64,
    /// Number of abuse flags (not deduplicated).
    pub flags: u64,
}

impl Item {
    /// Create a freshly submitted item with zeroed counters.
    #[must_use]
    pub fn new(
        id: ItemId,
        originator: Participant,
        headline: impl Into<String>,
        hyperlink: impl Into<String>,
        topic: impl Into<String>,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            originator,
            headline: headline.into(),
            hyperlink: hyperlink.into(),
            topic: topic.into(),
            created_at,
            score: 0,
            tips: 0,
            flags: 0,
        }
    }
}

// =============================================================================
// CALL CONTEXT
// =============================================================================

/// Identity and clock reading for a single mutating call.
///
/// Supplied by the host environment; the core never reads a wall clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Authenticated caller.
    pub caller: Participant,
    /// Monotonic logical clock (block height).
    pub height: u64,
}

impl CallContext {
    /// Create a new call context.
    #[must_use]
    pub fn new(caller: Participant, height: u64) -> Self {
        Self { caller, height }
    }
}

// =============================================================================
// EVENTS
// =============================================================================

/// Event emitted by a committed mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistryEvent {
    Submission {
        item: ItemId,
        originator: Participant,
    },
    Appraisal {
        item: ItemId,
        participant: Participant,
        vote: Vote,
        previous: Option<Vote>,
    },
    Reward {
        item: ItemId,
        from: Participant,
        to: Participant,
        amount: u64,
    },
    Flag {
        item: ItemId,
        reporter: Participant,
        flags: u64,
    },
    FeeChange {
        previous: u64,
        current: u64,
    },
    ItemRemoved {
        item: ItemId,
    },
    TopicAdded {
        label: String,
    },
}

impl RegistryEvent {
    /// Stable kind label used by indexers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Submission { .. } => "submission",
            Self::Appraisal { .. } => "appraisal",
            Self::Reward { .. } => "reward",
            Self::Flag { .. } => "flag",
            Self::FeeChange { .. } => "fee-change",
            Self::ItemRemoved { .. } => "item-removed",
            Self::TopicAdded { .. } => "topic-added",
        }
    }
}

/// A committed event with its position in the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Commit order, starting at 1.
    pub sequence: u64,
    /// Height of the call that produced the event.
    pub height: u64,
    pub event: RegistryEvent,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Vouch registry.
///
/// - No silent failures
/// - Every precondition violation aborts the whole operation
/// - The CORE should never panic; all errors must be recoverable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VouchError {
    /// A non-administrator called an administrative operation.
    #[error("Unauthorized")]
    Unauthorized,

    /// An argument failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Conflicting state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The referenced item does not exist.
    #[error("Item not found: {0}")]
    NotFound(ItemId),

    /// The caller cannot cover the required amount.
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    /// An identifier or counter would exceed its representable range.
    #[error("Arithmetic overflow")]
    Overflow,

    /// The caller tried to flag their own item.
    #[error("Participants cannot flag their own items")]
    SelfReferenceForbidden,

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_accepts_only_unit_values() {
        assert_eq!(Vote::try_from(1), Ok(Vote::Up));
        assert_eq!(Vote::try_from(-1), Ok(Vote::Down));
        assert!(matches!(Vote::try_from(0), Err(VouchError::InvalidInput(_))));
        assert!(matches!(Vote::try_from(2), Err(VouchError::InvalidInput(_))));
    }

    #[test]
    fn vote_serializes_as_signed_integer() {
        let json = serde_json::to_string(&Vote::Down).expect("serialize");
        assert_eq!(json, "-1");
        let back: Vote = serde_json::from_str("1").expect("deserialize");
        assert_eq!(back, Vote::Up);
        assert!(serde_json::from_str::<Vote>("0").is_err());
    }

    #[test]
    fn new_item_starts_at_zero() {
        let item = Item::new(
            ItemId(1),
            Participant::new("alice"),
            "headline",
            "https://example.org",
            "science",
            7,
        );
        assert_eq!(item.score, 0);
        assert_eq!(item.tips, 0);
        assert_eq!(item.flags, 0);
        assert_eq!(item.created_at, 7);
    }

    #[test]
    fn event_kinds_are_stable() {
        let event = RegistryEvent::FeeChange {
            previous: 1,
            current: 2,
        };
        assert_eq!(event.kind(), "fee-change");
        let event = RegistryEvent::ItemRemoved { item: ItemId(3) };
        assert_eq!(event.kind(), "item-removed");
    }

    #[test]
    fn event_round_trips_through_postcard() {
        let event = RegistryEvent::Appraisal {
            item: ItemId(4),
            participant: Participant::new("bob"),
            vote: Vote::Down,
            previous: Some(Vote::Up),
        };
        let bytes = postcard::to_allocvec(&event).expect("encode");
        let back: RegistryEvent = postcard::from_bytes(&bytes).expect("decode");
        assert_eq!(back, event);
    }
}
