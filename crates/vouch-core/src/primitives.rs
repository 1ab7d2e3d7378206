//! # Registry Primitives
//!
//! Hardcoded limits and genesis defaults for the Vouch CORE.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! Only the submission charge and the topic catalog change after genesis,
//! and only through administrative operations.

/// Maximum headline length in bytes.
pub const MAX_HEADLINE_LENGTH: usize = 100;

/// Minimum hyperlink length in bytes.
pub const MIN_HYPERLINK_LENGTH: usize = 10;

/// Maximum hyperlink length in bytes.
pub const MAX_HYPERLINK_LENGTH: usize = 200;

/// Maximum topic label length in bytes.
pub const MAX_TOPIC_LENGTH: usize = 20;

/// Capacity of the topic catalog. The catalog never shrinks.
pub const MAX_TOPICS: usize = 10;

/// Labels seeded into the catalog at genesis, in catalog order.
pub const DEFAULT_TOPICS: [&str; 5] = ["technology", "science", "finance", "culture", "politics"];

/// Submission charge at genesis.
pub const DEFAULT_SUBMISSION_CHARGE: u64 = 1_000;

/// Upper bound of the top-items window.
///
/// `top_items` never inspects more than this many identifiers,
/// whatever limit the caller asks for.
pub const TOP_ITEMS_WINDOW: u64 = 10;

/// Maximum number of events returned by one journal read.
pub const MAX_EVENT_PAGE: usize = 1000;

/// Magic bytes for the Vouch snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"VOCH";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fit_catalog_limits() {
        assert!(DEFAULT_TOPICS.len() <= MAX_TOPICS);
        for topic in DEFAULT_TOPICS {
            assert!(!topic.is_empty());
            assert!(topic.len() <= MAX_TOPIC_LENGTH);
        }
    }

    #[test]
    fn hyperlink_bounds_are_ordered() {
        assert!(MIN_HYPERLINK_LENGTH < MAX_HYPERLINK_LENGTH);
    }

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"VOCH");
    }
}
