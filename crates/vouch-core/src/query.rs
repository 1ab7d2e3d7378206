//! # Query Engine
//!
//! Read-only views over a registry store.

use crate::primitives::TOP_ITEMS_WINDOW;
use crate::store::RegistryStore;
use crate::{Item, ItemId, VouchError};

/// Items among the first `min(limit, total, TOP_ITEMS_WINDOW)` identifiers
/// whose score is non-negative, in ascending identifier order.
///
/// Results are not ranked by score. Removed identifiers are skipped.
pub fn top_items<S: RegistryStore + ?Sized>(store: &S, limit: u64) -> Result<Vec<Item>, VouchError> {
    let bound = limit
        .min(store.submission_count()?)
        .min(TOP_ITEMS_WINDOW);

    let mut result = Vec::new();
    for raw in 1..=bound {
        if let Some(item) = store.item(ItemId(raw))? {
            if item.score >= 0 {
                result.push(item);
            }
        }
    }
    Ok(result)
}
