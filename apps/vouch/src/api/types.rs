//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use serde::{Deserialize, Serialize};
use vouch_core::{EventRecord, Item, VouchError};

/// Maximum accepted length of the `X-Vouch-Caller` header value in bytes.
pub const MAX_CALLER_LENGTH: usize = 128;

/// Default `limit` for `GET /top`.
pub const DEFAULT_TOP_LIMIT: u64 = 10;

/// Default `limit` for `GET /events`.
pub const DEFAULT_EVENT_LIMIT: usize = 100;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Registry status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub administrator: String,
    pub total_items: u64,
    pub live_items: u64,
    pub submission_charge: u64,
    pub topic_count: usize,
    pub event_count: u64,
    pub last_height: u64,
    pub persistent: bool,
}

// =============================================================================
// REQUESTS
// =============================================================================

/// `POST /items`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub headline: String,
    pub hyperlink: String,
    pub topic: String,
}

/// `POST /items/{id}/appraisals`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppraiseRequest {
    /// `1` or `-1`.
    pub value: i64,
}

/// `POST /items/{id}/rewards`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardRequest {
    pub amount: u64,
}

/// `POST /topics`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRequest {
    pub label: String,
}

/// `PUT /charge`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub charge: u64,
}

/// Query string of `GET /top`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopQuery {
    pub limit: Option<u64>,
}

/// Query string of `GET /events`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventsQuery {
    pub from: Option<u64>,
    pub limit: Option<usize>,
}

// =============================================================================
// MUTATION RESPONSE
// =============================================================================

/// Result of any mutating request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResponse {
    pub success: bool,
    /// Identifier of the new item (submissions only).
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub item_id: Option<u64>,
    /// Logical height the request executed at.
    pub height: Option<u64>,
    pub error: Option<String>,
}

impl MutationResponse {
    pub fn success(item_id: Option<u64>, height: u64) -> Self {
        Self {
            success: true,
            item_id,
            height: Some(height),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            item_id: None,
            height: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// ITEM RESPONSES
// =============================================================================

/// Item JSON representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemJson {
    pub id: u64,
    pub originator: String,
    pub headline: String,
    pub hyperlink: String,
    pub topic: String,
    pub created_at: u64,
    pub score: i64,
    pub tips: u64,
    pub flags: u64,
}

impl From<&Item> for ItemJson {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.value(),
            originator: item.originator.as_str().to_string(),
            headline: item.headline.clone(),
            hyperlink: item.hyperlink.clone(),
            topic: item.topic.clone(),
            created_at: item.created_at,
            score: item.score,
            tips: item.tips,
            flags: item.flags,
        }
    }
}

/// `GET /items/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemResponse {
    pub success: bool,
    pub found: bool,
    pub item: Option<ItemJson>,
    pub error: Option<String>,
}

impl ItemResponse {
    pub fn found(item: Option<&Item>) -> Self {
        Self {
            success: true,
            found: item.is_some(),
            item: item.map(ItemJson::from),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            found: false,
            item: None,
            error: Some(msg.into()),
        }
    }
}

/// `GET /top`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopResponse {
    pub success: bool,
    pub items: Vec<ItemJson>,
    pub error: Option<String>,
}

impl TopResponse {
    pub fn success(items: &[Item]) -> Self {
        Self {
            success: true,
            items: items.iter().map(ItemJson::from).collect(),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            items: vec![],
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// PARTICIPANT RESPONSES
// =============================================================================

/// `GET /items/{id}/appraisals/{participant}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppraisalResponse {
    pub success: bool,
    pub participant: String,
    pub item_id: u64,
    /// `None` if the participant never appraised the item.
    pub vote: Option<i64>,
    pub error: Option<String>,
}

/// `GET /reputation/{participant}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationResponse {
    pub success: bool,
    pub participant: String,
    pub reputation: i64,
    pub error: Option<String>,
}

/// `GET /balances/{participant}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub participant: String,
    pub balance: u64,
}

// =============================================================================
// CATALOG AND CHARGE
// =============================================================================

/// `GET /topics`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicsResponse {
    pub success: bool,
    pub topics: Vec<String>,
    pub capacity: usize,
    pub error: Option<String>,
}

/// `GET /charge`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeResponse {
    pub success: bool,
    pub charge: u64,
    pub error: Option<String>,
}

// =============================================================================
// EVENTS
// =============================================================================

/// Event JSON representation: `kind` plus the variant's fields in `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventJson {
    pub sequence: u64,
    pub height: u64,
    pub kind: String,
    pub data: serde_json::Value,
}

impl EventJson {
    pub fn from_record(record: &EventRecord) -> Result<Self, VouchError> {
        let tagged = serde_json::to_value(&record.event)
            .map_err(|e| VouchError::SerializationError(e.to_string()))?;
        let kind = record.event.kind();
        let data = match tagged {
            serde_json::Value::Object(mut map) => {
                map.remove(kind).unwrap_or(serde_json::Value::Null)
            }
            other => other,
        };
        Ok(Self {
            sequence: record.sequence,
            height: record.height,
            kind: kind.to_string(),
            data,
        })
    }
}

/// `GET /events`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsResponse {
    pub success: bool,
    pub events: Vec<EventJson>,
    /// Sequence to pass as `from` for the next page.
    pub next: u64,
    pub error: Option<String>,
}

impl EventsResponse {
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            events: vec![],
            next: 0,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// EXPORT RESPONSE
// =============================================================================

/// Export response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    pub data: Option<String>, // Base64 encoded
    pub checksum: Option<u64>,
    /// BLAKE3 hex digest of the snapshot bytes.
    pub hash: Option<String>,
    pub error: Option<String>,
}

impl ExportResponse {
    pub fn success(data: &[u8], checksum: u64, hash: String) -> Self {
        Self {
            success: true,
            data: Some(base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                data,
            )),
            checksum: Some(checksum),
            hash: Some(hash),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            checksum: None,
            hash: None,
            error: Some(msg.into()),
        }
    }
}
