//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Mutating handlers take the write lock, advance the logical clock and
//! run exactly one registry operation. Read handlers share the read lock.

use super::{
    AppState,
    types::{
        AppraisalResponse, AppraiseRequest, BalanceResponse, ChargeRequest, ChargeResponse,
        DEFAULT_EVENT_LIMIT, DEFAULT_TOP_LIMIT, EventJson, EventsQuery, EventsResponse,
        ExportResponse, HealthResponse, ItemResponse, MAX_CALLER_LENGTH, MutationResponse,
        ReputationResponse, RewardRequest, StatusResponse, SubmitRequest, TopQuery, TopResponse,
        TopicRequest, TopicsResponse,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use vouch_core::{
    CallContext, ItemId, Participant, Session, VouchError,
    formats::{compute_blake3_hash, snapshot_checksum, snapshot_to_bytes},
    primitives::{MAX_EVENT_PAGE, MAX_TOPICS},
};

/// Header carrying the authenticated caller identity.
pub const CALLER_HEADER: &str = "x-vouch-caller";

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// HTTP status for a registry error.
pub fn error_status(error: &VouchError) -> StatusCode {
    match error {
        VouchError::Unauthorized => StatusCode::FORBIDDEN,
        VouchError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        VouchError::Conflict(_) => StatusCode::CONFLICT,
        VouchError::NotFound(_) => StatusCode::NOT_FOUND,
        VouchError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        VouchError::Overflow | VouchError::SelfReferenceForbidden => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        VouchError::SerializationError(_) | VouchError::IoError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Read the caller identity from the request headers.
fn caller_from_headers(headers: &HeaderMap) -> Result<Participant, String> {
    let raw = headers
        .get(CALLER_HEADER)
        .ok_or_else(|| "Missing X-Vouch-Caller header".to_string())?
        .to_str()
        .map_err(|_| "X-Vouch-Caller header is not valid text".to_string())?
        .trim();

    if raw.is_empty() {
        return Err("X-Vouch-Caller header is empty".to_string());
    }
    if raw.len() > MAX_CALLER_LENGTH {
        return Err(format!(
            "X-Vouch-Caller length {} exceeds maximum {} bytes",
            raw.len(),
            MAX_CALLER_LENGTH
        ));
    }
    Ok(Participant::new(raw))
}

/// Run one mutating operation at the next logical height.
async fn mutate<F>(
    state: &AppState,
    headers: &HeaderMap,
    operation: F,
) -> (StatusCode, Json<MutationResponse>)
where
    F: FnOnce(&mut Session, &CallContext) -> Result<Option<ItemId>, VouchError>,
{
    let caller = match caller_from_headers(headers) {
        Ok(caller) => caller,
        Err(msg) => {
            return (StatusCode::UNAUTHORIZED, Json(MutationResponse::error(msg)));
        }
    };

    let mut session = state.session.write().await;
    let height = state.tick();
    let ctx = CallContext::new(caller, height);

    match operation(&mut *session, &ctx) {
        Ok(item) => (
            StatusCode::OK,
            Json(MutationResponse::success(item.map(ItemId::value), height)),
        ),
        Err(e) => {
            tracing::debug!(caller = %ctx.caller, height, error = %e, "operation rejected");
            (error_status(&e), Json(MutationResponse::error(e.to_string())))
        }
    }
}

// =============================================================================
// HEALTH / STATUS
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Get registry status.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;

    let status = (|| -> Result<StatusResponse, VouchError> {
        Ok(StatusResponse {
            administrator: session.administrator().as_str().to_string(),
            total_items: session.get_total()?,
            live_items: session.live_items()?,
            submission_charge: session.charge()?,
            topic_count: session.topics()?.len(),
            event_count: session.event_count()?,
            last_height: session.last_height()?,
            persistent: session.is_persistent(),
        })
    })();

    match status {
        Ok(response) => (StatusCode::OK, Json(serde_json::json!(response))),
        Err(e) => (
            error_status(&e),
            Json(serde_json::json!({ "success": false, "error": e.to_string() })),
        ),
    }
}

// =============================================================================
// ITEM MUTATIONS
// =============================================================================

/// Submit a new item.
pub async fn submit_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SubmitRequest>,
) -> impl IntoResponse {
    mutate(&state, &headers, |session, ctx| {
        session
            .submit(ctx, &request.headline, &request.hyperlink, &request.topic)
            .map(Some)
    })
    .await
}

/// Cast or replace an appraisal.
pub async fn appraise_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(request): Json<AppraiseRequest>,
) -> impl IntoResponse {
    mutate(&state, &headers, |session, ctx| {
        session.appraise(ctx, ItemId(id), request.value).map(|()| None)
    })
    .await
}

/// Tip the originator of an item.
pub async fn reward_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(request): Json<RewardRequest>,
) -> impl IntoResponse {
    mutate(&state, &headers, |session, ctx| {
        session.reward(ctx, ItemId(id), request.amount).map(|()| None)
    })
    .await
}

/// Flag an item.
pub async fn flag_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    mutate(&state, &headers, |session, ctx| {
        session.flag(ctx, ItemId(id)).map(|()| None)
    })
    .await
}

/// Remove an item (administrator only).
pub async fn remove_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    mutate(&state, &headers, |session, ctx| {
        session.remove_item(ctx, ItemId(id)).map(|()| None)
    })
    .await
}

// =============================================================================
// ADMINISTRATION
// =============================================================================

/// Append a topic (administrator only).
pub async fn add_topic_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TopicRequest>,
) -> impl IntoResponse {
    mutate(&state, &headers, |session, ctx| {
        session.add_topic(ctx, &request.label).map(|()| None)
    })
    .await
}

/// Change the submission charge (administrator only).
pub async fn set_charge_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChargeRequest>,
) -> impl IntoResponse {
    mutate(&state, &headers, |session, ctx| {
        session.set_charge(ctx, request.charge).map(|()| None)
    })
    .await
}

// =============================================================================
// QUERIES
// =============================================================================

/// Lookup an item.
pub async fn get_item_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    let session = state.session.read().await;
    match session.get_item(ItemId(id)) {
        Ok(item) => (StatusCode::OK, Json(ItemResponse::found(item.as_ref()))),
        Err(e) => (error_status(&e), Json(ItemResponse::error(e.to_string()))),
    }
}

/// Lookup one participant's appraisal of an item.
pub async fn get_appraisal_handler(
    State(state): State<AppState>,
    Path((id, participant)): Path<(u64, String)>,
) -> impl IntoResponse {
    let session = state.session.read().await;
    let who = Participant::new(participant.as_str());
    match session.get_appraisal(&who, ItemId(id)) {
        Ok(vote) => (
            StatusCode::OK,
            Json(AppraisalResponse {
                success: true,
                participant,
                item_id: id,
                vote: vote.map(|v| v.value()),
                error: None,
            }),
        ),
        Err(e) => (
            error_status(&e),
            Json(AppraisalResponse {
                success: false,
                participant,
                item_id: id,
                vote: None,
                error: Some(e.to_string()),
            }),
        ),
    }
}

/// Reputation of a participant (0 if they never voted).
pub async fn reputation_handler(
    State(state): State<AppState>,
    Path(participant): Path<String>,
) -> impl IntoResponse {
    let session = state.session.read().await;
    let who = Participant::new(participant.as_str());
    match session.get_reputation(&who) {
        Ok(reputation) => (
            StatusCode::OK,
            Json(ReputationResponse {
                success: true,
                participant,
                reputation,
                error: None,
            }),
        ),
        Err(e) => (
            error_status(&e),
            Json(ReputationResponse {
                success: false,
                participant,
                reputation: 0,
                error: Some(e.to_string()),
            }),
        ),
    }
}

/// Non-negative items among the first ten identifiers, ascending.
pub async fn top_handler(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> impl IntoResponse {
    let session = state.session.read().await;
    match session.get_top(query.limit.unwrap_or(DEFAULT_TOP_LIMIT)) {
        Ok(items) => (StatusCode::OK, Json(TopResponse::success(&items))),
        Err(e) => (error_status(&e), Json(TopResponse::error(e.to_string()))),
    }
}

/// Current topic catalog.
pub async fn topics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    match session.topics() {
        Ok(topics) => (
            StatusCode::OK,
            Json(TopicsResponse {
                success: true,
                topics,
                capacity: MAX_TOPICS,
                error: None,
            }),
        ),
        Err(e) => (
            error_status(&e),
            Json(TopicsResponse {
                success: false,
                topics: vec![],
                capacity: MAX_TOPICS,
                error: Some(e.to_string()),
            }),
        ),
    }
}

/// Current submission charge.
pub async fn charge_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    match session.charge() {
        Ok(charge) => (
            StatusCode::OK,
            Json(ChargeResponse {
                success: true,
                charge,
                error: None,
            }),
        ),
        Err(e) => (
            error_status(&e),
            Json(ChargeResponse {
                success: false,
                charge: 0,
                error: Some(e.to_string()),
            }),
        ),
    }
}

/// Page through the event journal.
pub async fn events_handler(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let from = query.from.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .min(MAX_EVENT_PAGE);

    let session = state.session.read().await;
    let records = match session.events(from, limit) {
        Ok(records) => records,
        Err(e) => return (error_status(&e), Json(EventsResponse::error(e.to_string()))),
    };

    let mut events = Vec::with_capacity(records.len());
    for record in &records {
        match EventJson::from_record(record) {
            Ok(event) => events.push(event),
            Err(e) => return (error_status(&e), Json(EventsResponse::error(e.to_string()))),
        }
    }
    let next = records
        .last()
        .map(|r| r.sequence.saturating_add(1))
        .unwrap_or(from);

    (
        StatusCode::OK,
        Json(EventsResponse {
            success: true,
            events,
            next,
            error: None,
        }),
    )
}

/// Native balance of a participant.
pub async fn balance_handler(
    State(state): State<AppState>,
    Path(participant): Path<String>,
) -> impl IntoResponse {
    let session = state.session.read().await;
    let balance = session.balance(&Participant::new(participant.as_str()));
    Json(BalanceResponse {
        participant,
        balance,
    })
}

// =============================================================================
// EXPORT HANDLER
// =============================================================================

/// Export the registry as a base64 snapshot.
pub async fn export_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;

    let bytes = match session.snapshot().and_then(|s| snapshot_to_bytes(&s)) {
        Ok(bytes) => bytes,
        Err(e) => {
            return (
                error_status(&e),
                Json(ExportResponse::error(format!("Export failed: {}", e))),
            );
        }
    };

    let checksum = snapshot_checksum(&bytes);
    let hash = compute_blake3_hash(&bytes);
    (
        StatusCode::OK,
        Json(ExportResponse::success(&bytes, checksum, hash)),
    )
}
