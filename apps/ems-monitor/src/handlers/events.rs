//! 事件 handlers
//!
//! - GET /api/events/active
//! - POST /api/events/:event_id/ack

use crate::AppState;
use crate::utils::response::{event_to_dto, not_found_error, ok, storage_error};
use crate::utils::{DEFAULT_EVENT_LIMIT, parse_limit};
use api_contract::{AcknowledgeDto, ActiveEventsQuery, LogEventDto};
use axum::{
    extract::{Path, Query, State},
    response::Response,
};

const MAX_EVENT_LIMIT: usize = 1_000;

/// 未确认事件，严重度高者在前，同级按时间倒序。
pub async fn list_active_events(
    State(state): State<AppState>,
    Query(query): Query<ActiveEventsQuery>,
) -> Response {
    let limit = match parse_limit(query.limit, DEFAULT_EVENT_LIMIT, MAX_EVENT_LIMIT) {
        Ok(limit) => limit,
        Err(response) => return response,
    };
    match state.events.list_active_events(limit).await {
        Ok(items) => ok(items.into_iter().map(event_to_dto).collect::<Vec<LogEventDto>>()),
        Err(err) => storage_error(err),
    }
}

pub async fn acknowledge_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Response {
    match state.events.acknowledge_event(&event_id).await {
        Ok(true) => {
            tracing::info!(event_id = %event_id, "event acknowledged");
            ok(AcknowledgeDto {
                event_id,
                acknowledged: true,
            })
        }
        Ok(false) => not_found_error("event not found or already acknowledged"),
        Err(err) => storage_error(err),
    }
}
