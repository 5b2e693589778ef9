//! 读数查询 handlers
//!
//! - GET /api/readings
//! - GET /api/readings/latest

use crate::AppState;
use crate::utils::response::{ok, reading_to_dto, storage_error};
use crate::utils::{check_range, normalize_optional, parse_order, parse_reading_limit};
use api_contract::{ReadingDto, ReadingsQuery};
use axum::{
    extract::{Query, State},
    response::Response,
};
use ems_storage::ReadingQuery;

pub async fn list_readings(
    State(state): State<AppState>,
    Query(query): Query<ReadingsQuery>,
) -> Response {
    let equipment_id = match normalize_optional(query.equipment_id, "equipmentId") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let area_id = match normalize_optional(query.area_id, "areaId") {
        Ok(value) => value,
        Err(response) => return response,
    };
    if let Err(response) = check_range(query.from, query.to) {
        return response;
    }
    let limit = match parse_reading_limit(query.limit) {
        Ok(limit) => limit,
        Err(response) => return response,
    };
    let order = match parse_order(query.order.as_deref()) {
        Ok(order) => order,
        Err(response) => return response,
    };

    match state
        .readings
        .query_readings(ReadingQuery {
            from_ms: query.from,
            to_ms: query.to,
            equipment_id,
            area_id,
            limit,
            order,
            ..ReadingQuery::default()
        })
        .await
    {
        Ok(items) => ok(items.into_iter().map(reading_to_dto).collect::<Vec<ReadingDto>>()),
        Err(err) => storage_error(err),
    }
}

/// 每个 (设备, 表计) 的最新一条读数。
pub async fn list_latest_readings(State(state): State<AppState>) -> Response {
    match state.latest.list_latest().await {
        Ok(items) => ok(items.into_iter().map(reading_to_dto).collect::<Vec<ReadingDto>>()),
        Err(err) => storage_error(err),
    }
}
