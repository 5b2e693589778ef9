//! 路由定义
//!
//! - 健康检查：/health
//! - 读数：/api/readings, /api/readings/latest
//! - 事件：/api/events/active, /api/events/:event_id/ack
//! - 统计：/api/stats/equipment, /api/stats/areas
//! - 指标：/api/metrics
//! - 采集控制：/api/collector, /api/collector/start, /api/collector/stop

use crate::AppState;
use crate::handlers::*;
use crate::middleware::request_context;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// /api 前缀下的查询与控制接口。
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/readings", get(list_readings))
        .route("/readings/latest", get(list_latest_readings))
        .route("/events/active", get(list_active_events))
        .route("/events/:event_id/ack", post(acknowledge_event))
        .route("/stats/equipment", get(equipment_stats))
        .route("/stats/areas", get(area_stats))
        .route("/metrics", get(get_metrics))
        .route("/collector", get(get_collector))
        .route("/collector/start", post(start_collector))
        .route("/collector/stop", post(stop_collector))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", create_api_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_context))
}
