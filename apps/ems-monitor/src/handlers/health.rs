//! - GET /health

use crate::AppState;
use crate::utils::response::ok;
use api_contract::HealthDto;
use axum::{extract::State, response::Response};

/// 存储不可达时 status 为 degraded，HTTP 仍返回 200。
pub async fn health(State(state): State<AppState>) -> Response {
    let storage = match state.readings.ping().await {
        Ok(()) => "ok".to_string(),
        Err(err) => {
            tracing::warn!(error = %err, "storage ping failed");
            "unreachable".to_string()
        }
    };
    let status = if storage == "ok" { "ok" } else { "degraded" };
    ok(HealthDto {
        status: status.to_string(),
        collector: state.scheduler.state().as_str().to_string(),
        storage,
    })
}
