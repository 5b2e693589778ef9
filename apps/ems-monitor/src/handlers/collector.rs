//! 采集调度控制 handlers
//!
//! - GET /api/collector
//! - POST /api/collector/start
//! - POST /api/collector/stop

use crate::AppState;
use crate::utils::response::{ok, report_to_dto};
use api_contract::{CollectorActionDto, CollectorStatusDto};
use axum::{extract::State, response::Response};

pub async fn get_collector(State(state): State<AppState>) -> Response {
    ok(CollectorStatusDto {
        state: state.scheduler.state().as_str().to_string(),
        last_cycle: state.scheduler.last_report().map(report_to_dto),
    })
}

pub async fn start_collector(State(state): State<AppState>) -> Response {
    let changed = state.scheduler.start();
    ok(CollectorActionDto {
        state: state.scheduler.state().as_str().to_string(),
        changed,
    })
}

/// 只发出停止请求，进行中的周期照常落库。
pub async fn stop_collector(State(state): State<AppState>) -> Response {
    let changed = state.scheduler.stop();
    ok(CollectorActionDto {
        state: state.scheduler.state().as_str().to_string(),
        changed,
    })
}
