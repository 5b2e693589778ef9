//! 错误响应与 DTO 转换。

use api_contract::{ApiResponse, CycleReportDto, LogEventDto, MetricsSnapshotDto, ReadingDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::{LogEventRecord, ValidatedReading};
use ems_pipeline::CycleReport;
use ems_storage::StorageError;
use ems_telemetry::MetricsSnapshot;

pub fn ok<T: serde::Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

pub fn bad_request_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("INVALID.REQUEST", message.into())),
    )
        .into_response()
}

pub fn not_found_error(message: impl Into<String>) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("RESOURCE.NOT_FOUND", message.into())),
    )
        .into_response()
}

pub fn storage_error(err: StorageError) -> Response {
    tracing::warn!(error = %err, "storage request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error("INTERNAL.ERROR", err.to_string())),
    )
        .into_response()
}

/// 只输出通过校验的参数。
pub fn reading_to_dto(reading: ValidatedReading) -> ReadingDto {
    ReadingDto {
        values: reading
            .values
            .present()
            .map(|(parameter, value)| (parameter.as_str().to_string(), value))
            .collect(),
        ts_ms: reading.ts_ms,
        equipment_id: reading.equipment_id,
        meter_id: reading.meter_id,
        area_id: reading.area_id,
        extra: reading.extra,
        quality: reading.quality.as_str().to_string(),
        anomalies: reading.anomalies,
    }
}

pub fn event_to_dto(record: LogEventRecord) -> LogEventDto {
    LogEventDto {
        event_id: record.event_id,
        equipment_id: record.equipment_id,
        meter_id: record.meter_id,
        event_type: record.event_type,
        severity: record.severity.as_str().to_string(),
        parameter: record.parameter,
        message: record.message,
        value: record.value,
        threshold_value: record.threshold_value,
        ts_ms: record.ts_ms,
        acknowledged: record.acknowledged,
    }
}

pub fn report_to_dto(report: CycleReport) -> CycleReportDto {
    CycleReportDto {
        ts_ms: report.ts_ms,
        devices_polled: report.devices_polled,
        devices_failed: report.devices_failed,
        readings: report.readings,
        poor_readings: report.poor_readings,
        bad_readings: report.bad_readings,
        equipment_states: report.equipment_states,
        violations: report.violations,
        communication_errors: report.communication_errors,
        duration_ms: report.duration_ms,
    }
}

pub fn metrics_to_dto(snapshot: MetricsSnapshot) -> MetricsSnapshotDto {
    MetricsSnapshotDto {
        average_cycle_latency_ms: snapshot.average_cycle_latency_ms(),
        cycles_completed: snapshot.cycles_completed,
        cycles_failed: snapshot.cycles_failed,
        devices_polled: snapshot.devices_polled,
        device_failures: snapshot.device_failures,
        readings_collected: snapshot.readings_collected,
        readings_poor: snapshot.readings_poor,
        readings_bad: snapshot.readings_bad,
        violations: snapshot.violations,
        communication_errors: snapshot.communication_errors,
        threshold_reloads: snapshot.threshold_reloads,
        threshold_reload_failures: snapshot.threshold_reload_failures,
    }
}
