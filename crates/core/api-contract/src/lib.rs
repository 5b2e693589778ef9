//! 监控 HTTP 接口的 DTO 与响应契约。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 历史读数查询参数（时间为毫秒时间戳，闭区间）。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingsQuery {
    #[serde(alias = "equipment_id")]
    pub equipment_id: Option<String>,
    #[serde(alias = "area_id")]
    pub area_id: Option<String>,
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub limit: Option<usize>,
    pub order: Option<String>,
}

/// 单条读数；`values` 以参数名为键，缺失或被剔除的参数不出现。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingDto {
    pub ts_ms: i64,
    pub equipment_id: String,
    pub meter_id: Option<String>,
    pub area_id: Option<String>,
    pub values: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, f64>,
    pub quality: String,
    #[serde(default)]
    pub anomalies: Vec<String>,
}

/// 活动事件查询参数。
#[derive(Debug, Default, Deserialize)]
pub struct ActiveEventsQuery {
    pub limit: Option<usize>,
}

/// 越限 / 通信故障事件。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEventDto {
    pub event_id: String,
    pub equipment_id: String,
    pub meter_id: Option<String>,
    pub event_type: String,
    pub severity: String,
    pub parameter: Option<String>,
    pub message: String,
    pub value: Option<f64>,
    pub threshold_value: Option<f64>,
    pub ts_ms: i64,
    pub acknowledged: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeDto {
    pub event_id: String,
    pub acknowledged: bool,
}

/// 统计区间；缺省为最近 24 小时。
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InefficiencyDto {
    pub kind: String,
    pub value: f64,
    pub description: String,
}

/// 单台设备的区间能效指标。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentStatsDto {
    pub equipment_id: String,
    pub equipment_name: String,
    pub area_id: Option<String>,
    pub sample_count: usize,
    pub average_power: Option<f64>,
    pub max_power: Option<f64>,
    pub min_power: Option<f64>,
    pub load_factor: Option<f64>,
    pub average_power_factor: Option<f64>,
    pub min_power_factor: Option<f64>,
    pub average_voltage: Option<f64>,
    pub voltage_deviation: Option<f64>,
    pub energy_kwh: f64,
    pub quality_score: f64,
    pub rating: String,
    pub inefficiencies: Vec<InefficiencyDto>,
}

/// 区域汇总；`activeViolations` 为该区域设备的未确认越限事件数。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaStatsDto {
    pub area_id: String,
    pub equipment_count: usize,
    pub sample_count: usize,
    pub total_energy_kwh: f64,
    pub average_power: Option<f64>,
    pub average_power_factor: Option<f64>,
    pub quality_score: f64,
    pub active_violations: usize,
}

/// 采集计数快照。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub devices_polled: u64,
    pub device_failures: u64,
    pub readings_collected: u64,
    pub readings_poor: u64,
    pub readings_bad: u64,
    pub violations: u64,
    pub communication_errors: u64,
    pub threshold_reloads: u64,
    pub threshold_reload_failures: u64,
    pub average_cycle_latency_ms: u64,
}

/// 单个采集周期的汇总。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReportDto {
    pub ts_ms: i64,
    pub devices_polled: usize,
    pub devices_failed: usize,
    pub readings: usize,
    pub poor_readings: usize,
    pub bad_readings: usize,
    pub equipment_states: usize,
    pub violations: usize,
    pub communication_errors: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorStatusDto {
    pub state: String,
    pub last_cycle: Option<CycleReportDto>,
}

/// start/stop 结果；`changed` 为 false 表示已处于目标状态。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorActionDto {
    pub state: String,
    pub changed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDto {
    pub status: String,
    pub collector: String,
    pub storage: String,
}
