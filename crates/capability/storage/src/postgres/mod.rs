//! # PostgreSQL 存储实现模块
//!
//! 生产环境使用的存储实现。表结构由外部维护，本模块只读写以下表。
//!
//! ## 包含的实现
//!
//! - **EquipmentStore** (`equipment.rs`)：`equipment` 与 `meters` 表
//! - **ThresholdStore** (`threshold.rs`)：`thresholds` 表
//! - **ReadingStore** (`reading.rs`)：`readings` 表，每个参数一列
//! - **EquipmentStateStore** (`state.rs`)：`equipment_states` 表
//! - **EventLogStore** (`event.rs`)：`log_events` 表
//! - **CycleStore** (`cycle.rs`)：一个周期的读数、状态、事件在同一事务中写入
//!
//! ## 表结构要求
//!
//! - `equipment`：equipment_id, name, ip_address, port (int), unit_id (int), device_class, status, area_id
//! - `meters`：meter_id, equipment_id, current_ratio, voltage_ratio (double precision)
//! - `thresholds`：threshold_id (bigserial), scope, scope_id, parameter, warning_max, critical_max, warning_min, critical_min
//! - `readings`：reading_id (bigserial), ts_ms (bigint), equipment_id, meter_id, area_id, quality,
//!   anomalies, extra, 以及 11 个参数列（active_power … frequency，double precision，可空）
//! - `equipment_states`：equipment_id, ts_ms, state, operation_code, status_words, discrete_inputs
//! - `log_events`：event_id, equipment_id, meter_id, event_type, severity, parameter, message,
//!   value, threshold_value, ts_ms, acknowledged (bool), acknowledged_at_ms
//!
//! 建议索引：`readings (equipment_id, ts_ms)`、`readings (area_id, ts_ms)`、
//! `equipment_states (equipment_id, ts_ms desc)`、`log_events (acknowledged, ts_ms desc)`。
//!
//! ## 约定
//!
//! - 时间戳统一存为 `bigint` 毫秒
//! - 枚举存为小写字符串，读取时无法识别的取值报 `StorageError`
//! - 列表类字段（异常描述、状态字、离散输入、扩展字段）存为 JSON 文本
//! - 所有 SQL 使用参数绑定；动态列名只来自固定的参数名表
//! - 批量写入在单个事务中完成

pub mod cycle;
pub mod equipment;
pub mod event;
pub mod reading;
pub mod state;
pub mod threshold;

pub use cycle::*;
pub use equipment::*;
pub use event::*;
pub use reading::*;
pub use state::*;
pub use threshold::*;

use crate::error::StorageError;

/// 解析枚举列，无法识别时报错
pub(crate) fn parse_column<T>(
    column: &str,
    value: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, StorageError> {
    parse(value).ok_or_else(|| StorageError::new(format!("invalid {column}: {value}")))
}
