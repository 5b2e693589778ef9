//! 存储查询参数与记录类型
//!
//! 读数、事件等主体类型直接使用 `domain` 中的定义，这里只补充查询条件与
//! 存储侧独有的包装。

use domain::{EquipmentState, LogEvent, ValidatedReading};
use serde::{Deserialize, Serialize};

/// 查询结果的时间排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOrder {
    #[default]
    Asc,
    Desc,
}

impl TimeOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(TimeOrder::Asc),
            "desc" => Some(TimeOrder::Desc),
            _ => None,
        }
    }
}

/// 读数查询条件：时间范围（闭区间）、设备、区域。
#[derive(Debug, Clone, Default)]
pub struct ReadingQuery {
    pub from_ms: Option<i64>,
    pub to_ms: Option<i64>,
    pub equipment_id: Option<String>,
    pub area_id: Option<String>,
    /// 0 或超过 `MAX_QUERY_LIMIT` 时按上限取；需要完整区间时用
    /// `ReadingStore::query_all_readings` 分页读取
    pub limit: usize,
    /// 按排序跳过的条数
    pub offset: usize,
    pub order: TimeOrder,
}

impl ReadingQuery {
    pub fn matches(&self, reading: &ValidatedReading) -> bool {
        if let Some(from) = self.from_ms {
            if reading.ts_ms < from {
                return false;
            }
        }
        if let Some(to) = self.to_ms {
            if reading.ts_ms > to {
                return false;
            }
        }
        if let Some(equipment_id) = self.equipment_id.as_deref() {
            if reading.equipment_id != equipment_id {
                return false;
            }
        }
        if let Some(area_id) = self.area_id.as_deref() {
            if reading.area_id.as_deref() != Some(area_id) {
                return false;
            }
        }
        true
    }
}

/// 设备最新运行状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentStateRecord {
    pub equipment_id: String,
    pub state: EquipmentState,
}

/// 单个采集周期的全部待写数据，经 `CycleStore::write_cycle` 一次提交。
#[derive(Debug, Clone, Default)]
pub struct CycleBatch {
    pub readings: Vec<ValidatedReading>,
    pub states: Vec<EquipmentStateRecord>,
    pub events: Vec<LogEvent>,
}

impl CycleBatch {
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty() && self.states.is_empty() && self.events.is_empty()
    }
}
