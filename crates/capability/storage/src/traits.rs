//! 存储接口 Trait 定义
//!
//! - EquipmentStore：设备与表计配置（采集配置源）
//! - ThresholdStore：阈值配置
//! - ReadingStore：校验后读数的写入与按时间/设备/区域查询
//! - EquipmentStateStore：控制器运行状态
//! - EventLogStore：越限与通信故障事件
//! - LatestReadingStore：每个表计的最新读数
//! - CycleStore：一个采集周期的读数、状态与事件整批写入
//!
//! 设计原则：
//! - 所有接口返回 StorageError
//! - 使用 async_trait 支持动态分发

use crate::error::StorageError;
use crate::models::{CycleBatch, EquipmentStateRecord, ReadingQuery};
use crate::validation::MAX_QUERY_LIMIT;
use async_trait::async_trait;
use domain::{Equipment, EquipmentState, LogEvent, LogEventRecord, Meter, Threshold, ValidatedReading};

/// 设备配置存储接口
#[async_trait]
pub trait EquipmentStore: Send + Sync {
    async fn list_equipment(&self) -> Result<Vec<Equipment>, StorageError>;

    async fn find_equipment(&self, equipment_id: &str) -> Result<Option<Equipment>, StorageError>;

    async fn list_meters(&self) -> Result<Vec<Meter>, StorageError>;
}

/// 阈值配置存储接口
#[async_trait]
pub trait ThresholdStore: Send + Sync {
    async fn list_thresholds(&self) -> Result<Vec<Threshold>, StorageError>;
}

/// 读数存储接口
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// 批量写入，返回写入条数
    async fn write_readings(&self, readings: &[ValidatedReading]) -> Result<usize, StorageError>;

    async fn query_readings(
        &self,
        query: ReadingQuery,
    ) -> Result<Vec<ValidatedReading>, StorageError>;

    /// 按 `MAX_QUERY_LIMIT` 分页读完整个区间，忽略 `limit` 与 `offset`
    async fn query_all_readings(
        &self,
        query: ReadingQuery,
    ) -> Result<Vec<ValidatedReading>, StorageError> {
        let mut all = Vec::new();
        loop {
            let page = self
                .query_readings(ReadingQuery {
                    limit: MAX_QUERY_LIMIT,
                    offset: all.len(),
                    ..query.clone()
                })
                .await?;
            let done = page.len() < MAX_QUERY_LIMIT;
            all.extend(page);
            if done {
                return Ok(all);
            }
        }
    }

    /// 连通性检查
    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// 控制器状态存储接口
#[async_trait]
pub trait EquipmentStateStore: Send + Sync {
    async fn write_state(
        &self,
        equipment_id: &str,
        state: &EquipmentState,
    ) -> Result<(), StorageError>;

    /// 每台设备最近一次状态
    async fn latest_states(&self) -> Result<Vec<EquipmentStateRecord>, StorageError>;
}

/// 日志事件存储接口
#[async_trait]
pub trait EventLogStore: Send + Sync {
    /// 生成事件 ID 并持久化（未确认）
    async fn create_event(&self, event: LogEvent) -> Result<LogEventRecord, StorageError>;

    /// 未确认事件，按严重等级降序、时间降序
    async fn list_active_events(&self, limit: usize) -> Result<Vec<LogEventRecord>, StorageError>;

    /// 确认事件；事件不存在或已确认返回 false
    async fn acknowledge_event(&self, event_id: &str) -> Result<bool, StorageError>;
}

/// 最新读数存储接口
#[async_trait]
pub trait LatestReadingStore: Send + Sync {
    async fn upsert_latest(&self, reading: &ValidatedReading) -> Result<(), StorageError>;

    async fn get_latest(
        &self,
        equipment_id: &str,
        meter_id: Option<&str>,
    ) -> Result<Option<ValidatedReading>, StorageError>;

    async fn list_latest(&self) -> Result<Vec<ValidatedReading>, StorageError>;
}

/// 周期批量写入接口：读数、状态与事件要么全部落库，要么全部不落库
#[async_trait]
pub trait CycleStore: Send + Sync {
    /// 返回已写入的事件记录（含生成的事件 ID）
    async fn write_cycle(&self, batch: &CycleBatch) -> Result<Vec<LogEventRecord>, StorageError>;
}
