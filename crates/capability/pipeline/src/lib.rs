//! 采集流水线：周期轮询 → 校验 → 阈值判定 → 落库。
//!
//! 一个周期内：
//! 1. 刷新设备/表计配置（失败沿用上次配置）与阈值缓存（过期才重载）
//! 2. 每台启用设备一个任务并行采集，全部 join 后汇总
//! 3. 原始读数逐条校验，同时对原始读数做阈值判定
//! 4. 读数、控制器状态、越限与通信故障事件打成一个 `CycleBatch` 交给 `ReadingSink::save_cycle`，
//!    整批提交或整批放弃
//!
//! 周期内不做任何持久化，直到第 4 步。

mod scheduler;
mod sink;
mod source;

pub use scheduler::{CycleReport, PollingScheduler, SchedulerConfig, SchedulerState};
pub use sink::{ReadingSink, StorageSink};
pub use source::{EquipmentSource, SiteInventory, StorageEquipmentSource};

/// Pipeline 处理错误。
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("config source error: {0}")]
    Source(String),
    #[error("sink error: {0}")]
    Sink(String),
}
