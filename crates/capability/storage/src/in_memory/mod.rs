//! 内存存储实现模块
//!
//! 用于测试、演示以及无数据库时由站点配置文件驱动的运行方式。
//!
//! 包含以下实现：
//! - EquipmentStore: InMemoryEquipmentStore
//! - ThresholdStore: InMemoryThresholdStore
//! - ReadingStore: InMemoryReadingStore
//! - EquipmentStateStore: InMemoryEquipmentStateStore
//! - EventLogStore: InMemoryEventLogStore
//! - LatestReadingStore: InMemoryLatestReadingStore
//! - CycleStore: InMemoryCycleStore（组合读数、状态、事件三个内存存储）
//!
//! 读数、状态历史与事件都有保留上限，长时间运行时内存占用有界。

pub mod cycle;
pub mod equipment;
pub mod event;
pub mod latest;
pub mod reading;
pub mod state;
pub mod threshold;

pub use cycle::*;
pub use equipment::*;
pub use event::*;
pub use latest::*;
pub use reading::*;
pub use state::*;
pub use threshold::*;
