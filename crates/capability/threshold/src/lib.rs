//! 阈值判定与能效评估。
//!
//! - `ThresholdEngine`：按 设备 → 区域 → 全局 解析阈值并分级越限，缓存带 TTL 与失败保留；
//! - `efficiency`：负载率 + 功率因数 的能效评级；
//! - `indicators`：报表用的设备 / 区域能效指标与低效模式识别。

mod cache;
pub mod efficiency;
mod engine;
pub mod indicators;

pub use cache::ThresholdSnapshot;
pub use efficiency::{EfficiencyRating, MIN_QUALITY_SCORE, classify_efficiency};
pub use engine::{
    DEFAULT_CACHE_TTL, StorageThresholdSource, ThresholdEngine, ThresholdSource, classify,
    evaluate_with,
};
pub use indicators::{
    AreaIndicators, EquipmentIndicators, Inefficiency, InefficiencyKind, integrate_energy_kwh,
    quality_score,
};

/// 阈值模块错误。
#[derive(Debug, thiserror::Error)]
pub enum ThresholdError {
    #[error("threshold source error: {0}")]
    Source(String),
}
