use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use domain::{RawReading, Threshold, Violation, ViolationKind};
use ems_storage::ThresholdStore;
use tracing::{debug, info, warn};

use crate::ThresholdError;
use crate::cache::ThresholdSnapshot;
use crate::efficiency::{EfficiencyRating, classify_efficiency};

/// 阈值缓存默认有效期。
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// 阈值来源抽象。
#[async_trait]
pub trait ThresholdSource: Send + Sync {
    async fn load_thresholds(&self) -> Result<Vec<Threshold>, ThresholdError>;
}

/// 基于 storage 的阈值来源。
#[derive(Clone)]
pub struct StorageThresholdSource {
    store: Arc<dyn ThresholdStore>,
}

impl StorageThresholdSource {
    pub fn new(store: Arc<dyn ThresholdStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ThresholdSource for StorageThresholdSource {
    async fn load_thresholds(&self) -> Result<Vec<Threshold>, ThresholdError> {
        self.store
            .list_thresholds()
            .await
            .map_err(|err| ThresholdError::Source(err.to_string()))
    }
}

/// 阈值判定引擎。
///
/// 读路径只克隆快照的 `Arc`；重载先在锁外构建新快照，再在写锁内一次性替换。
/// 重载失败时继续使用旧快照。
pub struct ThresholdEngine {
    source: Arc<dyn ThresholdSource>,
    ttl: Duration,
    cache: RwLock<Arc<ThresholdSnapshot>>,
    loaded_at: Mutex<Option<Instant>>,
    reload_gate: tokio::sync::Mutex<()>,
}

impl ThresholdEngine {
    pub fn new(source: Arc<dyn ThresholdSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cache: RwLock::new(Arc::new(ThresholdSnapshot::default())),
            loaded_at: Mutex::new(None),
            reload_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// 当前快照。
    pub fn snapshot(&self) -> Arc<ThresholdSnapshot> {
        self.cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_stale(&self) -> bool {
        let loaded_at = self
            .loaded_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match *loaded_at {
            Some(at) => at.elapsed() >= self.ttl,
            None => true,
        }
    }

    /// 过期时重载；失败只记录日志，返回是否发生了成功重载。
    pub async fn refresh_if_stale(&self) -> bool {
        if !self.is_stale() {
            return false;
        }
        match self.reload().await {
            Ok(_) => true,
            Err(err) => {
                warn!(
                    target: "ems.threshold",
                    error = %err,
                    cached = self.snapshot().len(),
                    "threshold reload failed, serving stale cache"
                );
                false
            }
        }
    }

    /// 立即从来源重建缓存，返回阈值条数。
    pub async fn reload(&self) -> Result<usize, ThresholdError> {
        let _gate = self.reload_gate.lock().await;

        let thresholds = match self.source.load_thresholds().await {
            Ok(thresholds) => thresholds,
            Err(err) => {
                ems_telemetry::record_threshold_reload(false);
                return Err(err);
            }
        };
        let snapshot = Arc::new(ThresholdSnapshot::build(thresholds));
        let count = snapshot.len();

        *self
            .cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = snapshot;
        *self
            .loaded_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Instant::now());

        ems_telemetry::record_threshold_reload(true);
        info!(target: "ems.threshold", thresholds = count, "threshold cache reloaded");
        Ok(count)
    }

    /// 对一条原始读数做阈值判定（使用当前快照）。
    pub fn evaluate(&self, reading: &RawReading) -> Vec<Violation> {
        evaluate_with(&self.snapshot(), reading)
    }

    /// 设备能效评级。
    pub fn classify_efficiency(
        &self,
        load_factor: f64,
        power_factor: f64,
        quality_score: f64,
    ) -> EfficiencyRating {
        classify_efficiency(load_factor, power_factor, quality_score)
    }
}

/// 按快照判定；每个参数最多一条越限，非有限值不参与判定。
pub fn evaluate_with(snapshot: &ThresholdSnapshot, reading: &RawReading) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (parameter, value) in reading.values.present() {
        if !value.is_finite() {
            continue;
        }
        let Some(threshold) =
            snapshot.resolve(&reading.equipment_id, reading.area_id.as_deref(), parameter)
        else {
            continue;
        };
        let Some((kind, bound)) = classify(value, threshold) else {
            continue;
        };

        debug!(
            target: "ems.threshold",
            equipment_id = %reading.equipment_id,
            parameter = %parameter,
            value,
            bound,
            kind = kind.as_str(),
            "threshold violated"
        );
        violations.push(Violation {
            equipment_id: reading.equipment_id.clone(),
            meter_id: reading.meter_id.clone(),
            parameter: parameter.as_str().to_string(),
            value,
            threshold_value: bound,
            kind,
            severity: kind.severity(),
            message: describe(parameter.as_str(), value, kind, bound),
            ts_ms: reading.ts_ms,
        });
    }
    violations
}

/// 首个命中的规则生效：严重上限 → 警告上限 → 严重下限 → 警告下限。
pub fn classify(value: f64, threshold: &Threshold) -> Option<(ViolationKind, f64)> {
    let rules = [
        (threshold.critical_max, ViolationKind::CriticalMaxExceeded),
        (threshold.warning_max, ViolationKind::WarningMaxExceeded),
        (threshold.critical_min, ViolationKind::CriticalMinExceeded),
        (threshold.warning_min, ViolationKind::WarningMinExceeded),
    ];
    rules.into_iter().find_map(|(bound, kind)| {
        let bound = bound?;
        let crossed = match kind {
            ViolationKind::CriticalMaxExceeded | ViolationKind::WarningMaxExceeded => value > bound,
            ViolationKind::CriticalMinExceeded | ViolationKind::WarningMinExceeded => value < bound,
        };
        crossed.then_some((kind, bound))
    })
}

fn describe(parameter: &str, value: f64, kind: ViolationKind, bound: f64) -> String {
    let limit = match kind {
        ViolationKind::CriticalMaxExceeded => "above critical maximum",
        ViolationKind::WarningMaxExceeded => "above warning maximum",
        ViolationKind::CriticalMinExceeded => "below critical minimum",
        ViolationKind::WarningMinExceeded => "below warning minimum",
    };
    format!("{} {:.2} {} {:.2}", parameter, value, limit, bound)
}
