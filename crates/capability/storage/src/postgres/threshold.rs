//! Postgres 阈值配置实现

use super::parse_column;
use crate::error::StorageError;
use crate::traits::ThresholdStore;
use domain::{Threshold, ThresholdScope};
use sqlx::{PgPool, Row};

pub struct PgThresholdStore {
    pub pool: PgPool,
}

impl PgThresholdStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ThresholdStore for PgThresholdStore {
    /// 按 `threshold_id` 顺序返回，同键阈值以后出现者为准
    async fn list_thresholds(&self) -> Result<Vec<Threshold>, StorageError> {
        let rows = sqlx::query(
            "select scope, scope_id, parameter, warning_max, critical_max, warning_min, critical_min \
             from thresholds order by threshold_id",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut thresholds = Vec::with_capacity(rows.len());
        for row in rows {
            let scope: String = row.try_get("scope")?;
            thresholds.push(Threshold {
                scope: parse_column("scope", &scope, ThresholdScope::parse)?,
                scope_id: row.try_get("scope_id")?,
                parameter: row.try_get("parameter")?,
                warning_max: row.try_get("warning_max")?,
                critical_max: row.try_get("critical_max")?,
                warning_min: row.try_get("warning_min")?,
                critical_min: row.try_get("critical_min")?,
            });
        }
        Ok(thresholds)
    }
}
