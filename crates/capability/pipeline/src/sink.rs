use crate::PipelineError;
use async_trait::async_trait;
use domain::{EquipmentState, LogEvent, ValidatedReading};
use ems_storage::{CycleBatch, CycleStore, EquipmentStateRecord, LatestReadingStore};
use std::sync::Arc;
use tracing::warn;

/// 周期结果的落库出口。
#[async_trait]
pub trait ReadingSink: Send + Sync {
    async fn save_readings(&self, readings: &[ValidatedReading]) -> Result<usize, PipelineError>;

    async fn save_equipment_state(
        &self,
        equipment_id: &str,
        state: &EquipmentState,
    ) -> Result<(), PipelineError>;

    async fn create_log_event(&self, event: LogEvent) -> Result<(), PipelineError>;

    /// 一个周期的读数、状态与事件整批写入；返回错误时本批次不得有任何部分落库。
    async fn save_cycle(&self, batch: CycleBatch) -> Result<(), PipelineError>;
}

/// 基于存储层的出口：批量写入走 `CycleStore`，最新值缓存在提交后更新。
#[derive(Clone)]
pub struct StorageSink {
    cycles: Arc<dyn CycleStore>,
    latest: Option<Arc<dyn LatestReadingStore>>,
}

impl StorageSink {
    pub fn new(cycles: Arc<dyn CycleStore>) -> Self {
        Self {
            cycles,
            latest: None,
        }
    }

    pub fn with_latest(mut self, latest: Arc<dyn LatestReadingStore>) -> Self {
        self.latest = Some(latest);
        self
    }

    async fn commit(&self, batch: &CycleBatch) -> Result<(), PipelineError> {
        self.cycles
            .write_cycle(batch)
            .await
            .map(|_| ())
            .map_err(|err| PipelineError::Sink(err.to_string()))?;
        // 最新值缓存失败不影响本周期结果
        if let Some(latest) = &self.latest {
            for reading in &batch.readings {
                if let Err(err) = latest.upsert_latest(reading).await {
                    warn!(
                        target: "ems.pipeline",
                        equipment_id = %reading.equipment_id,
                        error = %err,
                        "latest reading update failed"
                    );
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ReadingSink for StorageSink {
    async fn save_readings(&self, readings: &[ValidatedReading]) -> Result<usize, PipelineError> {
        self.commit(&CycleBatch {
            readings: readings.to_vec(),
            ..CycleBatch::default()
        })
        .await?;
        Ok(readings.len())
    }

    async fn save_equipment_state(
        &self,
        equipment_id: &str,
        state: &EquipmentState,
    ) -> Result<(), PipelineError> {
        self.commit(&CycleBatch {
            states: vec![EquipmentStateRecord {
                equipment_id: equipment_id.to_string(),
                state: state.clone(),
            }],
            ..CycleBatch::default()
        })
        .await
    }

    async fn create_log_event(&self, event: LogEvent) -> Result<(), PipelineError> {
        self.commit(&CycleBatch {
            events: vec![event],
            ..CycleBatch::default()
        })
        .await
    }

    async fn save_cycle(&self, batch: CycleBatch) -> Result<(), PipelineError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.commit(&batch).await
    }
}
