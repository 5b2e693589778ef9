//! 周期批量写入内存实现

use super::{InMemoryEquipmentStateStore, InMemoryEventLogStore, InMemoryReadingStore};
use crate::error::StorageError;
use crate::models::CycleBatch;
use crate::traits::CycleStore;
use domain::LogEventRecord;
use std::sync::Arc;

/// 组合三个内存存储；三把写锁全部拿到后才开始写入，批次整体可见。
pub struct InMemoryCycleStore {
    readings: Arc<InMemoryReadingStore>,
    states: Arc<InMemoryEquipmentStateStore>,
    events: Arc<InMemoryEventLogStore>,
}

impl InMemoryCycleStore {
    pub fn new(
        readings: Arc<InMemoryReadingStore>,
        states: Arc<InMemoryEquipmentStateStore>,
        events: Arc<InMemoryEventLogStore>,
    ) -> Self {
        Self {
            readings,
            states,
            events,
        }
    }
}

#[async_trait::async_trait]
impl CycleStore for InMemoryCycleStore {
    async fn write_cycle(&self, batch: &CycleBatch) -> Result<Vec<LogEventRecord>, StorageError> {
        let records: Vec<LogEventRecord> = batch
            .events
            .iter()
            .cloned()
            .map(|event| event.into_record(uuid::Uuid::new_v4().to_string()))
            .collect();

        // 加锁顺序固定为 readings → states → events
        let mut readings = self
            .readings
            .readings
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut states = self
            .states
            .states
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut events = self
            .events
            .events
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;

        self.readings.append(&mut readings, &batch.readings);
        for record in &batch.states {
            self.states
                .append(&mut states, &record.equipment_id, &record.state);
        }
        self.events.append(&mut events, &records);
        Ok(records)
    }
}
