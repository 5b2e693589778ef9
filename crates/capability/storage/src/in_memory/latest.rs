//! 最新读数内存实现
//!
//! 键与 Redis 实现一致：`equipment_id` + 可选 `meter_id`。

use crate::error::StorageError;
use crate::traits::LatestReadingStore;
use domain::ValidatedReading;
use std::collections::HashMap;
use std::sync::RwLock;

pub struct InMemoryLatestReadingStore {
    values: RwLock<HashMap<(String, Option<String>), ValidatedReading>>,
}

impl InMemoryLatestReadingStore {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryLatestReadingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LatestReadingStore for InMemoryLatestReadingStore {
    /// 时间戳更旧的读数不覆盖已有值
    async fn upsert_latest(&self, reading: &ValidatedReading) -> Result<(), StorageError> {
        let mut values = self
            .values
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let key = (reading.equipment_id.clone(), reading.meter_id.clone());
        match values.get(&key) {
            Some(existing) if existing.ts_ms > reading.ts_ms => {}
            _ => {
                values.insert(key, reading.clone());
            }
        }
        Ok(())
    }

    async fn get_latest(
        &self,
        equipment_id: &str,
        meter_id: Option<&str>,
    ) -> Result<Option<ValidatedReading>, StorageError> {
        let values = self
            .values
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let key = (equipment_id.to_string(), meter_id.map(str::to_string));
        Ok(values.get(&key).cloned())
    }

    async fn list_latest(&self) -> Result<Vec<ValidatedReading>, StorageError> {
        let values = self
            .values
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut items: Vec<ValidatedReading> = values.values().cloned().collect();
        items.sort_by(|a, b| {
            (a.equipment_id.as_str(), a.meter_id.as_deref())
                .cmp(&(b.equipment_id.as_str(), b.meter_id.as_deref()))
        });
        Ok(items)
    }
}
