//! 阈值配置内存实现

use crate::error::StorageError;
use crate::traits::ThresholdStore;
use domain::Threshold;
use std::sync::RwLock;

pub struct InMemoryThresholdStore {
    thresholds: RwLock<Vec<Threshold>>,
}

impl InMemoryThresholdStore {
    pub fn new(thresholds: Vec<Threshold>) -> Self {
        Self {
            thresholds: RwLock::new(thresholds),
        }
    }

    /// 替换全部阈值；阈值引擎在下次刷新时读到新配置
    pub fn replace_thresholds(&self, thresholds: Vec<Threshold>) -> Result<(), StorageError> {
        let mut current = self
            .thresholds
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        *current = thresholds;
        Ok(())
    }
}

impl Default for InMemoryThresholdStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait::async_trait]
impl ThresholdStore for InMemoryThresholdStore {
    async fn list_thresholds(&self) -> Result<Vec<Threshold>, StorageError> {
        let thresholds = self
            .thresholds
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(thresholds.clone())
    }
}
