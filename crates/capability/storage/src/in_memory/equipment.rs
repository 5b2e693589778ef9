//! 设备配置内存实现

use crate::error::StorageError;
use crate::traits::EquipmentStore;
use domain::{Equipment, Meter};
use std::sync::RwLock;

/// 设备与表计配置内存存储
pub struct InMemoryEquipmentStore {
    equipment: RwLock<Vec<Equipment>>,
    meters: RwLock<Vec<Meter>>,
}

impl InMemoryEquipmentStore {
    pub fn new(equipment: Vec<Equipment>, meters: Vec<Meter>) -> Self {
        Self {
            equipment: RwLock::new(equipment),
            meters: RwLock::new(meters),
        }
    }

    /// 整体替换配置（下一周期生效）
    pub fn replace(&self, equipment: Vec<Equipment>, meters: Vec<Meter>) -> Result<(), StorageError> {
        *self
            .equipment
            .write()
            .map_err(|_| StorageError::new("lock failed"))? = equipment;
        *self
            .meters
            .write()
            .map_err(|_| StorageError::new("lock failed"))? = meters;
        Ok(())
    }
}

impl Default for InMemoryEquipmentStore {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

#[async_trait::async_trait]
impl EquipmentStore for InMemoryEquipmentStore {
    async fn list_equipment(&self) -> Result<Vec<Equipment>, StorageError> {
        let equipment = self
            .equipment
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(equipment.clone())
    }

    async fn find_equipment(&self, equipment_id: &str) -> Result<Option<Equipment>, StorageError> {
        let equipment = self
            .equipment
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(equipment.iter().find(|item| item.id == equipment_id).cloned())
    }

    async fn list_meters(&self) -> Result<Vec<Meter>, StorageError> {
        let meters = self
            .meters
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(meters.clone())
    }
}
