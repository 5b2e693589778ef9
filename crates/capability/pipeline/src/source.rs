use crate::PipelineError;
use async_trait::async_trait;
use domain::{Equipment, Meter};
use ems_storage::EquipmentStore;
use std::sync::Arc;

/// 一次配置刷新得到的设备与表计清单。
#[derive(Debug, Clone, Default)]
pub struct SiteInventory {
    pub equipment: Vec<Equipment>,
    pub meters: Vec<Meter>,
}

impl SiteInventory {
    pub fn meters_for(&self, equipment_id: &str) -> Vec<Meter> {
        self.meters
            .iter()
            .filter(|meter| meter.equipment_id == equipment_id)
            .cloned()
            .collect()
    }

    pub fn active_equipment(&self) -> impl Iterator<Item = &Equipment> {
        self.equipment.iter().filter(|equipment| equipment.is_active())
    }
}

/// 采集配置来源。
#[async_trait]
pub trait EquipmentSource: Send + Sync {
    async fn load(&self) -> Result<SiteInventory, PipelineError>;
}

/// 基于存储层的配置来源。
#[derive(Clone)]
pub struct StorageEquipmentSource {
    store: Arc<dyn EquipmentStore>,
}

impl StorageEquipmentSource {
    pub fn new(store: Arc<dyn EquipmentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EquipmentSource for StorageEquipmentSource {
    async fn load(&self) -> Result<SiteInventory, PipelineError> {
        let equipment = self
            .store
            .list_equipment()
            .await
            .map_err(|err| PipelineError::Source(err.to_string()))?;
        let meters = self
            .store
            .list_meters()
            .await
            .map_err(|err| PipelineError::Source(err.to_string()))?;
        Ok(SiteInventory { equipment, meters })
    }
}
