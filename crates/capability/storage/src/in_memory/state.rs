//! 控制器状态内存实现

use crate::error::StorageError;
use crate::models::EquipmentStateRecord;
use crate::traits::EquipmentStateStore;
use domain::EquipmentState;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// 每台设备默认保留的状态条数
pub const DEFAULT_STATE_HISTORY: usize = 1_000;

/// 保留每台设备的状态历史，`latest_states` 取时间最新的一条。
pub struct InMemoryEquipmentStateStore {
    pub(crate) states: RwLock<BTreeMap<String, Vec<EquipmentState>>>,
    history_limit: usize,
}

impl InMemoryEquipmentStateStore {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_STATE_HISTORY)
    }

    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            states: RwLock::new(BTreeMap::new()),
            history_limit: history_limit.max(1),
        }
    }

    pub(crate) fn append(
        &self,
        states: &mut BTreeMap<String, Vec<EquipmentState>>,
        equipment_id: &str,
        state: &EquipmentState,
    ) {
        let history = states.entry(equipment_id.to_string()).or_default();
        history.push(state.clone());
        let excess = history.len().saturating_sub(self.history_limit);
        if excess > 0 {
            history.drain(..excess);
        }
    }

    pub fn history(&self, equipment_id: &str) -> Vec<EquipmentState> {
        self.states
            .read()
            .ok()
            .and_then(|states| states.get(equipment_id).cloned())
            .unwrap_or_default()
    }
}

impl Default for InMemoryEquipmentStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EquipmentStateStore for InMemoryEquipmentStateStore {
    async fn write_state(
        &self,
        equipment_id: &str,
        state: &EquipmentState,
    ) -> Result<(), StorageError> {
        let mut states = self
            .states
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        self.append(&mut states, equipment_id, state);
        Ok(())
    }

    async fn latest_states(&self) -> Result<Vec<EquipmentStateRecord>, StorageError> {
        let states = self
            .states
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(states
            .iter()
            .filter_map(|(equipment_id, history)| {
                history
                    .iter()
                    .max_by_key(|state| state.ts_ms)
                    .map(|state| EquipmentStateRecord {
                        equipment_id: equipment_id.clone(),
                        state: state.clone(),
                    })
            })
            .collect())
    }
}
