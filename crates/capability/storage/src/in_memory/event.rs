//! 日志事件内存实现

use crate::error::StorageError;
use crate::traits::EventLogStore;
use crate::validation::clamp_limit;
use domain::{LogEvent, LogEventRecord};
use std::sync::RwLock;

/// 默认保留的事件条数
pub const DEFAULT_EVENT_RETENTION: usize = 10_000;

/// 超过保留条数时先丢弃最早的已确认事件，仍超出再丢弃最早的事件。
pub struct InMemoryEventLogStore {
    pub(crate) events: RwLock<Vec<LogEventRecord>>,
    retention: usize,
}

impl InMemoryEventLogStore {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_EVENT_RETENTION)
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            retention: retention.max(1),
        }
    }

    pub(crate) fn append(&self, events: &mut Vec<LogEventRecord>, records: &[LogEventRecord]) {
        events.extend(records.iter().cloned());
        let mut excess = events.len().saturating_sub(self.retention);
        if excess == 0 {
            return;
        }
        events.retain(|event| {
            if excess > 0 && event.acknowledged {
                excess -= 1;
                false
            } else {
                true
            }
        });
        if excess > 0 {
            events.drain(..excess);
        }
    }

    /// 全部事件（含已确认），按写入顺序
    pub fn all(&self) -> Vec<LogEventRecord> {
        self.events.read().map(|v| v.clone()).unwrap_or_default()
    }
}

impl Default for InMemoryEventLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EventLogStore for InMemoryEventLogStore {
    async fn create_event(&self, event: LogEvent) -> Result<LogEventRecord, StorageError> {
        let record = event.into_record(uuid::Uuid::new_v4().to_string());
        let mut events = self
            .events
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        self.append(&mut events, std::slice::from_ref(&record));
        Ok(record)
    }

    async fn list_active_events(&self, limit: usize) -> Result<Vec<LogEventRecord>, StorageError> {
        let events = self
            .events
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut active: Vec<LogEventRecord> = events
            .iter()
            .filter(|event| !event.acknowledged)
            .cloned()
            .collect();
        active.sort_by(|a, b| {
            b.severity
                .rank()
                .cmp(&a.severity.rank())
                .then(b.ts_ms.cmp(&a.ts_ms))
        });
        active.truncate(clamp_limit(limit));
        Ok(active)
    }

    async fn acknowledge_event(&self, event_id: &str) -> Result<bool, StorageError> {
        let mut events = self
            .events
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        match events
            .iter_mut()
            .find(|event| event.event_id == event_id && !event.acknowledged)
        {
            Some(event) => {
                event.acknowledged = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
