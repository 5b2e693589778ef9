//! 读数内存实现
//!
//! 用于测试、演示以及无数据库时的站点文件模式；超过保留条数时丢弃最早的读数。

use crate::error::StorageError;
use crate::models::{ReadingQuery, TimeOrder};
use crate::traits::ReadingStore;
use crate::validation::sanitize_query;
use domain::ValidatedReading;
use std::sync::RwLock;

/// 默认保留的读数条数
pub const DEFAULT_READING_RETENTION: usize = 200_000;

/// 读数内存存储
pub struct InMemoryReadingStore {
    pub(crate) readings: RwLock<Vec<ValidatedReading>>,
    retention: usize,
}

impl InMemoryReadingStore {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_READING_RETENTION)
    }

    /// 最多保留 `retention` 条（至少 1 条）
    pub fn with_retention(retention: usize) -> Self {
        Self {
            readings: RwLock::new(Vec::new()),
            retention: retention.max(1),
        }
    }

    /// 追加到已加锁的读数表并裁掉超出保留量的最早读数
    pub(crate) fn append(&self, store: &mut Vec<ValidatedReading>, readings: &[ValidatedReading]) {
        store.extend(readings.iter().cloned());
        let excess = store.len().saturating_sub(self.retention);
        if excess > 0 {
            store.drain(..excess);
        }
    }

    /// 当前累计的读数数量（用于测试）
    pub fn len(&self) -> usize {
        self.readings.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryReadingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ReadingStore for InMemoryReadingStore {
    async fn write_readings(&self, readings: &[ValidatedReading]) -> Result<usize, StorageError> {
        let mut store = self
            .readings
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        self.append(&mut store, readings);
        Ok(readings.len())
    }

    async fn query_readings(
        &self,
        query: ReadingQuery,
    ) -> Result<Vec<ValidatedReading>, StorageError> {
        let query = sanitize_query(query)?;
        let readings = self
            .readings
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut selected: Vec<ValidatedReading> = readings
            .iter()
            .filter(|reading| query.matches(reading))
            .cloned()
            .collect();
        // 稳定排序，同一时间戳保持写入顺序
        selected.sort_by_key(|item| item.ts_ms);
        if matches!(query.order, TimeOrder::Desc) {
            selected.reverse();
        }
        Ok(selected
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }
}
