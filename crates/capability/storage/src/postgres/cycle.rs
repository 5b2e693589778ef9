//! Postgres 周期批量写入
//!
//! 读数、控制器状态与事件在同一个事务中写入，任一失败整体回滚。

use super::event::insert_event;
use super::reading::{insert_reading, insert_sql};
use super::state::insert_state;
use crate::error::StorageError;
use crate::models::CycleBatch;
use crate::traits::CycleStore;
use domain::LogEventRecord;
use sqlx::PgPool;

pub struct PgCycleStore {
    pub pool: PgPool,
}

impl PgCycleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CycleStore for PgCycleStore {
    async fn write_cycle(&self, batch: &CycleBatch) -> Result<Vec<LogEventRecord>, StorageError> {
        let records: Vec<LogEventRecord> = batch
            .events
            .iter()
            .cloned()
            .map(|event| event.into_record(uuid::Uuid::new_v4().to_string()))
            .collect();
        if batch.is_empty() {
            return Ok(records);
        }

        let sql = insert_sql();
        let mut tx = self.pool.begin().await?;
        for reading in &batch.readings {
            insert_reading(&mut *tx, &sql, reading).await?;
        }
        for record in &batch.states {
            insert_state(&mut *tx, &record.equipment_id, &record.state).await?;
        }
        for record in &records {
            insert_event(&mut *tx, record).await?;
        }
        tx.commit().await?;
        Ok(records)
    }
}
