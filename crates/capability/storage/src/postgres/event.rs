//! Postgres 日志事件实现

use super::parse_column;
use crate::error::StorageError;
use crate::traits::EventLogStore;
use crate::validation::clamp_limit;
use domain::{LogEvent, LogEventRecord, Severity};
use sqlx::{PgConnection, PgPool, Row};

pub struct PgEventLogStore {
    pub pool: PgPool,
}

impl PgEventLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) async fn insert_event(
    conn: &mut PgConnection,
    record: &LogEventRecord,
) -> Result<(), StorageError> {
    sqlx::query(
        "insert into log_events \
         (event_id, equipment_id, meter_id, event_type, severity, parameter, message, \
          value, threshold_value, ts_ms, acknowledged) \
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, false)",
    )
    .bind(&record.event_id)
    .bind(&record.equipment_id)
    .bind(&record.meter_id)
    .bind(&record.event_type)
    .bind(record.severity.as_str())
    .bind(&record.parameter)
    .bind(&record.message)
    .bind(record.value)
    .bind(record.threshold_value)
    .bind(record.ts_ms)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait::async_trait]
impl EventLogStore for PgEventLogStore {
    async fn create_event(&self, event: LogEvent) -> Result<LogEventRecord, StorageError> {
        let record = event.into_record(uuid::Uuid::new_v4().to_string());
        let mut conn = self.pool.acquire().await?;
        insert_event(&mut *conn, &record).await?;
        Ok(record)
    }

    async fn list_active_events(&self, limit: usize) -> Result<Vec<LogEventRecord>, StorageError> {
        let rows = sqlx::query(
            "select event_id, equipment_id, meter_id, event_type, severity, parameter, message, \
             value, threshold_value, ts_ms, acknowledged \
             from log_events \
             where acknowledged = false \
             order by case severity \
               when 'critical' then 3 \
               when 'high' then 2 \
               when 'warning' then 2 \
               when 'medium' then 1 \
               else 0 end desc, \
             ts_ms desc \
             limit $1",
        )
        .bind(clamp_limit(limit) as i64)
        .fetch_all(&self.pool)
        .await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let severity: String = row.try_get("severity")?;
            items.push(LogEventRecord {
                event_id: row.try_get("event_id")?,
                equipment_id: row.try_get("equipment_id")?,
                meter_id: row.try_get("meter_id")?,
                event_type: row.try_get("event_type")?,
                severity: parse_column("severity", &severity, Severity::parse)?,
                parameter: row.try_get("parameter")?,
                message: row.try_get("message")?,
                value: row.try_get("value")?,
                threshold_value: row.try_get("threshold_value")?,
                ts_ms: row.try_get("ts_ms")?,
                acknowledged: row.try_get("acknowledged")?,
            });
        }
        Ok(items)
    }

    async fn acknowledge_event(&self, event_id: &str) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "update log_events set acknowledged = true, \
             acknowledged_at_ms = (extract(epoch from now()) * 1000)::bigint \
             where event_id = $1 and acknowledged = false",
        )
        .bind(event_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
