//! Postgres 读数实现
//!
//! `readings` 表每个已知参数一列（列名即参数名），厂商扩展字段与异常描述存为 JSON 文本。

use super::parse_column;
use crate::error::StorageError;
use crate::models::{ReadingQuery, TimeOrder};
use crate::traits::ReadingStore;
use crate::validation::sanitize_query;
use domain::{DataQuality, Measurements, Parameter, ValidatedReading};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use std::collections::BTreeMap;

pub struct PgReadingStore {
    pub pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = crate::connection::connect_pool(database_url).await?;
        Ok(Self { pool })
    }
}

fn parameter_columns() -> String {
    Parameter::ALL
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn insert_sql() -> String {
    // 前 7 个占位符为固定列，参数列从 $8 开始
    let placeholders = (0..Parameter::ALL.len())
        .map(|i| format!("${}", i + 8))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "insert into readings \
         (ts_ms, equipment_id, meter_id, area_id, quality, anomalies, extra, {}) \
         values ($1, $2, $3, $4, $5, $6, $7, {placeholders})",
        parameter_columns()
    )
}

/// `sql` 取自 `insert_sql()`，批量写入时只拼一次。
pub(crate) async fn insert_reading(
    conn: &mut PgConnection,
    sql: &str,
    reading: &ValidatedReading,
) -> Result<(), StorageError> {
    let mut query = sqlx::query(sql)
        .bind(reading.ts_ms)
        .bind(&reading.equipment_id)
        .bind(&reading.meter_id)
        .bind(&reading.area_id)
        .bind(reading.quality.as_str())
        .bind(serde_json::to_string(&reading.anomalies)?)
        .bind(serde_json::to_string(&reading.extra)?);
    for parameter in Parameter::ALL {
        query = query.bind(reading.values.get(parameter));
    }
    query.execute(conn).await?;
    Ok(())
}

fn reading_from_row(row: &PgRow) -> Result<ValidatedReading, StorageError> {
    let mut values = Measurements::default();
    for parameter in Parameter::ALL {
        let value: Option<f64> = row.try_get(parameter.as_str())?;
        values.set(parameter, value);
    }
    let quality: String = row.try_get("quality")?;
    let anomalies: String = row.try_get("anomalies")?;
    let extra: String = row.try_get("extra")?;
    Ok(ValidatedReading {
        ts_ms: row.try_get("ts_ms")?,
        equipment_id: row.try_get("equipment_id")?,
        meter_id: row.try_get("meter_id")?,
        area_id: row.try_get("area_id")?,
        values,
        extra: serde_json::from_str::<BTreeMap<String, f64>>(&extra)?,
        quality: parse_column("quality", &quality, DataQuality::parse)?,
        anomalies: serde_json::from_str(&anomalies)?,
    })
}

#[async_trait::async_trait]
impl ReadingStore for PgReadingStore {
    async fn write_readings(&self, readings: &[ValidatedReading]) -> Result<usize, StorageError> {
        if readings.is_empty() {
            return Ok(0);
        }
        let sql = insert_sql();
        let mut tx = self.pool.begin().await?;
        for reading in readings {
            insert_reading(&mut *tx, &sql, reading).await?;
        }
        tx.commit().await?;
        Ok(readings.len())
    }

    async fn query_readings(
        &self,
        query: ReadingQuery,
    ) -> Result<Vec<ValidatedReading>, StorageError> {
        let query = sanitize_query(query)?;
        let order_by = match query.order {
            TimeOrder::Asc => "asc",
            TimeOrder::Desc => "desc",
        };
        let sql = format!(
            "select ts_ms, equipment_id, meter_id, area_id, quality, anomalies, extra, {} \
             from readings \
             where ($1::bigint is null or ts_ms >= $1) \
             and ($2::bigint is null or ts_ms <= $2) \
             and ($3::text is null or equipment_id = $3) \
             and ($4::text is null or area_id = $4) \
             order by ts_ms {order_by}, reading_id {order_by} \
             limit $5 offset $6",
            parameter_columns()
        );
        let rows = sqlx::query(&sql)
            .bind(query.from_ms)
            .bind(query.to_ms)
            .bind(&query.equipment_id)
            .bind(&query.area_id)
            .bind(query.limit as i64)
            .bind(query.offset as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(reading_from_row).collect()
    }

    async fn ping(&self) -> Result<(), StorageError> {
        crate::connection::ping(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_binds_every_parameter_column() {
        let sql = insert_sql();
        assert!(sql.contains("frequency"));
        assert!(sql.contains(&format!("${}", 7 + Parameter::ALL.len())));
        assert!(!sql.contains(&format!("${}", 8 + Parameter::ALL.len())));
    }
}
