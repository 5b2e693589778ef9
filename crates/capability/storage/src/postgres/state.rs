//! Postgres 控制器状态实现

use super::parse_column;
use crate::error::StorageError;
use crate::models::EquipmentStateRecord;
use crate::traits::EquipmentStateStore;
use domain::{EquipmentState, OperatingState};
use sqlx::{PgConnection, PgPool, Row};

pub struct PgEquipmentStateStore {
    pub pool: PgPool,
}

impl PgEquipmentStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) async fn insert_state(
    conn: &mut PgConnection,
    equipment_id: &str,
    state: &EquipmentState,
) -> Result<(), StorageError> {
    sqlx::query(
        "insert into equipment_states \
         (equipment_id, ts_ms, state, operation_code, status_words, discrete_inputs) \
         values ($1, $2, $3, $4, $5, $6)",
    )
    .bind(equipment_id)
    .bind(state.ts_ms)
    .bind(state.state.as_str())
    .bind(state.operation_code.map(i32::from))
    .bind(serde_json::to_string(&state.status_words)?)
    .bind(serde_json::to_string(&state.discrete_inputs)?)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait::async_trait]
impl EquipmentStateStore for PgEquipmentStateStore {
    async fn write_state(
        &self,
        equipment_id: &str,
        state: &EquipmentState,
    ) -> Result<(), StorageError> {
        let mut conn = self.pool.acquire().await?;
        insert_state(&mut *conn, equipment_id, state).await
    }

    async fn latest_states(&self) -> Result<Vec<EquipmentStateRecord>, StorageError> {
        let rows = sqlx::query(
            "select distinct on (equipment_id) \
             equipment_id, ts_ms, state, operation_code, status_words, discrete_inputs \
             from equipment_states \
             order by equipment_id, ts_ms desc",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let state: String = row.try_get("state")?;
            let operation_code: Option<i32> = row.try_get("operation_code")?;
            let status_words: String = row.try_get("status_words")?;
            let discrete_inputs: String = row.try_get("discrete_inputs")?;
            items.push(EquipmentStateRecord {
                equipment_id: row.try_get("equipment_id")?,
                state: EquipmentState {
                    ts_ms: row.try_get("ts_ms")?,
                    state: parse_column("state", &state, OperatingState::parse)?,
                    operation_code: operation_code.and_then(|code| u16::try_from(code).ok()),
                    status_words: serde_json::from_str(&status_words)?,
                    discrete_inputs: serde_json::from_str(&discrete_inputs)?,
                },
            });
        }
        Ok(items)
    }
}
