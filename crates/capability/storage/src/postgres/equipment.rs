//! Postgres 设备配置实现

use super::parse_column;
use crate::error::StorageError;
use crate::traits::EquipmentStore;
use domain::{DeviceClass, Equipment, EquipmentStatus, Meter};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const EQUIPMENT_COLUMNS: &str =
    "equipment_id, name, ip_address, port, unit_id, device_class, status, area_id";

pub struct PgEquipmentStore {
    pub pool: PgPool,
}

impl PgEquipmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = crate::connection::connect_pool(database_url).await?;
        Ok(Self { pool })
    }
}

fn equipment_from_row(row: &PgRow) -> Result<Equipment, StorageError> {
    let port: i32 = row.try_get("port")?;
    let unit_id: i32 = row.try_get("unit_id")?;
    let class: String = row.try_get("device_class")?;
    let status: String = row.try_get("status")?;
    Ok(Equipment {
        id: row.try_get("equipment_id")?,
        name: row.try_get("name")?,
        ip_address: row.try_get("ip_address")?,
        port: u16::try_from(port).map_err(|_| StorageError::new(format!("invalid port: {port}")))?,
        unit_id: u8::try_from(unit_id)
            .map_err(|_| StorageError::new(format!("invalid unit_id: {unit_id}")))?,
        class: parse_column("device_class", &class, DeviceClass::parse)?,
        status: parse_column("status", &status, EquipmentStatus::parse)?,
        area_id: row.try_get("area_id")?,
    })
}

#[async_trait::async_trait]
impl EquipmentStore for PgEquipmentStore {
    async fn list_equipment(&self) -> Result<Vec<Equipment>, StorageError> {
        let sql = format!("select {EQUIPMENT_COLUMNS} from equipment order by equipment_id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(equipment_from_row).collect()
    }

    async fn find_equipment(&self, equipment_id: &str) -> Result<Option<Equipment>, StorageError> {
        let sql = format!("select {EQUIPMENT_COLUMNS} from equipment where equipment_id = $1");
        let row = sqlx::query(&sql)
            .bind(equipment_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(equipment_from_row).transpose()
    }

    async fn list_meters(&self) -> Result<Vec<Meter>, StorageError> {
        let rows = sqlx::query(
            "select meter_id, equipment_id, current_ratio, voltage_ratio \
             from meters order by equipment_id, meter_id",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut meters = Vec::with_capacity(rows.len());
        for row in rows {
            meters.push(Meter {
                id: row.try_get("meter_id")?,
                equipment_id: row.try_get("equipment_id")?,
                current_ratio: row.try_get("current_ratio")?,
                voltage_ratio: row.try_get("voltage_ratio")?,
            });
        }
        Ok(meters)
    }
}
