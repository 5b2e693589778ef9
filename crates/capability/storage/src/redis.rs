//! Redis 最新读数实现
//!
//! 键格式：`reading:{equipment_id}:{meter_id}:latest`，无表计时 meter 段为 `-`。
//! 值为 `ValidatedReading` 的 JSON。

use crate::error::StorageError;
use crate::traits::LatestReadingStore;
use domain::ValidatedReading;
use redis::AsyncCommands;

const NO_METER: &str = "-";

fn latest_key(equipment_id: &str, meter_id: Option<&str>) -> String {
    format!(
        "reading:{}:{}:latest",
        equipment_id,
        meter_id.unwrap_or(NO_METER)
    )
}

/// Redis 最新读数存储
pub struct RedisLatestReadingStore {
    client: redis::Client,
    ttl_seconds: Option<u64>,
}

impl RedisLatestReadingStore {
    pub fn new(client: redis::Client, ttl_seconds: Option<u64>) -> Self {
        Self {
            client,
            ttl_seconds,
        }
    }

    /// `ttl_seconds` 为 0 或 None 时不过期
    pub fn connect(redis_url: &str, ttl_seconds: Option<u64>) -> Result<Self, StorageError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self::new(client, ttl_seconds.filter(|ttl| *ttl > 0)))
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StorageError> {
        Ok(self.client.get_multiplexed_tokio_connection().await?)
    }
}

#[async_trait::async_trait]
impl LatestReadingStore for RedisLatestReadingStore {
    async fn upsert_latest(&self, reading: &ValidatedReading) -> Result<(), StorageError> {
        let mut connection = self.connection().await?;
        let data = serde_json::to_string(reading)?;
        let key = latest_key(&reading.equipment_id, reading.meter_id.as_deref());
        match self.ttl_seconds {
            Some(ttl) => connection.set_ex::<_, _, ()>(key, data, ttl).await?,
            None => connection.set::<_, _, ()>(key, data).await?,
        }
        Ok(())
    }

    async fn get_latest(
        &self,
        equipment_id: &str,
        meter_id: Option<&str>,
    ) -> Result<Option<ValidatedReading>, StorageError> {
        let mut connection = self.connection().await?;
        let data: Option<String> = connection.get(latest_key(equipment_id, meter_id)).await?;
        let Some(data) = data else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&data)?))
    }

    async fn list_latest(&self) -> Result<Vec<ValidatedReading>, StorageError> {
        let mut connection = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut items = Vec::new();
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg("reading:*:latest")
                .arg("COUNT")
                .arg(100)
                .query_async(&mut connection)
                .await?;
            for key in keys {
                let data: Option<String> = connection.get(&key).await?;
                // 扫描与读取之间可能过期
                let Some(data) = data else {
                    continue;
                };
                items.push(serde_json::from_str::<ValidatedReading>(&data)?);
            }
            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }
        items.sort_by(|a, b| {
            (a.equipment_id.as_str(), a.meter_id.as_deref())
                .cmp(&(b.equipment_id.as_str(), b.meter_id.as_deref()))
        });
        Ok(items)
    }
}
