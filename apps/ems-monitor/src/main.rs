//! 采集服务进程：后台轮询调度器 + 只读查询 HTTP 接口。

mod handlers;
mod middleware;
mod routes;
mod utils;

use ems_config::{AppConfig, SiteConfig, load_site_config};
use ems_normalize::Validator;
use ems_pipeline::{PollingScheduler, SchedulerConfig, StorageEquipmentSource, StorageSink};
use ems_protocol::{ModbusTcpConfig, ModbusTcpConnector, RegisterMaps};
use ems_storage::{
    CycleStore, EquipmentStore, EventLogStore, InMemoryCycleStore, InMemoryEquipmentStateStore,
    InMemoryEquipmentStore, InMemoryEventLogStore, InMemoryLatestReadingStore,
    InMemoryReadingStore, InMemoryThresholdStore, LatestReadingStore, PgCycleStore,
    PgEquipmentStore, PgEventLogStore, PgReadingStore, PgThresholdStore, ReadingStore,
    RedisLatestReadingStore, ThresholdStore, connect_pool,
};
use ems_telemetry::init_tracing;
use ems_threshold::{StorageThresholdSource, ThresholdEngine};
use std::sync::Arc;
use tracing::{info, warn};

/// Handler 共享状态。
#[derive(Clone)]
pub struct AppState {
    pub equipment: Arc<dyn EquipmentStore>,
    pub readings: Arc<dyn ReadingStore>,
    pub latest: Arc<dyn LatestReadingStore>,
    pub events: Arc<dyn EventLogStore>,
    pub scheduler: PollingScheduler,
}

/// 采集侧与查询侧共用的存储组合。
struct Stores {
    equipment: Arc<dyn EquipmentStore>,
    thresholds: Arc<dyn ThresholdStore>,
    readings: Arc<dyn ReadingStore>,
    events: Arc<dyn EventLogStore>,
    latest: Arc<dyn LatestReadingStore>,
    /// 采集周期的整批写入
    cycles: Arc<dyn CycleStore>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    init_tracing();

    let site = match &config.site_config_path {
        Some(path) => Some(load_site_config(path)?),
        None => None,
    };
    let maps = match site.as_ref().and_then(|site| site.registers.clone()) {
        Some(value) => RegisterMaps::from_value(value)?,
        None => RegisterMaps::default(),
    };
    let stores = open_stores(&config, site).await?;

    let thresholds = Arc::new(ThresholdEngine::new(
        Arc::new(StorageThresholdSource::new(stores.thresholds.clone())),
        config.threshold_cache_ttl(),
    ));
    let sink = StorageSink::new(stores.cycles.clone()).with_latest(stores.latest.clone());
    let connector = ModbusTcpConnector::new(ModbusTcpConfig {
        connect_timeout_ms: config.connect_timeout_ms,
        read_timeout_ms: config.read_timeout_ms,
    });
    let scheduler = PollingScheduler::new(
        SchedulerConfig {
            poll_interval: config.poll_interval(),
            error_backoff: config.cycle_error_backoff(),
        },
        Arc::new(StorageEquipmentSource::new(stores.equipment.clone())),
        Arc::new(connector),
        Arc::new(maps),
        Validator::default(),
        thresholds,
        Arc::new(sink),
    );

    if config.auto_start {
        scheduler.start();
    }

    let state = AppState {
        equipment: stores.equipment,
        readings: stores.readings,
        latest: stores.latest,
        events: stores.events,
        scheduler: scheduler.clone(),
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(addr = %config.http_addr, "http server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 等待进行中的周期落库后退出
    scheduler.shutdown().await;
    Ok(())
}

/// 配置了数据库则全部走 Postgres，否则由站点文件驱动内存存储。
///
/// 内存存储只适合演示与短时调试：读数、状态历史与事件按 `DEFAULT_*` 保留上限滚动丢弃，
/// 进程退出即丢失。
async fn open_stores(
    config: &AppConfig,
    site: Option<SiteConfig>,
) -> Result<Stores, Box<dyn std::error::Error>> {
    let latest: Arc<dyn LatestReadingStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisLatestReadingStore::connect(
            url,
            config.redis_latest_ttl_seconds,
        )?),
        None => Arc::new(InMemoryLatestReadingStore::new()),
    };

    if let Some(database_url) = &config.database_url {
        if site.is_some() {
            warn!("EMS_DATABASE_URL is set, site config only supplies register maps");
        }
        let pool = connect_pool(database_url).await?;
        return Ok(Stores {
            equipment: Arc::new(PgEquipmentStore::new(pool.clone())),
            thresholds: Arc::new(PgThresholdStore::new(pool.clone())),
            readings: Arc::new(PgReadingStore::new(pool.clone())),
            events: Arc::new(PgEventLogStore::new(pool.clone())),
            cycles: Arc::new(PgCycleStore::new(pool)),
            latest,
        });
    }

    let site = site.unwrap_or_default();
    info!(
        equipment = site.equipment.len(),
        meters = site.meters.len(),
        thresholds = site.thresholds.len(),
        "using in-memory storage seeded from site config"
    );
    let readings = Arc::new(InMemoryReadingStore::new());
    let events = Arc::new(InMemoryEventLogStore::new());
    let cycles = InMemoryCycleStore::new(
        readings.clone(),
        Arc::new(InMemoryEquipmentStateStore::new()),
        events.clone(),
    );
    Ok(Stores {
        equipment: Arc::new(InMemoryEquipmentStore::new(site.equipment, site.meters)),
        thresholds: Arc::new(InMemoryThresholdStore::new(site.thresholds)),
        readings,
        events,
        cycles: Arc::new(cycles),
        latest,
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
