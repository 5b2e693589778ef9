//! 应用运行配置加载。
//!
//! - `AppConfig`：进程级参数，来自 `EMS_*` 环境变量。
//! - `SiteConfig`：现场设备、表计与阈值清单，来自 JSON 文件（无数据库时使用）。

use std::env;
use std::path::Path;
use std::time::Duration;

use domain::{Equipment, Meter, Threshold};
use serde::Deserialize;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("site config {0}: {1}")]
    Site(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub redis_latest_ttl_seconds: Option<u64>,
    pub site_config_path: Option<String>,
    pub poll_interval_ms: u64,
    pub cycle_error_backoff_ms: u64,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub threshold_cache_ttl_seconds: u64,
    pub auto_start: bool,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr = env::var("EMS_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let database_url = read_optional("EMS_DATABASE_URL");
        let redis_url = read_optional("EMS_REDIS_URL");
        let redis_latest_ttl_seconds =
            read_optional_u64("EMS_REDIS_LATEST_TTL_SECONDS")?.filter(|value| *value > 0);
        let site_config_path = read_optional("EMS_SITE_CONFIG");
        let poll_interval_ms = read_positive_u64("EMS_POLL_INTERVAL_MS", 5_000)?;
        let cycle_error_backoff_ms = read_u64_with_default("EMS_CYCLE_ERROR_BACKOFF_MS", 5_000)?;
        let connect_timeout_ms = read_positive_u64("EMS_CONNECT_TIMEOUT_MS", 3_000)?;
        let read_timeout_ms = read_positive_u64("EMS_READ_TIMEOUT_MS", 2_000)?;
        let threshold_cache_ttl_seconds =
            read_u64_with_default("EMS_THRESHOLD_CACHE_TTL_SECONDS", 300)?;
        let auto_start = read_bool_with_default("EMS_AUTO_START", true);

        if database_url.is_none() && site_config_path.is_none() {
            return Err(ConfigError::Missing(
                "EMS_DATABASE_URL or EMS_SITE_CONFIG".to_string(),
            ));
        }

        Ok(Self {
            http_addr,
            database_url,
            redis_url,
            redis_latest_ttl_seconds,
            site_config_path,
            poll_interval_ms,
            cycle_error_backoff_ms,
            connect_timeout_ms,
            read_timeout_ms,
            threshold_cache_ttl_seconds,
            auto_start,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn cycle_error_backoff(&self) -> Duration {
        Duration::from_millis(self.cycle_error_backoff_ms)
    }

    pub fn threshold_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.threshold_cache_ttl_seconds)
    }
}

/// 现场清单：设备、表计、阈值，以及可选的寄存器表覆盖（原样交给协议层解析）。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub equipment: Vec<Equipment>,
    #[serde(default)]
    pub meters: Vec<Meter>,
    #[serde(default)]
    pub thresholds: Vec<Threshold>,
    #[serde(default)]
    pub registers: Option<serde_json::Value>,
}

impl SiteConfig {
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        let config: SiteConfig = serde_json::from_str(source)
            .map_err(|err| ConfigError::Site("<inline>".to_string(), err.to_string()))?;
        config.check().map(|_| config)
    }

    /// 表计必须挂在已声明的设备下，设备 ID 不可重复。
    fn check(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for equipment in &self.equipment {
            if !seen.insert(equipment.id.as_str()) {
                return Err(ConfigError::Invalid(
                    "equipment.id".to_string(),
                    equipment.id.clone(),
                ));
            }
        }
        for meter in &self.meters {
            if !seen.contains(meter.equipment_id.as_str()) {
                return Err(ConfigError::Invalid(
                    "meters.equipment_id".to_string(),
                    meter.equipment_id.clone(),
                ));
            }
            if !(meter.current_ratio > 0.0 && meter.voltage_ratio > 0.0) {
                return Err(ConfigError::Invalid(
                    "meters.ratio".to_string(),
                    meter.id.clone(),
                ));
            }
        }
        Ok(())
    }
}

/// 读取 JSON 现场清单文件。
pub fn load_site_config(path: impl AsRef<Path>) -> Result<SiteConfig, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let source = std::fs::read_to_string(path)
        .map_err(|err| ConfigError::Site(display.clone(), err.to_string()))?;
    SiteConfig::from_json(&source).map_err(|err| match err {
        ConfigError::Site(_, message) => ConfigError::Site(display, message),
        other => other,
    })
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_positive_u64(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = read_u64_with_default(key, default)?;
    if value == 0 {
        return Err(ConfigError::Invalid(key.to_string(), "0".to_string()));
    }
    Ok(value)
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_optional_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(key.to_string(), value)),
        Err(_) => Ok(None),
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
