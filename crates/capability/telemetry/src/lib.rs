//! 日志初始化、请求 ID 与采集链路计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 采集链路计数器快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub devices_polled: u64,
    pub device_failures: u64,
    pub readings_collected: u64,
    pub readings_poor: u64,
    pub readings_bad: u64,
    pub violations: u64,
    pub communication_errors: u64,
    pub threshold_reloads: u64,
    pub threshold_reload_failures: u64,
    pub cycle_latency_ms_total: u64,
    pub cycle_latency_ms_count: u64,
}

impl MetricsSnapshot {
    /// 平均周期耗时（毫秒），尚无周期时为 0。
    pub fn average_cycle_latency_ms(&self) -> u64 {
        if self.cycle_latency_ms_count == 0 {
            return 0;
        }
        self.cycle_latency_ms_total / self.cycle_latency_ms_count
    }
}

/// 进程级计数器。
#[derive(Default)]
pub struct CollectorMetrics {
    cycles_completed: AtomicU64,
    cycles_failed: AtomicU64,
    devices_polled: AtomicU64,
    device_failures: AtomicU64,
    readings_collected: AtomicU64,
    readings_poor: AtomicU64,
    readings_bad: AtomicU64,
    violations: AtomicU64,
    communication_errors: AtomicU64,
    threshold_reloads: AtomicU64,
    threshold_reload_failures: AtomicU64,
    cycle_latency_ms_total: AtomicU64,
    cycle_latency_ms_count: AtomicU64,
}

impl CollectorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        MetricsSnapshot {
            cycles_completed: load(&self.cycles_completed),
            cycles_failed: load(&self.cycles_failed),
            devices_polled: load(&self.devices_polled),
            device_failures: load(&self.device_failures),
            readings_collected: load(&self.readings_collected),
            readings_poor: load(&self.readings_poor),
            readings_bad: load(&self.readings_bad),
            violations: load(&self.violations),
            communication_errors: load(&self.communication_errors),
            threshold_reloads: load(&self.threshold_reloads),
            threshold_reload_failures: load(&self.threshold_reload_failures),
            cycle_latency_ms_total: load(&self.cycle_latency_ms_total),
            cycle_latency_ms_count: load(&self.cycle_latency_ms_count),
        }
    }
}

static METRICS: OnceLock<CollectorMetrics> = OnceLock::new();

/// 全局计数器实例。
pub fn metrics() -> &'static CollectorMetrics {
    METRICS.get_or_init(CollectorMetrics::new)
}

/// 初始化 tracing（默认 info，`RUST_LOG` 覆盖）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录一个完成的采集周期及其耗时。
pub fn record_cycle_completed(latency_ms: u64) {
    let metrics = metrics();
    metrics.cycles_completed.fetch_add(1, Ordering::Relaxed);
    metrics
        .cycle_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .cycle_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}

pub fn record_cycle_failed() {
    metrics().cycles_failed.fetch_add(1, Ordering::Relaxed);
}

/// 记录单设备轮询结果。
pub fn record_device_poll(success: bool) {
    let metrics = metrics();
    metrics.devices_polled.fetch_add(1, Ordering::Relaxed);
    if !success {
        metrics.device_failures.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_readings(total: u64, poor: u64, bad: u64) {
    let metrics = metrics();
    metrics
        .readings_collected
        .fetch_add(total, Ordering::Relaxed);
    metrics.readings_poor.fetch_add(poor, Ordering::Relaxed);
    metrics.readings_bad.fetch_add(bad, Ordering::Relaxed);
}

pub fn record_violations(count: u64) {
    metrics().violations.fetch_add(count, Ordering::Relaxed);
}

pub fn record_communication_error() {
    metrics()
        .communication_errors
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录阈值缓存重载结果。
pub fn record_threshold_reload(success: bool) {
    let metrics = metrics();
    if success {
        metrics.threshold_reloads.fetch_add(1, Ordering::Relaxed);
    } else {
        metrics
            .threshold_reload_failures
            .fetch_add(1, Ordering::Relaxed);
    }
}
