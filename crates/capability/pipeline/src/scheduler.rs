//! 周期轮询调度器
//!
//! 状态 `idle → running → idle`。停止是协作式的：设置标志并唤醒周期间的休眠，
//! 正在执行的周期照常完成。`abort` 用于强制关停，进行中的周期整体丢弃。
//!
//! 后台循环中每个周期在独立任务里执行：周期返回错误或 panic 都计为周期失败，
//! 退避 `error_backoff` 后继续下一个周期。

use crate::source::{EquipmentSource, SiteInventory};
use crate::{PipelineError, ReadingSink};
use domain::{DataQuality, LogEvent, RawReading, ValidatedReading, now_epoch_ms};
use ems_normalize::Validator;
use ems_protocol::{DeviceCollector, DeviceConnector, DevicePoll, RegisterMaps};
use ems_storage::{CycleBatch, EquipmentStateRecord};
use ems_threshold::{ThresholdEngine, evaluate_with};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub poll_interval: Duration,
    pub error_backoff: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5_000),
            error_backoff: Duration::from_millis(5_000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Running,
}

impl SchedulerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Running => "running",
        }
    }
}

/// 单个周期的汇总。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleReport {
    pub ts_ms: i64,
    pub devices_polled: usize,
    pub devices_failed: usize,
    pub readings: usize,
    pub poor_readings: usize,
    pub bad_readings: usize,
    pub equipment_states: usize,
    pub violations: usize,
    pub communication_errors: usize,
    pub duration_ms: u64,
}

/// 跨周期保留的工作集；同一时刻只有一个周期持有。
#[derive(Default)]
struct CycleState {
    inventory: SiteInventory,
    collectors: HashMap<String, DeviceCollector>,
    last_ts_ms: i64,
}

struct SchedulerInner {
    config: SchedulerConfig,
    source: Arc<dyn EquipmentSource>,
    connector: Arc<dyn DeviceConnector>,
    maps: Arc<RegisterMaps>,
    validator: Validator,
    thresholds: Arc<ThresholdEngine>,
    sink: Arc<dyn ReadingSink>,
    running: AtomicBool,
    generation: AtomicU64,
    wake: Notify,
    cycle: Mutex<CycleState>,
    last_report: RwLock<Option<CycleReport>>,
    task: StdMutex<Option<JoinHandle<()>>>,
}

/// 周期轮询调度器，可廉价克隆并在 HTTP 层共享。
#[derive(Clone)]
pub struct PollingScheduler {
    inner: Arc<SchedulerInner>,
}

impl PollingScheduler {
    pub fn new(
        config: SchedulerConfig,
        source: Arc<dyn EquipmentSource>,
        connector: Arc<dyn DeviceConnector>,
        maps: Arc<RegisterMaps>,
        validator: Validator,
        thresholds: Arc<ThresholdEngine>,
        sink: Arc<dyn ReadingSink>,
    ) -> Self {
        let inner = SchedulerInner {
            config,
            source,
            connector,
            maps,
            validator,
            thresholds,
            sink,
            running: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            wake: Notify::new(),
            cycle: Mutex::new(CycleState::default()),
            last_report: RwLock::new(None),
            task: StdMutex::new(None),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.inner.running.load(Ordering::SeqCst) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    pub fn last_report(&self) -> Option<CycleReport> {
        self.inner
            .last_report
            .read()
            .map(|report| report.clone())
            .unwrap_or(None)
    }

    pub fn thresholds(&self) -> &Arc<ThresholdEngine> {
        &self.inner.thresholds
    }

    /// 启动后台轮询；已在运行时返回 false。需在 tokio 运行时内调用。
    pub fn start(&self) -> bool {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return false;
        }
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = tokio::spawn(run_loop(self.inner.clone(), generation));
        let mut task = self
            .inner
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *task = Some(handle);
        info!(target: "ems.pipeline", generation, "polling scheduler started");
        true
    }

    /// 请求停止；未在运行时返回 false。当前周期会执行完毕。
    pub fn stop(&self) -> bool {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return false;
        }
        self.inner.wake.notify_waiters();
        info!(target: "ems.pipeline", "polling scheduler stop requested");
        true
    }

    /// 请求停止并等待后台任务退出。
    pub async fn shutdown(&self) {
        self.stop();
        let handle = self
            .inner
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(target: "ems.pipeline", error = %err, "scheduler task ended abnormally");
            }
        }
    }

    /// 强制关停：中止后台任务，进行中的周期不落库。
    pub fn abort(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.wake.notify_waiters();
        let handle = self
            .inner
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    /// 执行一个完整周期（后台循环与测试共用）。
    pub async fn run_cycle(&self) -> Result<CycleReport, PipelineError> {
        run_cycle(&self.inner).await
    }
}

/// 后台循环被 `abort` 中止时一并中止进行中的周期。
struct CycleTask(JoinHandle<Result<CycleReport, PipelineError>>);

impl Drop for CycleTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// 循环正常退出时运行标志已被 `stop` 清除或已换代；循环自身 panic 时由这里清除本代标志，
/// 之后 `start` 可以重新启动。
struct LoopGuard {
    inner: Arc<SchedulerInner>,
    generation: u64,
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        if std::thread::panicking()
            && self.inner.generation.load(Ordering::SeqCst) == self.generation
        {
            self.inner.running.store(false, Ordering::SeqCst);
        }
    }
}

async fn run_loop(inner: Arc<SchedulerInner>, generation: u64) {
    let _guard = LoopGuard {
        inner: inner.clone(),
        generation,
    };
    let is_current = |inner: &SchedulerInner| {
        inner.running.load(Ordering::SeqCst)
            && inner.generation.load(Ordering::SeqCst) == generation
    };

    while is_current(&inner) {
        // 周期在独立任务中执行，panic 只丢弃这一个周期
        let worker = inner.clone();
        let mut task = CycleTask(tokio::spawn(async move { run_cycle(&worker).await }));
        let delay = match (&mut task.0).await {
            Ok(Ok(_)) => inner.config.poll_interval,
            Ok(Err(err)) => {
                error!(target: "ems.pipeline", error = %err, "collection cycle failed");
                inner.config.error_backoff
            }
            Err(err) => {
                ems_telemetry::record_cycle_failed();
                error!(target: "ems.pipeline", error = %err, "collection cycle panicked");
                inner.config.error_backoff
            }
        };

        // 先登记唤醒再检查标志，避免错过 stop 的通知
        let wake = inner.wake.notified();
        tokio::pin!(wake);
        wake.as_mut().enable();
        if !is_current(&inner) {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = &mut wake => {}
        }
    }
    info!(target: "ems.pipeline", generation, "polling scheduler stopped");
}

async fn run_cycle(inner: &SchedulerInner) -> Result<CycleReport, PipelineError> {
    let started = Instant::now();
    let mut cycle = inner.cycle.lock().await;

    match inner.source.load().await {
        Ok(inventory) => cycle.inventory = inventory,
        Err(err) => warn!(
            target: "ems.pipeline",
            error = %err,
            equipment = cycle.inventory.equipment.len(),
            "equipment config refresh failed, keeping previous configuration"
        ),
    }
    inner.thresholds.refresh_if_stale().await;
    let thresholds = inner.thresholds.snapshot();

    let now = now_epoch_ms();
    let ts_ms = if now > cycle.last_ts_ms {
        now
    } else {
        cycle.last_ts_ms + 1
    };
    cycle.last_ts_ms = ts_ms;

    // 扇出：采集器移入各自任务，随结果一起交回
    let mut previous = std::mem::take(&mut cycle.collectors);
    let mut tasks = Vec::new();
    for equipment in cycle.inventory.active_equipment() {
        let meters = cycle.inventory.meters_for(&equipment.id);
        let mut collector = match previous.remove(&equipment.id) {
            Some(mut collector) => {
                collector.update(equipment.clone(), meters);
                collector
            }
            None => DeviceCollector::new(
                equipment.clone(),
                meters,
                inner.maps.clone(),
                inner.connector.clone(),
            ),
        };
        let handle = tokio::spawn(async move {
            let result = collector.poll(ts_ms).await;
            (collector, result)
        });
        tasks.push((equipment.id.clone(), handle));
    }
    // 已删除或停用设备的采集器在此释放链路
    drop(previous);

    // 汇合：逐个等待，单台设备的错误或 panic 不影响其他设备
    let mut report = CycleReport {
        ts_ms,
        ..CycleReport::default()
    };
    let mut raw_readings: Vec<RawReading> = Vec::new();
    let mut states: Vec<EquipmentStateRecord> = Vec::new();
    let mut events: Vec<LogEvent> = Vec::new();
    for (equipment_id, handle) in tasks {
        match handle.await {
            Ok((collector, Ok(DevicePoll { readings, state }))) => {
                cycle.collectors.insert(equipment_id.clone(), collector);
                ems_telemetry::record_device_poll(true);
                report.devices_polled += 1;
                debug!(
                    target: "ems.collect",
                    equipment_id = %equipment_id,
                    readings = readings.len(),
                    "device polled"
                );
                raw_readings.extend(readings);
                if let Some(state) = state {
                    states.push(EquipmentStateRecord {
                        equipment_id,
                        state,
                    });
                }
            }
            Ok((collector, Err(err))) => {
                cycle.collectors.insert(equipment_id.clone(), collector);
                ems_telemetry::record_device_poll(false);
                ems_telemetry::record_communication_error();
                report.devices_failed += 1;
                warn!(
                    target: "ems.collect",
                    equipment_id = %equipment_id,
                    error = %err,
                    "device skipped this cycle"
                );
                events.push(LogEvent::CommunicationError(err.to_event(ts_ms)));
                report.communication_errors += 1;
            }
            Err(err) => {
                ems_telemetry::record_device_poll(false);
                report.devices_failed += 1;
                error!(
                    target: "ems.collect",
                    equipment_id = %equipment_id,
                    error = %err,
                    "device task aborted, collector will be recreated"
                );
            }
        }
    }
    drop(cycle);

    // 阈值判定针对原始读数，校验针对同一批读数的副本
    let mut validated: Vec<ValidatedReading> = Vec::with_capacity(raw_readings.len());
    for raw in raw_readings {
        let violations = evaluate_with(&thresholds, &raw);
        report.violations += violations.len();
        events.extend(violations.into_iter().map(LogEvent::Violation));
        validated.push(inner.validator.validate(raw));
    }
    report.readings = validated.len();
    report.poor_readings = validated
        .iter()
        .filter(|r| r.quality == DataQuality::Poor)
        .count();
    report.bad_readings = validated
        .iter()
        .filter(|r| r.quality == DataQuality::Bad)
        .count();
    report.equipment_states = states.len();

    let batch = CycleBatch {
        readings: validated,
        states,
        events,
    };
    if let Err(err) = inner.sink.save_cycle(batch).await {
        ems_telemetry::record_cycle_failed();
        return Err(err);
    }

    report.duration_ms = started.elapsed().as_millis() as u64;
    ems_telemetry::record_readings(
        report.readings as u64,
        report.poor_readings as u64,
        report.bad_readings as u64,
    );
    ems_telemetry::record_violations(report.violations as u64);
    ems_telemetry::record_cycle_completed(report.duration_ms);
    info!(
        target: "ems.pipeline",
        ts_ms,
        devices = report.devices_polled,
        failed = report.devices_failed,
        readings = report.readings,
        violations = report.violations,
        duration_ms = report.duration_ms,
        "collection cycle completed"
    );

    *inner
        .last_report
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(report.clone());
    Ok(report)
}
