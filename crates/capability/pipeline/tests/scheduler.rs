use async_trait::async_trait;
use domain::{DeviceClass, Equipment, EquipmentStatus, Meter, OperatingState, Severity, Threshold};
use ems_normalize::Validator;
use domain::{EquipmentState, LogEvent, LogEventRecord, ValidatedReading};
use ems_pipeline::{
    EquipmentSource, PipelineError, PollingScheduler, ReadingSink, SchedulerConfig,
    SchedulerState, SiteInventory, StorageEquipmentSource, StorageSink,
};
use ems_protocol::codec::encode_f32;
use ems_protocol::{DeviceConnector, ProtocolError, RegisterMaps, RegisterReader};
use ems_storage::{
    CycleBatch, CycleStore, EquipmentStateStore, EventLogStore, InMemoryCycleStore,
    InMemoryEquipmentStateStore, InMemoryEquipmentStore, InMemoryEventLogStore,
    InMemoryLatestReadingStore, InMemoryReadingStore, InMemoryThresholdStore, LatestReadingStore,
    ReadingQuery, ReadingStore, StorageError,
};
use ems_threshold::{StorageThresholdSource, ThresholdEngine};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 按 IP 区分的假设备寄存器；未登记的 IP 连接失败。
#[derive(Default)]
struct FakeSite {
    devices: Mutex<HashMap<String, HashMap<u16, Vec<u16>>>>,
}

impl FakeSite {
    fn set_float(&self, ip: &str, address: u16, raw: f32) {
        self.devices
            .lock()
            .unwrap()
            .entry(ip.to_string())
            .or_default()
            .insert(address, encode_f32(raw).to_vec());
    }

    fn set_words(&self, ip: &str, address: u16, words: Vec<u16>) {
        self.devices
            .lock()
            .unwrap()
            .entry(ip.to_string())
            .or_default()
            .insert(address, words);
    }
}

struct FakeLink {
    site: Arc<FakeSite>,
    ip: String,
}

#[async_trait]
impl RegisterReader for FakeLink {
    fn is_alive(&self) -> bool {
        true
    }

    async fn read_holding_registers(
        &mut self,
        _unit_id: u8,
        address: u16,
        _count: u16,
    ) -> Result<Vec<u16>, ProtocolError> {
        self.site
            .devices
            .lock()
            .unwrap()
            .get(&self.ip)
            .and_then(|registers| registers.get(&address).cloned())
            .ok_or_else(|| ProtocolError::Exception("IllegalDataAddress".to_string()))
    }

    async fn read_discrete_inputs(
        &mut self,
        _unit_id: u8,
        _address: u16,
        count: u16,
    ) -> Result<Vec<bool>, ProtocolError> {
        Ok(vec![false; count as usize])
    }
}

struct FakeConnector {
    site: Arc<FakeSite>,
}

#[async_trait]
impl DeviceConnector for FakeConnector {
    async fn connect(
        &self,
        equipment: &Equipment,
    ) -> Result<Box<dyn RegisterReader>, ProtocolError> {
        if !self
            .site
            .devices
            .lock()
            .unwrap()
            .contains_key(&equipment.ip_address)
        {
            return Err(ProtocolError::Connection("connection refused".to_string()));
        }
        Ok(Box::new(FakeLink {
            site: self.site.clone(),
            ip: equipment.ip_address.clone(),
        }))
    }
}

/// 第一次加载后可切换为失败。
struct FlakySource {
    inventory: SiteInventory,
    failing: AtomicBool,
}

#[async_trait]
impl EquipmentSource for FlakySource {
    async fn load(&self) -> Result<SiteInventory, PipelineError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PipelineError::Source("database unavailable".to_string()));
        }
        Ok(self.inventory.clone())
    }
}

fn equipment(id: &str, ip: &str, class: DeviceClass) -> Equipment {
    Equipment {
        id: id.to_string(),
        name: format!("Machine {id}"),
        ip_address: ip.to_string(),
        port: 502,
        unit_id: 1,
        class,
        status: EquipmentStatus::Active,
        area_id: Some("area-1".to_string()),
    }
}

/// 事件表不可写：含事件的批次整体失败，其余照常写入。
struct EventlessCycleStore {
    inner: InMemoryCycleStore,
}

#[async_trait]
impl CycleStore for EventlessCycleStore {
    async fn write_cycle(&self, batch: &CycleBatch) -> Result<Vec<LogEventRecord>, StorageError> {
        if !batch.events.is_empty() {
            return Err(StorageError::new("log_events unavailable"));
        }
        self.inner.write_cycle(batch).await
    }
}

#[derive(Clone, Copy)]
enum FirstSave {
    Panic,
    Fail,
}

/// 第一次 `save_cycle` panic 或报错，之后转交给真实出口。
struct FlakySink {
    inner: StorageSink,
    first: FirstSave,
    calls: AtomicUsize,
}

#[async_trait]
impl ReadingSink for FlakySink {
    async fn save_readings(&self, readings: &[ValidatedReading]) -> Result<usize, PipelineError> {
        self.inner.save_readings(readings).await
    }

    async fn save_equipment_state(
        &self,
        equipment_id: &str,
        state: &EquipmentState,
    ) -> Result<(), PipelineError> {
        self.inner.save_equipment_state(equipment_id, state).await
    }

    async fn create_log_event(&self, event: LogEvent) -> Result<(), PipelineError> {
        self.inner.create_log_event(event).await
    }

    async fn save_cycle(&self, batch: CycleBatch) -> Result<(), PipelineError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            match self.first {
                FirstSave::Panic => panic!("sink blew up"),
                FirstSave::Fail => {
                    return Err(PipelineError::Sink("database unavailable".to_string()));
                }
            }
        }
        self.inner.save_cycle(batch).await
    }
}

struct Harness {
    scheduler: PollingScheduler,
    readings: Arc<InMemoryReadingStore>,
    latest: Arc<InMemoryLatestReadingStore>,
    states: Arc<InMemoryEquipmentStateStore>,
    events: Arc<InMemoryEventLogStore>,
}

struct Stores {
    readings: Arc<InMemoryReadingStore>,
    latest: Arc<InMemoryLatestReadingStore>,
    states: Arc<InMemoryEquipmentStateStore>,
    events: Arc<InMemoryEventLogStore>,
}

impl Stores {
    fn new() -> Self {
        Self {
            readings: Arc::new(InMemoryReadingStore::new()),
            latest: Arc::new(InMemoryLatestReadingStore::new()),
            states: Arc::new(InMemoryEquipmentStateStore::new()),
            events: Arc::new(InMemoryEventLogStore::new()),
        }
    }

    fn cycle_store(&self) -> InMemoryCycleStore {
        InMemoryCycleStore::new(self.readings.clone(), self.states.clone(), self.events.clone())
    }

    fn sink(&self) -> StorageSink {
        StorageSink::new(Arc::new(self.cycle_store())).with_latest(self.latest.clone())
    }
}

fn harness(
    site: Arc<FakeSite>,
    source: Arc<dyn EquipmentSource>,
    thresholds: Vec<Threshold>,
    poll_interval: Duration,
) -> Harness {
    let stores = Stores::new();
    let sink = Arc::new(stores.sink());
    harness_with_sink(site, source, thresholds, poll_interval, stores, sink)
}

fn harness_with_sink(
    site: Arc<FakeSite>,
    source: Arc<dyn EquipmentSource>,
    thresholds: Vec<Threshold>,
    poll_interval: Duration,
    stores: Stores,
    sink: Arc<dyn ReadingSink>,
) -> Harness {
    let Stores {
        readings,
        latest,
        states,
        events,
    } = stores;
    let engine = ThresholdEngine::new(
        Arc::new(StorageThresholdSource::new(Arc::new(
            InMemoryThresholdStore::new(thresholds),
        ))),
        Duration::from_secs(300),
    );
    let scheduler = PollingScheduler::new(
        SchedulerConfig {
            poll_interval,
            error_backoff: poll_interval,
        },
        source,
        Arc::new(FakeConnector { site }),
        Arc::new(RegisterMaps::default()),
        Validator::default(),
        Arc::new(engine),
        sink,
    );
    Harness {
        scheduler,
        readings,
        latest,
        states,
        events,
    }
}

fn store_source(equipment: Vec<Equipment>, meters: Vec<Meter>) -> Arc<dyn EquipmentSource> {
    Arc::new(StorageEquipmentSource::new(Arc::new(
        InMemoryEquipmentStore::new(equipment, meters),
    )))
}

#[tokio::test]
async fn failing_device_does_not_block_others() {
    let site = Arc::new(FakeSite::default());
    site.set_float("10.0.0.1", 0x0000, 200.0);
    site.set_float("10.0.0.1", 0x0004, 23_000.0);
    let source = store_source(
        vec![
            equipment("eq-1", "10.0.0.1", DeviceClass::Meter),
            equipment("eq-2", "10.0.0.2", DeviceClass::Meter),
        ],
        Vec::new(),
    );
    let h = harness(site, source, Vec::new(), Duration::from_secs(5));

    let report = h.scheduler.run_cycle().await.expect("cycle");

    assert_eq!(report.devices_polled, 1);
    assert_eq!(report.devices_failed, 1);
    assert_eq!(report.communication_errors, 1);
    assert_eq!(report.readings, 1);

    let stored = h
        .readings
        .query_readings(ReadingQuery::default())
        .await
        .expect("query");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].equipment_id, "eq-1");
    assert_eq!(stored[0].ts_ms, report.ts_ms);
    assert!((stored[0].values.active_power.unwrap() - 0.2).abs() < 1e-9);

    let events = h.events.list_active_events(10).await.expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].equipment_id, "eq-2");
    assert_eq!(events[0].event_type, "communication_error");
    assert_eq!(events[0].severity, Severity::Warning);

    assert!(h.latest.get_latest("eq-1", None).await.expect("latest").is_some());
}

#[tokio::test]
async fn equipment_threshold_beats_area_threshold() {
    let site = Arc::new(FakeSite::default());
    // 1050 kW
    site.set_float("10.0.0.1", 0x0000, 1_050_000.0);
    let source = store_source(
        vec![equipment("eq-1", "10.0.0.1", DeviceClass::Meter)],
        Vec::new(),
    );
    let h = harness(
        site,
        source,
        vec![
            Threshold::for_area("area-1", "active_power").with_max(None, Some(1500.0)),
            Threshold::for_equipment("eq-1", "active_power").with_max(Some(900.0), Some(1000.0)),
        ],
        Duration::from_secs(5),
    );

    let report = h.scheduler.run_cycle().await.expect("cycle");
    assert_eq!(report.violations, 1);

    let events = h.events.list_active_events(10).await.expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "critical_max_exceeded");
    assert_eq!(events[0].severity, Severity::Critical);
    assert_eq!(events[0].threshold_value, Some(1000.0));

    // 1050 kW 超出合理性窗口：阈值看原始值，入库值被置空
    let stored = h
        .readings
        .query_readings(ReadingQuery::default())
        .await
        .expect("query");
    assert_eq!(stored[0].values.active_power, None);
    assert_eq!(stored[0].anomalies.len(), 1);
}

#[tokio::test]
async fn out_of_range_voltage_is_nulled() {
    let site = Arc::new(FakeSite::default());
    site.set_float("10.0.0.1", 0x0000, 10_000.0);
    site.set_float("10.0.0.1", 0x0004, 50_000.0);
    site.set_float("10.0.0.1", 0x0006, 23_000.0);
    let source = store_source(
        vec![equipment("eq-1", "10.0.0.1", DeviceClass::Meter)],
        Vec::new(),
    );
    let h = harness(site, source, Vec::new(), Duration::from_secs(5));

    let report = h.scheduler.run_cycle().await.expect("cycle");
    assert_eq!(report.bad_readings, 1);

    let stored = h
        .readings
        .query_readings(ReadingQuery::default())
        .await
        .expect("query");
    let reading = &stored[0];
    assert_eq!(reading.values.voltage_l1, None);
    assert_eq!(reading.values.voltage_l2, Some(230.0));
    assert_eq!(reading.anomalies.len(), 1);
    assert!(reading.anomalies[0].starts_with("voltage_l1"));
}

#[tokio::test]
async fn controller_state_is_saved_and_meters_scaled() {
    let site = Arc::new(FakeSite::default());
    site.set_words("10.0.0.9", 0x0100, vec![0x0001, 12, 0, 0, 0, 0, 0, 0, 0, 0]);
    site.set_float("10.0.0.9", 0x000A, 5_000.0);
    let source = store_source(
        vec![equipment("plc-1", "10.0.0.9", DeviceClass::Controller)],
        vec![Meter::new("m-1", "plc-1").with_ratios(40.0, 1.0)],
    );
    let h = harness(site, source, Vec::new(), Duration::from_secs(5));

    let report = h.scheduler.run_cycle().await.expect("cycle");
    assert_eq!(report.equipment_states, 1);

    let states = h.states.latest_states().await.expect("states");
    assert_eq!(states[0].equipment_id, "plc-1");
    assert_eq!(states[0].state.state, OperatingState::Running);
    assert_eq!(states[0].state.operation_code, Some(12));

    let stored = h
        .readings
        .query_readings(ReadingQuery::default())
        .await
        .expect("query");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].meter_id.as_deref(), Some("m-1"));
    // 5 A × 40
    assert!((stored[0].values.current_l1.unwrap() - 200.0).abs() < 1e-9);
}

#[tokio::test]
async fn config_failure_keeps_previous_configuration() {
    let site = Arc::new(FakeSite::default());
    site.set_float("10.0.0.1", 0x0000, 200.0);
    let source = Arc::new(FlakySource {
        inventory: SiteInventory {
            equipment: vec![equipment("eq-1", "10.0.0.1", DeviceClass::Meter)],
            meters: Vec::new(),
        },
        failing: AtomicBool::new(false),
    });
    let h = harness(site, source.clone(), Vec::new(), Duration::from_secs(5));

    let first = h.scheduler.run_cycle().await.expect("first cycle");
    source.failing.store(true, Ordering::SeqCst);
    let second = h.scheduler.run_cycle().await.expect("second cycle");

    assert_eq!(second.devices_polled, 1);
    assert!(second.ts_ms > first.ts_ms);
    assert_eq!(h.readings.len(), 2);
}

#[tokio::test]
async fn inactive_equipment_is_not_polled() {
    let site = Arc::new(FakeSite::default());
    let mut idle = equipment("eq-2", "10.0.0.2", DeviceClass::Meter);
    idle.status = EquipmentStatus::Inactive;
    let source = store_source(vec![idle], Vec::new());
    let h = harness(site, source, Vec::new(), Duration::from_secs(5));

    let report = h.scheduler.run_cycle().await.expect("cycle");
    assert_eq!(report.devices_polled + report.devices_failed, 0);
    assert!(h.events.list_active_events(10).await.expect("events").is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_wakes_the_interval_sleep() {
    let site = Arc::new(FakeSite::default());
    site.set_float("10.0.0.1", 0x0000, 200.0);
    let source = store_source(
        vec![equipment("eq-1", "10.0.0.1", DeviceClass::Meter)],
        Vec::new(),
    );
    // 间隔足够长，只有被唤醒才能及时退出
    let h = harness(site, source, Vec::new(), Duration::from_secs(3600));

    assert!(h.scheduler.start());
    assert!(!h.scheduler.start());
    assert_eq!(h.scheduler.state(), SchedulerState::Running);

    tokio::time::timeout(Duration::from_secs(5), async {
        while h.scheduler.last_report().is_none() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("first cycle");

    tokio::time::timeout(Duration::from_secs(5), h.scheduler.shutdown())
        .await
        .expect("stopped promptly");
    assert_eq!(h.scheduler.state(), SchedulerState::Idle);
    assert!(!h.scheduler.stop());
    assert_eq!(h.readings.len(), 1);
}

#[tokio::test]
async fn failed_event_write_persists_nothing_from_the_cycle() {
    let site = Arc::new(FakeSite::default());
    site.set_float("10.0.0.1", 0x0000, 200.0);
    let source = store_source(
        vec![
            equipment("eq-1", "10.0.0.1", DeviceClass::Meter),
            equipment("eq-2", "10.0.0.2", DeviceClass::Meter),
        ],
        Vec::new(),
    );
    let stores = Stores::new();
    let sink = StorageSink::new(Arc::new(EventlessCycleStore {
        inner: stores.cycle_store(),
    }))
    .with_latest(stores.latest.clone());
    let h = harness_with_sink(
        site,
        source,
        Vec::new(),
        Duration::from_secs(5),
        stores,
        Arc::new(sink),
    );

    let result = h.scheduler.run_cycle().await;

    assert!(matches!(result, Err(PipelineError::Sink(_))));
    assert!(h.readings.is_empty());
    assert!(h.events.all().is_empty());
    assert!(h.latest.list_latest().await.expect("latest").is_empty());
    assert!(h.scheduler.last_report().is_none());
}

fn looping_harness(first: FirstSave) -> (Harness, Arc<FlakySink>) {
    let site = Arc::new(FakeSite::default());
    site.set_float("10.0.0.1", 0x0000, 200.0);
    let source = store_source(
        vec![equipment("eq-1", "10.0.0.1", DeviceClass::Meter)],
        Vec::new(),
    );
    let stores = Stores::new();
    let sink = Arc::new(FlakySink {
        inner: stores.sink(),
        first,
        calls: AtomicUsize::new(0),
    });
    let h = harness_with_sink(
        site,
        source,
        Vec::new(),
        Duration::from_millis(20),
        stores,
        sink.clone(),
    );
    (h, sink)
}

async fn wait_for_saves(sink: &FlakySink, at_least: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while sink.calls.load(Ordering::SeqCst) < at_least {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("scheduler kept cycling");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_cycle_is_survived_by_the_loop() {
    let (h, sink) = looping_harness(FirstSave::Panic);

    assert!(h.scheduler.start());
    wait_for_saves(&sink, 2).await;
    assert_eq!(h.scheduler.state(), SchedulerState::Running);
    tokio::time::timeout(Duration::from_secs(5), async {
        while h.readings.is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("a later cycle persisted");

    tokio::time::timeout(Duration::from_secs(5), h.scheduler.shutdown())
        .await
        .expect("stopped promptly");
    assert_eq!(h.scheduler.state(), SchedulerState::Idle);

    // 可以再次启动
    assert!(h.scheduler.start());
    tokio::time::timeout(Duration::from_secs(5), h.scheduler.shutdown())
        .await
        .expect("stopped promptly");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_save_backs_off_and_the_next_cycle_runs() {
    let (h, sink) = looping_harness(FirstSave::Fail);

    assert!(h.scheduler.start());
    wait_for_saves(&sink, 2).await;
    tokio::time::timeout(Duration::from_secs(5), async {
        while h.scheduler.last_report().is_none() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("a cycle completed after the failure");

    tokio::time::timeout(Duration::from_secs(5), h.scheduler.shutdown())
        .await
        .expect("stopped promptly");
    assert!(!h.readings.is_empty());
    assert_eq!(h.scheduler.state(), SchedulerState::Idle);
}
