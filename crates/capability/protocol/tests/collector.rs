use async_trait::async_trait;
use domain::{DeviceClass, Equipment, EquipmentStatus, Meter, OperatingState};
use ems_protocol::codec::encode_f32;
use ems_protocol::{
    DeviceCollector, DeviceConnector, ProtocolError, RegisterMaps, RegisterReader,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 脚本化的假设备：寄存器内容、连接失败次数、链路故障次数均可预设。
#[derive(Default)]
struct FakeDevice {
    holding: Mutex<HashMap<u16, Vec<u16>>>,
    exceptions: Mutex<Vec<u16>>,
    inputs: Mutex<Vec<bool>>,
    failing_connects: AtomicUsize,
    failing_reads: AtomicUsize,
    connects: AtomicUsize,
}

impl FakeDevice {
    fn set_float(&self, address: u16, raw: f32) {
        self.holding
            .lock()
            .unwrap()
            .insert(address, encode_f32(raw).to_vec());
    }
}

struct FakeLink {
    device: Arc<FakeDevice>,
    alive: bool,
}

#[async_trait]
impl RegisterReader for FakeLink {
    fn is_alive(&self) -> bool {
        self.alive
    }

    async fn read_holding_registers(
        &mut self,
        _unit_id: u8,
        address: u16,
        _count: u16,
    ) -> Result<Vec<u16>, ProtocolError> {
        if self
            .device
            .failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            self.alive = false;
            return Err(ProtocolError::Modbus("broken pipe".to_string()));
        }
        if self.device.exceptions.lock().unwrap().contains(&address) {
            return Err(ProtocolError::Exception("IllegalDataAddress".to_string()));
        }
        self.device
            .holding
            .lock()
            .unwrap()
            .get(&address)
            .cloned()
            .ok_or_else(|| ProtocolError::Exception("IllegalDataAddress".to_string()))
    }

    async fn read_discrete_inputs(
        &mut self,
        _unit_id: u8,
        _address: u16,
        _count: u16,
    ) -> Result<Vec<bool>, ProtocolError> {
        Ok(self.device.inputs.lock().unwrap().clone())
    }
}

struct FakeConnector {
    device: Arc<FakeDevice>,
}

#[async_trait]
impl DeviceConnector for FakeConnector {
    async fn connect(
        &self,
        _equipment: &Equipment,
    ) -> Result<Box<dyn RegisterReader>, ProtocolError> {
        self.device.connects.fetch_add(1, Ordering::SeqCst);
        if self
            .device
            .failing_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ProtocolError::Connection("connection refused".to_string()));
        }
        Ok(Box::new(FakeLink {
            device: self.device.clone(),
            alive: true,
        }))
    }
}

fn equipment(class: DeviceClass) -> Equipment {
    Equipment {
        id: "eq-1".to_string(),
        name: "Compressor".to_string(),
        ip_address: "10.0.0.5".to_string(),
        port: 502,
        unit_id: 1,
        class,
        status: EquipmentStatus::Active,
        area_id: Some("area-1".to_string()),
    }
}

fn collector(device: &Arc<FakeDevice>, class: DeviceClass, meters: Vec<Meter>) -> DeviceCollector {
    DeviceCollector::new(
        equipment(class),
        meters,
        Arc::new(RegisterMaps::default()),
        Arc::new(FakeConnector {
            device: device.clone(),
        }),
    )
}

#[tokio::test]
async fn failed_register_omits_parameter() {
    let device = Arc::new(FakeDevice::default());
    device.set_float(0x0000, 200.0);
    device.set_float(0x0004, 23_000.0);
    device.exceptions.lock().unwrap().push(0x0002);

    let mut collector = collector(&device, DeviceClass::Meter, Vec::new());
    let poll = collector.poll(1_000).await.expect("poll");

    assert_eq!(poll.readings.len(), 1);
    let reading = &poll.readings[0];
    assert_eq!(reading.ts_ms, 1_000);
    assert_eq!(reading.area_id.as_deref(), Some("area-1"));
    assert!((reading.values.active_power.unwrap() - 0.2).abs() < 1e-9);
    assert!((reading.values.voltage_l1.unwrap() - 230.0).abs() < 1e-9);
    assert_eq!(reading.values.reactive_power, None);
    assert_eq!(reading.values.current_l1, None);
    assert!(poll.state.is_none());
}

#[tokio::test]
async fn connection_is_reused_across_polls() {
    let device = Arc::new(FakeDevice::default());
    device.set_float(0x0000, 1_000.0);

    let mut collector = collector(&device, DeviceClass::Meter, Vec::new());
    assert!(!collector.is_connected());
    collector.poll(1).await.expect("first");
    collector.poll(2).await.expect("second");

    assert!(collector.is_connected());
    assert_eq!(device.connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reconnects_once_after_connect_failure() {
    let device = Arc::new(FakeDevice::default());
    device.set_float(0x0000, 1_000.0);
    device.failing_connects.store(1, Ordering::SeqCst);

    let mut collector = collector(&device, DeviceClass::Meter, Vec::new());
    let poll = collector.poll(1).await.expect("poll after reconnect");

    assert_eq!(poll.readings.len(), 1);
    assert_eq!(device.connects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn link_fault_mid_read_triggers_reconnect() {
    let device = Arc::new(FakeDevice::default());
    device.set_float(0x0000, 5_000.0);
    device.failing_reads.store(1, Ordering::SeqCst);

    let mut collector = collector(&device, DeviceClass::Meter, Vec::new());
    let poll = collector.poll(1).await.expect("poll");

    assert!((poll.readings[0].values.active_power.unwrap() - 5.0).abs() < 1e-9);
    assert_eq!(device.connects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unreachable_device_reports_communication_error() {
    let device = Arc::new(FakeDevice::default());
    device.failing_connects.store(2, Ordering::SeqCst);

    let mut collector = collector(&device, DeviceClass::Meter, Vec::new());
    let err = collector.poll(7).await.expect_err("unreachable");

    assert_eq!(device.connects.load(Ordering::SeqCst), 2);
    let event = err.to_event(7);
    assert_eq!(event.equipment_id, "eq-1");
    assert_eq!(event.address, "10.0.0.5:502");
    assert!(event.message.contains("connection refused"));
    assert!(!collector.is_connected());
}

#[tokio::test]
async fn one_reading_per_meter_with_ratios() {
    let device = Arc::new(FakeDevice::default());
    device.set_float(0x000A, 1_500.0);
    device.set_float(0x0004, 10_000.0);

    let meters = vec![
        Meter::new("m-1", "eq-1"),
        Meter::new("m-2", "eq-1").with_ratios(40.0, 100.0),
    ];
    let mut collector = collector(&device, DeviceClass::Meter, meters);
    let poll = collector.poll(1).await.expect("poll");

    assert_eq!(poll.readings.len(), 2);
    let plain = &poll.readings[0];
    let scaled = &poll.readings[1];
    assert_eq!(plain.meter_id.as_deref(), Some("m-1"));
    assert!((plain.values.current_l1.unwrap() - 1.5).abs() < 1e-9);
    assert!((scaled.values.current_l1.unwrap() - 60.0).abs() < 1e-9);
    assert!((scaled.values.voltage_l1.unwrap() - 10_000.0).abs() < 1e-6);
}

#[tokio::test]
async fn controller_state_is_decoded() {
    let device = Arc::new(FakeDevice::default());
    device
        .holding
        .lock()
        .unwrap()
        .insert(0x0100, vec![0b0101, 17, 0, 0, 0, 0, 0, 0, 0, 0]);
    *device.inputs.lock().unwrap() = vec![true, false, true];

    let mut collector = collector(&device, DeviceClass::Controller, Vec::new());
    let poll = collector.poll(9).await.expect("poll");

    let state = poll.state.expect("state");
    assert_eq!(state.state, OperatingState::Running);
    assert_eq!(state.operation_code, Some(17));
    assert_eq!(state.discrete_inputs, vec![true, false, true]);
    assert!(poll.readings.is_empty());
}

#[tokio::test]
async fn controller_without_status_words_is_unknown() {
    let device = Arc::new(FakeDevice::default());

    let mut collector = collector(&device, DeviceClass::Controller, Vec::new());
    let poll = collector.poll(9).await.expect("poll");

    assert_eq!(poll.state.expect("state").state, OperatingState::Unknown);
}
