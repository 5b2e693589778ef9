//! 设备采集器
//!
//! 每台设备一个 `DeviceCollector`，独占该设备的链路：
//! - 首次轮询时才建立连接，之后跨周期复用；
//! - 每次轮询前检查链路，失效则丢弃重连；
//! - 链路故障时丢弃连接并重试一次，仍失败则本周期跳过该设备；
//! - 单个寄存器读取失败只丢弃对应参数，不补零。

use crate::codec;
use crate::error::{CollectError, ProtocolError};
use crate::reader::{DeviceConnector, RegisterReader};
use crate::register_map::{ControllerRegisterMap, MeterRegisterMap, RegisterMaps};
use domain::{DeviceClass, Equipment, EquipmentState, Measurements, Meter, RawReading};
use std::sync::Arc;
use tracing::{debug, warn};

/// 单台设备一次轮询的结果
#[derive(Debug, Clone, Default)]
pub struct DevicePoll {
    pub readings: Vec<RawReading>,
    pub state: Option<EquipmentState>,
}

pub struct DeviceCollector {
    equipment: Equipment,
    meters: Vec<Meter>,
    maps: Arc<RegisterMaps>,
    connector: Arc<dyn DeviceConnector>,
    link: Option<Box<dyn RegisterReader>>,
}

impl DeviceCollector {
    pub fn new(
        equipment: Equipment,
        meters: Vec<Meter>,
        maps: Arc<RegisterMaps>,
        connector: Arc<dyn DeviceConnector>,
    ) -> Self {
        Self {
            equipment,
            meters,
            maps,
            connector,
            link: None,
        }
    }

    pub fn equipment(&self) -> &Equipment {
        &self.equipment
    }

    pub fn is_connected(&self) -> bool {
        self.link.as_ref().is_some_and(|link| link.is_alive())
    }

    /// 配置刷新：地址未变时保留链路，否则下次轮询重新连接。
    pub fn update(&mut self, equipment: Equipment, meters: Vec<Meter>) {
        if !self.equipment.same_endpoint(&equipment) {
            self.link = None;
        }
        self.equipment = equipment;
        self.meters = meters;
    }

    /// 以周期时间戳轮询一次设备。
    pub async fn poll(&mut self, ts_ms: i64) -> Result<DevicePoll, CollectError> {
        match self.try_poll(ts_ms).await {
            Ok(poll) => Ok(poll),
            Err(first) => {
                warn!(
                    equipment_id = %self.equipment.id,
                    addr = %self.equipment.address(),
                    error = %first,
                    "device link failed, reconnecting once"
                );
                self.try_poll(ts_ms)
                    .await
                    .map_err(|source| CollectError::new(&self.equipment, source))
            }
        }
    }

    async fn try_poll(&mut self, ts_ms: i64) -> Result<DevicePoll, ProtocolError> {
        let mut link = match self.link.take() {
            Some(link) if link.is_alive() => link,
            _ => self.connector.connect(&self.equipment).await?,
        };

        let result = read_device(
            &self.equipment,
            &self.meters,
            &self.maps,
            link.as_mut(),
            ts_ms,
        )
        .await;
        if result.is_ok() && link.is_alive() {
            self.link = Some(link);
        }
        result
    }
}

/// 读取一台设备（只借用配置字段，不持有采集器本身）。
async fn read_device(
    equipment: &Equipment,
    meters: &[Meter],
    maps: &RegisterMaps,
    link: &mut dyn RegisterReader,
    ts_ms: i64,
) -> Result<DevicePoll, ProtocolError> {
    let mut poll = DevicePoll::default();
    let unit_id = equipment.unit_id;

    if equipment.class == DeviceClass::Controller {
        poll.state = Some(read_controller(link, unit_id, &maps.controller, ts_ms).await?);
    }

    if equipment.class == DeviceClass::Meter || !meters.is_empty() {
        let values = read_meter_block(link, unit_id, &maps.meter).await?;
        if values.is_empty() {
            warn!(equipment_id = %equipment.id, "no meter register could be read");
        } else {
            poll.readings = readings_from(equipment, meters, &values, ts_ms);
        }
    }

    Ok(poll)
}

/// 每个表计一条读数，各自套用变比；无表计配置时按 1:1 输出一条。
fn readings_from(
    equipment: &Equipment,
    meters: &[Meter],
    values: &Measurements,
    ts_ms: i64,
) -> Vec<RawReading> {
    let base = RawReading::new(equipment.id.clone(), ts_ms).with_area(equipment.area_id.clone());

    if meters.is_empty() {
        let mut reading = base;
        reading.values = values.clone();
        return vec![reading];
    }

    meters
        .iter()
        .map(|meter| {
            let mut reading = base.clone().with_meter(meter.id.clone());
            reading.values = codec::scale_for_meter(values, meter);
            reading
        })
        .collect()
}

/// 逐个参数读取；链路故障立即返回，其余故障只丢弃该参数。
async fn read_meter_block(
    link: &mut dyn RegisterReader,
    unit_id: u8,
    map: &MeterRegisterMap,
) -> Result<Measurements, ProtocolError> {
    let mut values = Measurements::default();
    for point in &map.points {
        let decoded = match link
            .read_holding_registers(unit_id, point.address, point.count)
            .await
        {
            Ok(words) => codec::decode_point(&words, point),
            Err(e) => Err(e),
        };
        match decoded {
            Ok(value) => values.set(point.parameter, Some(value)),
            Err(e) if e.is_link_fault() => return Err(e),
            Err(e) => {
                debug!(
                    parameter = %point.parameter,
                    register = point.address,
                    error = %e,
                    "register read failed, parameter omitted"
                );
            }
        }
    }
    Ok(values)
}

async fn read_controller(
    link: &mut dyn RegisterReader,
    unit_id: u8,
    map: &ControllerRegisterMap,
    ts_ms: i64,
) -> Result<EquipmentState, ProtocolError> {
    let status_words = match link
        .read_holding_registers(unit_id, map.status_address, map.status_count)
        .await
    {
        Ok(words) => words,
        Err(e) if e.is_link_fault() => return Err(e),
        Err(e) => {
            debug!(register = map.status_address, error = %e, "status words unavailable");
            Vec::new()
        }
    };

    let inputs = match link
        .read_discrete_inputs(unit_id, map.inputs_address, map.inputs_count)
        .await
    {
        Ok(bits) => bits,
        Err(e) if e.is_link_fault() => return Err(e),
        Err(e) => {
            debug!(register = map.inputs_address, error = %e, "discrete inputs unavailable");
            Vec::new()
        }
    };

    Ok(EquipmentState::decode(ts_ms, status_words, inputs))
}
