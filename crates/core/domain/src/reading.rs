use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 已知物理参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    ActivePower,
    ReactivePower,
    ApparentPower,
    PowerFactor,
    VoltageL1,
    VoltageL2,
    VoltageL3,
    CurrentL1,
    CurrentL2,
    CurrentL3,
    Frequency,
}

impl Parameter {
    pub const ALL: [Parameter; 11] = [
        Parameter::ActivePower,
        Parameter::ReactivePower,
        Parameter::ApparentPower,
        Parameter::PowerFactor,
        Parameter::VoltageL1,
        Parameter::VoltageL2,
        Parameter::VoltageL3,
        Parameter::CurrentL1,
        Parameter::CurrentL2,
        Parameter::CurrentL3,
        Parameter::Frequency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::ActivePower => "active_power",
            Parameter::ReactivePower => "reactive_power",
            Parameter::ApparentPower => "apparent_power",
            Parameter::PowerFactor => "power_factor",
            Parameter::VoltageL1 => "voltage_l1",
            Parameter::VoltageL2 => "voltage_l2",
            Parameter::VoltageL3 => "voltage_l3",
            Parameter::CurrentL1 => "current_l1",
            Parameter::CurrentL2 => "current_l2",
            Parameter::CurrentL3 => "current_l3",
            Parameter::Frequency => "frequency",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Parameter::ALL.into_iter().find(|p| p.as_str() == value)
    }

    /// 分相参数所属的族名（`voltage` / `current`），其他参数为 `None`。
    pub fn family(&self) -> Option<&'static str> {
        match self {
            Parameter::VoltageL1 | Parameter::VoltageL2 | Parameter::VoltageL3 => Some("voltage"),
            Parameter::CurrentL1 | Parameter::CurrentL2 | Parameter::CurrentL3 => Some("current"),
            _ => None,
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Parameter::ActivePower => "kW",
            Parameter::ReactivePower => "kVAr",
            Parameter::ApparentPower => "kVA",
            Parameter::PowerFactor => "",
            Parameter::VoltageL1 | Parameter::VoltageL2 | Parameter::VoltageL3 => "V",
            Parameter::CurrentL1 | Parameter::CurrentL2 | Parameter::CurrentL3 => "A",
            Parameter::Frequency => "Hz",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 每个已知参数一个显式可选字段；`None` 表示未读到或已被置空。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_power: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactive_power: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apparent_power: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage_l1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage_l2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage_l3: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_l1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_l2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_l3: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
}

impl Measurements {
    pub fn get(&self, parameter: Parameter) -> Option<f64> {
        match parameter {
            Parameter::ActivePower => self.active_power,
            Parameter::ReactivePower => self.reactive_power,
            Parameter::ApparentPower => self.apparent_power,
            Parameter::PowerFactor => self.power_factor,
            Parameter::VoltageL1 => self.voltage_l1,
            Parameter::VoltageL2 => self.voltage_l2,
            Parameter::VoltageL3 => self.voltage_l3,
            Parameter::CurrentL1 => self.current_l1,
            Parameter::CurrentL2 => self.current_l2,
            Parameter::CurrentL3 => self.current_l3,
            Parameter::Frequency => self.frequency,
        }
    }

    pub fn set(&mut self, parameter: Parameter, value: Option<f64>) {
        let slot = match parameter {
            Parameter::ActivePower => &mut self.active_power,
            Parameter::ReactivePower => &mut self.reactive_power,
            Parameter::ApparentPower => &mut self.apparent_power,
            Parameter::PowerFactor => &mut self.power_factor,
            Parameter::VoltageL1 => &mut self.voltage_l1,
            Parameter::VoltageL2 => &mut self.voltage_l2,
            Parameter::VoltageL3 => &mut self.voltage_l3,
            Parameter::CurrentL1 => &mut self.current_l1,
            Parameter::CurrentL2 => &mut self.current_l2,
            Parameter::CurrentL3 => &mut self.current_l3,
            Parameter::Frequency => &mut self.frequency,
        };
        *slot = value;
    }

    /// 按固定顺序遍历已有值的参数。
    pub fn present(&self) -> impl Iterator<Item = (Parameter, f64)> + '_ {
        Parameter::ALL
            .into_iter()
            .filter_map(|p| self.get(p).map(|v| (p, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }

    /// 三相电压平均值（仅统计存在的相）。
    pub fn average_voltage(&self) -> Option<f64> {
        average([self.voltage_l1, self.voltage_l2, self.voltage_l3])
    }

    pub fn average_current(&self) -> Option<f64> {
        average([self.current_l1, self.current_l2, self.current_l3])
    }
}

fn average(values: [Option<f64>; 3]) -> Option<f64> {
    let present: Vec<f64> = values.into_iter().flatten().collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().sum::<f64>() / present.len() as f64)
}

/// 数据质量，`Bad > Poor > Good`。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    #[default]
    Good,
    Poor,
    Bad,
}

impl DataQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataQuality::Good => "good",
            DataQuality::Poor => "poor",
            DataQuality::Bad => "bad",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "good" => Some(DataQuality::Good),
            "poor" => Some(DataQuality::Poor),
            "bad" => Some(DataQuality::Bad),
            _ => None,
        }
    }

    /// 取两者中更差的一个。
    pub fn worst(self, other: DataQuality) -> DataQuality {
        self.max(other)
    }
}

/// 采集器输出的原始读数（单个表计、单个周期）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub ts_ms: i64,
    pub equipment_id: String,
    #[serde(default)]
    pub meter_id: Option<String>,
    #[serde(default)]
    pub area_id: Option<String>,
    #[serde(default)]
    pub values: Measurements,
    /// 厂商扩展字段，不参与校验与阈值判断。
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, f64>,
    #[serde(default)]
    pub quality: DataQuality,
}

impl RawReading {
    pub fn new(equipment_id: impl Into<String>, ts_ms: i64) -> Self {
        Self {
            ts_ms,
            equipment_id: equipment_id.into(),
            meter_id: None,
            area_id: None,
            values: Measurements::default(),
            extra: BTreeMap::new(),
            quality: DataQuality::Good,
        }
    }

    pub fn with_meter(mut self, meter_id: impl Into<String>) -> Self {
        self.meter_id = Some(meter_id.into());
        self
    }

    pub fn with_area(mut self, area_id: Option<String>) -> Self {
        self.area_id = area_id;
        self
    }

    pub fn with_value(mut self, parameter: Parameter, value: f64) -> Self {
        self.values.set(parameter, Some(value));
        self
    }
}

/// 校验后的读数：附带质量标记与异常描述。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedReading {
    pub ts_ms: i64,
    pub equipment_id: String,
    #[serde(default)]
    pub meter_id: Option<String>,
    #[serde(default)]
    pub area_id: Option<String>,
    #[serde(default)]
    pub values: Measurements,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, f64>,
    pub quality: DataQuality,
    #[serde(default)]
    pub anomalies: Vec<String>,
}

impl ValidatedReading {
    /// 直接接收原始读数（不做校验），质量沿用原值。
    pub fn accept(raw: RawReading) -> Self {
        Self {
            ts_ms: raw.ts_ms,
            equipment_id: raw.equipment_id,
            meter_id: raw.meter_id,
            area_id: raw.area_id,
            values: raw.values,
            extra: raw.extra,
            quality: raw.quality,
            anomalies: Vec::new(),
        }
    }

    /// 最新值缓存使用的键：表计优先，其次设备。
    pub fn series_key(&self) -> String {
        match &self.meter_id {
            Some(meter_id) => format!("{}:{}", self.equipment_id, meter_id),
            None => self.equipment_id.clone(),
        }
    }
}
