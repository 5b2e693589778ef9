//! 寄存器地址表
//!
//! 电能表：每个参数占 2 个保持寄存器（float32）。
//! 控制器：状态字（保持寄存器）+ 离散输入。
//!
//! ```json
//! {
//!   "meter": { "points": [ { "parameter": "active_power", "address": 0, "divisor": 1000.0 } ] },
//!   "controller": { "status_address": 256, "status_count": 10, "inputs_address": 512, "inputs_count": 16 }
//! }
//! ```

use crate::error::ProtocolError;
use domain::Parameter;
use serde::{Deserialize, Serialize};

/// 参数默认十进制系数：功率与电流 ÷1000，电压与频率 ÷100。
pub fn default_divisor(parameter: Parameter) -> f64 {
    match parameter {
        Parameter::VoltageL1 | Parameter::VoltageL2 | Parameter::VoltageL3 | Parameter::Frequency => {
            100.0
        }
        _ => 1000.0,
    }
}

fn default_point_count() -> u16 {
    2
}

/// 单个参数的寄存器位置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterPoint {
    pub parameter: Parameter,
    pub address: u16,
    #[serde(default = "default_point_count")]
    pub count: u16,
    /// 缺省时按参数取默认系数
    #[serde(default)]
    pub divisor: Option<f64>,
}

impl RegisterPoint {
    pub fn new(parameter: Parameter, address: u16) -> Self {
        Self {
            parameter,
            address,
            count: 2,
            divisor: None,
        }
    }

    pub fn divisor(&self) -> f64 {
        self.divisor.unwrap_or_else(|| default_divisor(self.parameter))
    }
}

/// 电能表寄存器表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterRegisterMap {
    pub points: Vec<RegisterPoint>,
}

impl Default for MeterRegisterMap {
    fn default() -> Self {
        let points = [
            (Parameter::ActivePower, 0x0000),
            (Parameter::ReactivePower, 0x0002),
            (Parameter::VoltageL1, 0x0004),
            (Parameter::VoltageL2, 0x0006),
            (Parameter::VoltageL3, 0x0008),
            (Parameter::CurrentL1, 0x000A),
            (Parameter::CurrentL2, 0x000C),
            (Parameter::CurrentL3, 0x000E),
            (Parameter::Frequency, 0x0010),
        ]
        .into_iter()
        .map(|(parameter, address)| RegisterPoint::new(parameter, address))
        .collect();
        Self { points }
    }
}

/// 控制器寄存器表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerRegisterMap {
    #[serde(default = "default_status_address")]
    pub status_address: u16,
    #[serde(default = "default_status_count")]
    pub status_count: u16,
    #[serde(default = "default_inputs_address")]
    pub inputs_address: u16,
    #[serde(default = "default_inputs_count")]
    pub inputs_count: u16,
}

fn default_status_address() -> u16 {
    0x0100
}

fn default_status_count() -> u16 {
    10
}

fn default_inputs_address() -> u16 {
    0x0200
}

fn default_inputs_count() -> u16 {
    16
}

impl Default for ControllerRegisterMap {
    fn default() -> Self {
        Self {
            status_address: default_status_address(),
            status_count: default_status_count(),
            inputs_address: default_inputs_address(),
            inputs_count: default_inputs_count(),
        }
    }
}

/// 全部设备类别的寄存器表
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterMaps {
    #[serde(default)]
    pub meter: MeterRegisterMap,
    #[serde(default)]
    pub controller: ControllerRegisterMap,
}

impl RegisterMaps {
    /// 从现场清单中的 JSON 片段解析
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProtocolError> {
        let maps: RegisterMaps =
            serde_json::from_value(value).map_err(|e| ProtocolError::ConfigParse(e.to_string()))?;
        for point in &maps.meter.points {
            if point.count < 2 {
                return Err(ProtocolError::ConfigParse(format!(
                    "{} needs at least 2 registers",
                    point.parameter
                )));
            }
            if !(point.divisor() > 0.0) {
                return Err(ProtocolError::ConfigParse(format!(
                    "{} divisor must be positive",
                    point.parameter
                )));
            }
        }
        Ok(maps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_meter_map_layout() {
        let map = MeterRegisterMap::default();
        let current = map
            .points
            .iter()
            .find(|p| p.parameter == Parameter::CurrentL1)
            .unwrap();
        assert_eq!(current.address, 0x000A);
        assert_eq!(current.divisor(), 1000.0);

        let frequency = map
            .points
            .iter()
            .find(|p| p.parameter == Parameter::Frequency)
            .unwrap();
        assert_eq!(frequency.divisor(), 100.0);
    }

    #[test]
    fn parse_override_keeps_controller_defaults() {
        let json = serde_json::json!({
            "meter": { "points": [ { "parameter": "active_power", "address": 100, "divisor": 10.0 } ] }
        });
        let maps = RegisterMaps::from_value(json).unwrap();
        assert_eq!(maps.meter.points.len(), 1);
        assert_eq!(maps.meter.points[0].divisor(), 10.0);
        assert_eq!(maps.controller.status_address, 0x0100);
    }

    #[test]
    fn reject_single_register_point() {
        let json = serde_json::json!({
            "meter": { "points": [ { "parameter": "frequency", "address": 16, "count": 1 } ] }
        });
        assert!(RegisterMaps::from_value(json).is_err());
    }
}
