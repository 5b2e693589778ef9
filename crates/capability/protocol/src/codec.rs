//! 寄存器编解码
//!
//! 两个 16 位寄存器按大端拼接为 IEEE-754 单精度浮点，再按参数除以十进制系数，
//! 最后按表计互感器变比放大。纯函数，无 I/O。

use crate::error::ProtocolError;
use crate::register_map::RegisterPoint;
use domain::{Measurements, Meter, Parameter};

/// `(hi << 16) | lo` 按大端解释为 f32。
pub fn decode_f32(hi: u16, lo: u16) -> f32 {
    let bits = ((hi as u32) << 16) | lo as u32;
    f32::from_bits(bits)
}

/// `decode_f32` 的逆运算，返回 `[hi, lo]`。
pub fn encode_f32(value: f32) -> [u16; 2] {
    let bits = value.to_bits();
    [(bits >> 16) as u16, (bits & 0xFFFF) as u16]
}

/// 按寄存器点定义解码一个物理量。
pub fn decode_point(words: &[u16], point: &RegisterPoint) -> Result<f64, ProtocolError> {
    if words.len() < 2 {
        return Err(ProtocolError::DataParse(format!(
            "need 2 registers for {}, got {}",
            point.parameter,
            words.len()
        )));
    }
    let raw = decode_f32(words[0], words[1]) as f64;
    Ok(raw / point.divisor())
}

/// 变比为 1.0 时原样返回。
pub fn apply_ratio(value: f64, ratio: f64) -> f64 {
    if ratio != 1.0 { value * ratio } else { value }
}

/// 参数对应的变比：电流乘 CT，电压乘 VT，有功/无功/视在功率乘两者之积。
pub fn ratio_for(parameter: Parameter, meter: &Meter) -> f64 {
    match parameter {
        Parameter::CurrentL1 | Parameter::CurrentL2 | Parameter::CurrentL3 => meter.current_ratio,
        Parameter::VoltageL1 | Parameter::VoltageL2 | Parameter::VoltageL3 => meter.voltage_ratio,
        Parameter::ActivePower | Parameter::ReactivePower | Parameter::ApparentPower => {
            meter.current_ratio * meter.voltage_ratio
        }
        Parameter::PowerFactor | Parameter::Frequency => 1.0,
    }
}

/// 将一组解码值按表计变比换算为一次侧值。
pub fn scale_for_meter(values: &Measurements, meter: &Meter) -> Measurements {
    let mut scaled = values.clone();
    for (parameter, value) in values.present() {
        scaled.set(parameter, Some(apply_ratio(value, ratio_for(parameter, meter))));
    }
    scaled
}
