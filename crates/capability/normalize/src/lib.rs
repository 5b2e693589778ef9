//! 读数校验：合理性窗口、派生量、交叉核对。
//!
//! 校验从不丢弃读数，只会：
//! - 把越界或非有限值置空，质量降为 `bad`；
//! - 视在功率与 `hypot(有功, 无功)` 不一致时质量降为 `poor`（不置空）；
//! - 补齐缺失的视在功率与功率因数。

use domain::{DataQuality, Parameter, RawReading, ValidatedReading};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 视在功率交叉核对容差（kVA）。
pub const APPARENT_POWER_TOLERANCE: f64 = 0.1;

/// 校验配置错误。
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("invalid range for {0}: min {1} > max {2}")]
    InvalidRange(String, f64, f64),
}

/// 闭区间 `[min, max]`。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// 收进区间内
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

/// 各物理量的合理性窗口。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlausibilityLimits {
    pub active_power: Range,
    pub reactive_power: Range,
    pub apparent_power: Range,
    pub power_factor: Range,
    pub voltage: Range,
    pub current: Range,
    pub frequency: Range,
}

impl Default for PlausibilityLimits {
    fn default() -> Self {
        Self {
            active_power: Range::new(0.0, 1000.0),
            reactive_power: Range::new(-1000.0, 1000.0),
            apparent_power: Range::new(0.0, 1500.0),
            power_factor: Range::new(0.0, 1.0),
            voltage: Range::new(100.0, 400.0),
            current: Range::new(0.0, 200.0),
            frequency: Range::new(45.0, 65.0),
        }
    }
}

impl PlausibilityLimits {
    pub fn range_for(&self, parameter: Parameter) -> Range {
        match parameter {
            Parameter::ActivePower => self.active_power,
            Parameter::ReactivePower => self.reactive_power,
            Parameter::ApparentPower => self.apparent_power,
            Parameter::PowerFactor => self.power_factor,
            Parameter::VoltageL1 | Parameter::VoltageL2 | Parameter::VoltageL3 => self.voltage,
            Parameter::CurrentL1 | Parameter::CurrentL2 | Parameter::CurrentL3 => self.current,
            Parameter::Frequency => self.frequency,
        }
    }

    fn check(&self) -> Result<(), NormalizeError> {
        for parameter in Parameter::ALL {
            let range = self.range_for(parameter);
            if !(range.min <= range.max) {
                return Err(NormalizeError::InvalidRange(
                    parameter.to_string(),
                    range.min,
                    range.max,
                ));
            }
        }
        Ok(())
    }
}

/// 读数校验器，纯同步、无共享状态。
#[derive(Debug, Clone, Default)]
pub struct Validator {
    limits: PlausibilityLimits,
}

impl Validator {
    pub fn new(limits: PlausibilityLimits) -> Result<Self, NormalizeError> {
        limits.check()?;
        Ok(Self { limits })
    }

    pub fn limits(&self) -> &PlausibilityLimits {
        &self.limits
    }

    pub fn validate(&self, raw: RawReading) -> ValidatedReading {
        let mut reading = ValidatedReading::accept(raw);

        for parameter in Parameter::ALL {
            let Some(value) = reading.values.get(parameter) else {
                continue;
            };
            let problem = if !value.is_finite() {
                "non-finite"
            } else if !self.limits.range_for(parameter).contains(value) {
                "out of range"
            } else {
                continue;
            };
            reading.values.set(parameter, None);
            flag(&mut reading, DataQuality::Bad, parameter, problem, value);
        }

        derive_apparent_power(&mut reading);
        derive_power_factor(&mut reading, self.limits.power_factor);

        if reading.quality != DataQuality::Good {
            debug!(
                equipment_id = %reading.equipment_id,
                quality = reading.quality.as_str(),
                anomalies = ?reading.anomalies,
                "reading downgraded"
            );
        }
        reading
    }

    pub fn validate_all(&self, readings: Vec<RawReading>) -> Vec<ValidatedReading> {
        readings.into_iter().map(|raw| self.validate(raw)).collect()
    }
}

fn flag(
    reading: &mut ValidatedReading,
    quality: DataQuality,
    parameter: Parameter,
    problem: &str,
    value: f64,
) {
    reading.quality = reading.quality.worst(quality);
    reading
        .anomalies
        .push(format!("{}: {} {}", parameter, problem, value));
}

/// 有功与无功都存在时，视在功率必须等于两者的模。
fn derive_apparent_power(reading: &mut ValidatedReading) {
    let (Some(active), Some(reactive)) = (reading.values.active_power, reading.values.reactive_power)
    else {
        return;
    };
    let expected = active.hypot(reactive);

    if let Some(supplied) = reading.values.apparent_power {
        if (expected - supplied).abs() > APPARENT_POWER_TOLERANCE {
            flag(
                reading,
                DataQuality::Poor,
                Parameter::ApparentPower,
                "inconsistent with active/reactive",
                supplied,
            );
            reading.values.apparent_power = Some(expected);
        }
    } else {
        reading.values.apparent_power = Some(expected);
    }
}

/// 派生值收进功率因数的合理性窗口，测量舍入导致的 P 略大于 S 不会得到大于 1 的值。
fn derive_power_factor(reading: &mut ValidatedReading, window: Range) {
    if reading.values.power_factor.is_some() {
        return;
    }
    if let (Some(active), Some(apparent)) = (reading.values.active_power, reading.values.apparent_power) {
        if apparent > 0.0 {
            reading.values.power_factor = Some(window.clamp(active / apparent));
        }
    }
}
