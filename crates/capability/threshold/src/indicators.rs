//! 设备能效指标：功率统计、负载率、功率因数、电压偏差、电量积分、低效模式。

use domain::{DataQuality, ValidatedReading};
use serde::{Deserialize, Serialize};

use crate::efficiency::{EfficiencyRating, classify_efficiency};

const LOW_LOAD_FACTOR: f64 = 0.30;
const LOW_POWER_FACTOR: f64 = 0.85;
const HIGH_POWER_VARIATION: f64 = 0.50;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// 一段时间内单台设备（或一组读数）的能效指标。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentIndicators {
    pub sample_count: usize,
    pub average_power: Option<f64>,
    pub max_power: Option<f64>,
    pub min_power: Option<f64>,
    pub power_std: Option<f64>,
    pub load_factor: Option<f64>,
    pub average_power_factor: Option<f64>,
    pub min_power_factor: Option<f64>,
    pub average_voltage: Option<f64>,
    pub voltage_deviation: Option<f64>,
    pub energy_kwh: f64,
    pub quality_score: f64,
    pub rating: EfficiencyRating,
}

/// 低效运行模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InefficiencyKind {
    LowLoadFactor,
    LowPowerFactor,
    HighPowerVariability,
}

impl InefficiencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InefficiencyKind::LowLoadFactor => "low_load_factor",
            InefficiencyKind::LowPowerFactor => "low_power_factor",
            InefficiencyKind::HighPowerVariability => "high_power_variability",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inefficiency {
    pub kind: InefficiencyKind,
    pub value: f64,
    pub description: String,
}

impl EquipmentIndicators {
    /// 读数无需预先排序。
    pub fn from_readings(readings: &[ValidatedReading]) -> Self {
        let power: Vec<f64> = readings.iter().filter_map(|r| r.values.active_power).collect();
        let power_factor: Vec<f64> = readings.iter().filter_map(|r| r.values.power_factor).collect();
        let voltage: Vec<f64> = readings
            .iter()
            .flat_map(|r| [r.values.voltage_l1, r.values.voltage_l2, r.values.voltage_l3])
            .flatten()
            .collect();

        let average_power = mean(&power);
        let max_power = max(&power);
        let load_factor = match (average_power, max_power) {
            (Some(avg), Some(max)) if max > 0.0 => Some(avg / max),
            _ => None,
        };
        let average_power_factor = mean(&power_factor);
        let quality_score = quality_score(readings);

        let rating = match (load_factor, average_power_factor) {
            (Some(load), Some(pf)) => classify_efficiency(load, pf, quality_score),
            _ => EfficiencyRating::InsufficientData,
        };

        Self {
            sample_count: readings.len(),
            average_power,
            max_power,
            min_power: min(&power),
            power_std: std_dev(&power),
            load_factor,
            average_power_factor,
            min_power_factor: min(&power_factor),
            average_voltage: mean(&voltage),
            voltage_deviation: std_dev(&voltage),
            energy_kwh: integrate_energy_kwh(readings),
            quality_score,
            rating,
        }
    }

    /// 负载率低于 30%、平均功率因数低于 0.85、功率变异系数高于 50% 时报告低效。
    pub fn inefficiencies(&self) -> Vec<Inefficiency> {
        let mut found = Vec::new();
        if let Some(load) = self.load_factor.filter(|load| *load < LOW_LOAD_FACTOR) {
            found.push(Inefficiency {
                kind: InefficiencyKind::LowLoadFactor,
                value: load,
                description: format!("low load factor: {:.1}%", load * 100.0),
            });
        }
        if let Some(pf) = self.average_power_factor.filter(|pf| *pf < LOW_POWER_FACTOR) {
            found.push(Inefficiency {
                kind: InefficiencyKind::LowPowerFactor,
                value: pf,
                description: format!("low power factor: {:.3}", pf),
            });
        }
        if let (Some(std), Some(avg)) = (self.power_std, self.average_power) {
            let variation = if avg > 0.0 { std / avg } else { 0.0 };
            if self.sample_count > 1 && variation > HIGH_POWER_VARIATION {
                found.push(Inefficiency {
                    kind: InefficiencyKind::HighPowerVariability,
                    value: variation,
                    description: format!("high power variability: {:.1}%", variation * 100.0),
                });
            }
        }
        found
    }
}

/// 区域汇总：区域内全部读数的电量、均值与质量。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaIndicators {
    pub area_id: String,
    pub equipment_count: usize,
    pub sample_count: usize,
    pub total_energy_kwh: f64,
    pub average_power: Option<f64>,
    pub average_power_factor: Option<f64>,
    pub quality_score: f64,
}

impl AreaIndicators {
    /// 只统计 `area_id` 匹配的读数。
    pub fn from_readings(area_id: &str, readings: &[ValidatedReading]) -> Self {
        let in_area: Vec<ValidatedReading> = readings
            .iter()
            .filter(|r| r.area_id.as_deref() == Some(area_id))
            .cloned()
            .collect();
        let equipment: std::collections::BTreeSet<&str> =
            in_area.iter().map(|r| r.equipment_id.as_str()).collect();
        let power: Vec<f64> = in_area.iter().filter_map(|r| r.values.active_power).collect();
        let power_factor: Vec<f64> = in_area.iter().filter_map(|r| r.values.power_factor).collect();

        Self {
            area_id: area_id.to_string(),
            equipment_count: equipment.len(),
            sample_count: in_area.len(),
            total_energy_kwh: integrate_energy_kwh(&in_area),
            average_power: mean(&power),
            average_power_factor: mean(&power_factor),
            quality_score: quality_score(&in_area),
        }
    }
}

/// 梯形法按实际时间差积分有功功率（kW → kWh）。
///
/// 同一表计的读数按时间排序后两两积分；缺少有功功率的读数不参与。
pub fn integrate_energy_kwh(readings: &[ValidatedReading]) -> f64 {
    let mut series: Vec<(&str, Option<&str>, i64, f64)> = readings
        .iter()
        .filter_map(|r| {
            r.values
                .active_power
                .map(|p| (r.equipment_id.as_str(), r.meter_id.as_deref(), r.ts_ms, p))
        })
        .collect();
    series.sort_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));

    series
        .windows(2)
        .filter(|pair| pair[0].0 == pair[1].0 && pair[0].1 == pair[1].1)
        .map(|pair| {
            let hours = (pair[1].2 - pair[0].2) as f64 / MS_PER_HOUR;
            (pair[0].3 + pair[1].3) / 2.0 * hours
        })
        .sum()
}

/// `good` 读数占比 × 100；无读数时为 0。
pub fn quality_score(readings: &[ValidatedReading]) -> f64 {
    if readings.is_empty() {
        return 0.0;
    }
    let good = readings
        .iter()
        .filter(|r| r.quality == DataQuality::Good)
        .count();
    good as f64 * 100.0 / readings.len() as f64
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

/// 总体标准差。
fn std_dev(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}
