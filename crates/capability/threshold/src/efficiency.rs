use serde::{Deserialize, Serialize};

/// 低于该数据质量分（0–100）时不做能效评级。
pub const MIN_QUALITY_SCORE: f64 = 80.0;

/// 设备能效等级。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EfficiencyRating {
    Excellent,
    Good,
    Satisfactory,
    Poor,
    InsufficientData,
}

impl EfficiencyRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            EfficiencyRating::Excellent => "excellent",
            EfficiencyRating::Good => "good",
            EfficiencyRating::Satisfactory => "satisfactory",
            EfficiencyRating::Poor => "poor",
            EfficiencyRating::InsufficientData => "insufficient_data",
        }
    }
}

/// 按负载率（0–1）与平均功率因数评级，两项须同时达标。
pub fn classify_efficiency(load_factor: f64, power_factor: f64, quality_score: f64) -> EfficiencyRating {
    if !(quality_score >= MIN_QUALITY_SCORE) {
        return EfficiencyRating::InsufficientData;
    }
    const TIERS: [(f64, f64, EfficiencyRating); 3] = [
        (0.70, 0.90, EfficiencyRating::Excellent),
        (0.50, 0.85, EfficiencyRating::Good),
        (0.30, 0.80, EfficiencyRating::Satisfactory),
    ];
    TIERS
        .into_iter()
        .find(|(min_load, min_pf, _)| load_factor >= *min_load && power_factor >= *min_pf)
        .map(|(_, _, rating)| rating)
        .unwrap_or(EfficiencyRating::Poor)
}
