use serde::{Deserialize, Serialize};

/// 阈值作用域，优先级 `Equipment > Area > Global`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdScope {
    Equipment,
    Area,
    Global,
}

impl ThresholdScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdScope::Equipment => "equipment",
            ThresholdScope::Area => "area",
            ThresholdScope::Global => "global",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "equipment" => Some(ThresholdScope::Equipment),
            "area" => Some(ThresholdScope::Area),
            "global" => Some(ThresholdScope::Global),
            _ => None,
        }
    }
}

/// 单个参数在某作用域下的告警边界；未设置的边界不参与判断。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub scope: ThresholdScope,
    /// 全局阈值为 `None`。
    #[serde(default)]
    pub scope_id: Option<String>,
    /// 参数名，可以是具体参数（`voltage_l1`）或分相族名（`voltage`）。
    pub parameter: String,
    #[serde(default)]
    pub warning_max: Option<f64>,
    #[serde(default)]
    pub critical_max: Option<f64>,
    #[serde(default)]
    pub warning_min: Option<f64>,
    #[serde(default)]
    pub critical_min: Option<f64>,
}

impl Threshold {
    pub fn global(parameter: impl Into<String>) -> Self {
        Self::new(ThresholdScope::Global, None, parameter)
    }

    pub fn for_area(area_id: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::new(ThresholdScope::Area, Some(area_id.into()), parameter)
    }

    pub fn for_equipment(equipment_id: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::new(ThresholdScope::Equipment, Some(equipment_id.into()), parameter)
    }

    fn new(scope: ThresholdScope, scope_id: Option<String>, parameter: impl Into<String>) -> Self {
        Self {
            scope,
            scope_id,
            parameter: parameter.into(),
            warning_max: None,
            critical_max: None,
            warning_min: None,
            critical_min: None,
        }
    }

    pub fn with_max(mut self, warning: Option<f64>, critical: Option<f64>) -> Self {
        self.warning_max = warning;
        self.critical_max = critical;
        self
    }

    pub fn with_min(mut self, warning: Option<f64>, critical: Option<f64>) -> Self {
        self.warning_min = warning;
        self.critical_min = critical;
        self
    }
}
