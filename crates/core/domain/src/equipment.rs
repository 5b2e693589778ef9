use serde::{Deserialize, Serialize};

/// 设备类别：电能表或控制器（PLC）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Meter,
    #[serde(alias = "plc")]
    Controller,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Meter => "meter",
            DeviceClass::Controller => "controller",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "meter" => Some(DeviceClass::Meter),
            "controller" | "plc" => Some(DeviceClass::Controller),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    #[default]
    Active,
    Inactive,
}

impl EquipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentStatus::Active => "active",
            EquipmentStatus::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Some(EquipmentStatus::Active),
            "inactive" => Some(EquipmentStatus::Inactive),
            _ => None,
        }
    }
}

fn default_port() -> u16 {
    502
}

fn default_unit_id() -> u8 {
    1
}

/// 可轮询的现场设备。
///
/// 由配置源加载，每个采集周期刷新；采集链路只读不写。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: String,
    pub name: String,
    #[serde(alias = "ip")]
    pub ip_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
    #[serde(rename = "type", alias = "class")]
    pub class: DeviceClass,
    #[serde(default)]
    pub status: EquipmentStatus,
    #[serde(default)]
    pub area_id: Option<String>,
}

impl Equipment {
    pub fn is_active(&self) -> bool {
        self.status == EquipmentStatus::Active
    }

    /// `ip:port` 形式的网络地址。
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip_address, self.port)
    }

    /// 连接参数是否一致（地址或从站号变化时需重建连接）。
    pub fn same_endpoint(&self, other: &Equipment) -> bool {
        self.ip_address == other.ip_address
            && self.port == other.port
            && self.unit_id == other.unit_id
            && self.class == other.class
    }
}

fn default_ratio() -> f64 {
    1.0
}

/// 挂在设备下的计量点，带电流/电压互感器变比。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meter {
    pub id: String,
    pub equipment_id: String,
    #[serde(default = "default_ratio")]
    pub current_ratio: f64,
    #[serde(default = "default_ratio")]
    pub voltage_ratio: f64,
}

impl Meter {
    pub fn new(id: impl Into<String>, equipment_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            equipment_id: equipment_id.into(),
            current_ratio: 1.0,
            voltage_ratio: 1.0,
        }
    }

    pub fn with_ratios(mut self, current_ratio: f64, voltage_ratio: f64) -> Self {
        self.current_ratio = current_ratio;
        self.voltage_ratio = voltage_ratio;
        self
    }
}
