use serde::{Deserialize, Serialize};

/// 事件严重等级。`High` 与 `Warning` 同级。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Warning,
    Medium,
}

impl Severity {
    /// 排序权重，越大越严重。
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 3,
            Severity::High | Severity::Warning => 2,
            Severity::Medium => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Warning => "warning",
            Severity::Medium => "medium",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "warning" => Some(Severity::Warning),
            "medium" => Some(Severity::Medium),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    CriticalMaxExceeded,
    WarningMaxExceeded,
    CriticalMinExceeded,
    WarningMinExceeded,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::CriticalMaxExceeded => "critical_max_exceeded",
            ViolationKind::WarningMaxExceeded => "warning_max_exceeded",
            ViolationKind::CriticalMinExceeded => "critical_min_exceeded",
            ViolationKind::WarningMinExceeded => "warning_min_exceeded",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ViolationKind::CriticalMaxExceeded | ViolationKind::CriticalMinExceeded => {
                Severity::Critical
            }
            ViolationKind::WarningMaxExceeded | ViolationKind::WarningMinExceeded => Severity::High,
        }
    }
}

/// 阈值越限。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub equipment_id: String,
    pub meter_id: Option<String>,
    pub parameter: String,
    pub value: f64,
    pub threshold_value: f64,
    pub kind: ViolationKind,
    pub severity: Severity,
    pub message: String,
    pub ts_ms: i64,
}

/// 设备通信故障（连接与一次重连均失败）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicationError {
    pub equipment_id: String,
    pub equipment_name: String,
    pub address: String,
    pub message: String,
    pub ts_ms: i64,
}

impl CommunicationError {
    pub const SEVERITY: Severity = Severity::Warning;
}

/// 交给存储侧的日志事件。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
    Violation(Violation),
    CommunicationError(CommunicationError),
}

impl LogEvent {
    pub fn equipment_id(&self) -> &str {
        match self {
            LogEvent::Violation(v) => &v.equipment_id,
            LogEvent::CommunicationError(e) => &e.equipment_id,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            LogEvent::Violation(v) => v.severity,
            LogEvent::CommunicationError(_) => CommunicationError::SEVERITY,
        }
    }

    /// 事件类型名：越限为越限类别，通信故障为 `communication_error`。
    pub fn event_type(&self) -> &'static str {
        match self {
            LogEvent::Violation(v) => v.kind.as_str(),
            LogEvent::CommunicationError(_) => "communication_error",
        }
    }

    pub fn ts_ms(&self) -> i64 {
        match self {
            LogEvent::Violation(v) => v.ts_ms,
            LogEvent::CommunicationError(e) => e.ts_ms,
        }
    }

    /// 生成持久化记录（未确认）。
    pub fn into_record(self, event_id: impl Into<String>) -> LogEventRecord {
        let event_type = self.event_type().to_string();
        let severity = self.severity();
        match self {
            LogEvent::Violation(v) => LogEventRecord {
                event_id: event_id.into(),
                equipment_id: v.equipment_id,
                meter_id: v.meter_id,
                event_type,
                severity,
                parameter: Some(v.parameter),
                message: v.message,
                value: Some(v.value),
                threshold_value: Some(v.threshold_value),
                ts_ms: v.ts_ms,
                acknowledged: false,
            },
            LogEvent::CommunicationError(e) => LogEventRecord {
                event_id: event_id.into(),
                equipment_id: e.equipment_id,
                meter_id: None,
                event_type,
                severity,
                parameter: None,
                message: format!("{} ({}): {}", e.equipment_name, e.address, e.message),
                value: None,
                threshold_value: None,
                ts_ms: e.ts_ms,
                acknowledged: false,
            },
        }
    }
}

/// 存储中的日志事件，外部确认后结束生命周期。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEventRecord {
    pub event_id: String,
    pub equipment_id: String,
    pub meter_id: Option<String>,
    pub event_type: String,
    pub severity: Severity,
    pub parameter: Option<String>,
    pub message: String,
    pub value: Option<f64>,
    pub threshold_value: Option<f64>,
    pub ts_ms: i64,
    pub acknowledged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingState {
    Running,
    Stopped,
    Error,
    Idle,
    #[default]
    Unknown,
}

impl OperatingState {
    /// 由首个状态字解码，位优先级 running > stopped > error > idle。
    pub fn from_status_word(word: u16) -> Self {
        if word & 0x0001 != 0 {
            OperatingState::Running
        } else if word & 0x0002 != 0 {
            OperatingState::Stopped
        } else if word & 0x0004 != 0 {
            OperatingState::Error
        } else {
            OperatingState::Idle
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingState::Running => "running",
            OperatingState::Stopped => "stopped",
            OperatingState::Error => "error",
            OperatingState::Idle => "idle",
            OperatingState::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "running" => Some(OperatingState::Running),
            "stopped" => Some(OperatingState::Stopped),
            "error" => Some(OperatingState::Error),
            "idle" => Some(OperatingState::Idle),
            "unknown" => Some(OperatingState::Unknown),
            _ => None,
        }
    }
}

/// 控制器运行状态快照。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentState {
    pub ts_ms: i64,
    pub state: OperatingState,
    #[serde(default)]
    pub operation_code: Option<u16>,
    #[serde(default)]
    pub status_words: Vec<u16>,
    #[serde(default)]
    pub discrete_inputs: Vec<bool>,
}

impl EquipmentState {
    /// 从状态字与离散输入构造；状态字为空时状态为 `Unknown`。
    pub fn decode(ts_ms: i64, status_words: Vec<u16>, discrete_inputs: Vec<bool>) -> Self {
        let state = status_words
            .first()
            .map(|word| OperatingState::from_status_word(*word))
            .unwrap_or(OperatingState::Unknown);
        let operation_code = status_words.get(1).copied();
        Self {
            ts_ms,
            state,
            operation_code,
            status_words,
            discrete_inputs,
        }
    }
}
