//! 能源监测领域模型。
//!
//! 采集链路中各模块共享的数据结构：设备与表计配置、原始/校验后的读数、
//! 阈值与越限、日志事件、控制器运行状态。所有类型均为纯数据，不含 I/O。

pub mod equipment;
pub mod event;
pub mod reading;
pub mod threshold;

pub use equipment::{DeviceClass, Equipment, EquipmentStatus, Meter};
pub use event::{
    CommunicationError, EquipmentState, LogEvent, LogEventRecord, OperatingState, Severity,
    Violation, ViolationKind,
};
pub use reading::{DataQuality, Measurements, Parameter, RawReading, ValidatedReading};
pub use threshold::{Threshold, ThresholdScope};

/// 当前 Unix 毫秒时间戳。
pub fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
