//! 协议错误类型定义

use domain::{CommunicationError, Equipment};

/// 协议通信错误
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// 连接错误
    #[error("connection error: {0}")]
    Connection(String),

    /// IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Modbus 传输/帧错误
    #[error("modbus error: {0}")]
    Modbus(String),

    /// 从站返回的异常响应（寄存器级故障）
    #[error("modbus exception: {0}")]
    Exception(String),

    /// 配置解析错误
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// 数据解析错误
    #[error("data parse error: {0}")]
    DataParse(String),

    /// 超时错误
    #[error("timeout: {0}")]
    Timeout(String),
}

impl ProtocolError {
    /// 是否为链路级故障（需丢弃连接并重连）。
    ///
    /// 异常响应与数据解析错误只影响单个参数。
    pub fn is_link_fault(&self) -> bool {
        matches!(
            self,
            ProtocolError::Connection(_)
                | ProtocolError::Io(_)
                | ProtocolError::Modbus(_)
                | ProtocolError::Timeout(_)
        )
    }
}

/// 单台设备本周期采集失败（连接与一次重连均失败）。
#[derive(Debug, thiserror::Error)]
#[error("equipment {equipment_id} at {address} unreachable: {source}")]
pub struct CollectError {
    pub equipment_id: String,
    pub equipment_name: String,
    pub address: String,
    #[source]
    pub source: ProtocolError,
}

impl CollectError {
    pub fn new(equipment: &Equipment, source: ProtocolError) -> Self {
        Self {
            equipment_id: equipment.id.clone(),
            equipment_name: equipment.name.clone(),
            address: equipment.address(),
            source,
        }
    }

    /// 转换为通信故障日志事件。
    pub fn to_event(&self, ts_ms: i64) -> CommunicationError {
        CommunicationError {
            equipment_id: self.equipment_id.clone(),
            equipment_name: self.equipment_name.clone(),
            address: self.address.clone(),
            message: self.source.to_string(),
            ts_ms,
        }
    }
}
