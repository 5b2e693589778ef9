//! 设备读取抽象
//!
//! 采集器只依赖这两个 trait；Modbus TCP 是其中一种实现，测试中可替换为脚本化的假设备。

use crate::error::ProtocolError;
use async_trait::async_trait;
use domain::Equipment;

/// 一条已建立的设备链路，同一时刻只属于一个采集器。
#[async_trait]
pub trait RegisterReader: Send {
    /// 链路是否仍可用（发生过传输错误后返回 false）。
    fn is_alive(&self) -> bool;

    async fn read_holding_registers(
        &mut self,
        unit_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ProtocolError>;

    async fn read_discrete_inputs(
        &mut self,
        unit_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<bool>, ProtocolError>;
}

/// 按设备配置建立链路。
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    async fn connect(&self, equipment: &Equipment) -> Result<Box<dyn RegisterReader>, ProtocolError>;
}
