//! Modbus TCP 链路实现
//!
//! `ModbusTcpConnector` 按设备地址建立连接，`ModbusTcpReader` 包装
//! `tokio_modbus::client::Context`，每次读取都受超时约束。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let connector = ModbusTcpConnector::new(ModbusTcpConfig::default());
//! let mut link = connector.connect(&equipment).await?;
//! let words = link.read_holding_registers(1, 0x0000, 2).await?;
//! ```

use crate::error::ProtocolError;
use crate::reader::{DeviceConnector, RegisterReader};
use async_trait::async_trait;
use domain::Equipment;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::{error::Elapsed, timeout};
use tokio_modbus::prelude::*;
use tracing::{debug, info};

/// Modbus TCP 超时配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusTcpConfig {
    /// 连接超时（毫秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// 读取超时（毫秒）
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

fn default_connect_timeout() -> u64 {
    3000
}

fn default_read_timeout() -> u64 {
    2000
}

impl Default for ModbusTcpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            read_timeout_ms: default_read_timeout(),
        }
    }
}

/// Modbus TCP 连接器
#[derive(Debug, Clone, Default)]
pub struct ModbusTcpConnector {
    config: ModbusTcpConfig,
}

impl ModbusTcpConnector {
    pub fn new(config: ModbusTcpConfig) -> Self {
        Self { config }
    }

    async fn resolve(&self, target: &str) -> Result<SocketAddr, ProtocolError> {
        let limit = Duration::from_millis(self.config.connect_timeout_ms);
        let mut addrs = timeout(limit, tokio::net::lookup_host(target))
            .await
            .map_err(|_| ProtocolError::Timeout(format!("resolve {}", target)))??;
        addrs
            .next()
            .ok_or_else(|| ProtocolError::Connection(format!("no address for {}", target)))
    }
}

#[async_trait]
impl DeviceConnector for ModbusTcpConnector {
    async fn connect(&self, equipment: &Equipment) -> Result<Box<dyn RegisterReader>, ProtocolError> {
        let target = equipment.address();
        let addr = self.resolve(&target).await?;
        let limit = Duration::from_millis(self.config.connect_timeout_ms);

        let ctx = timeout(limit, tcp::connect_slave(addr, Slave(equipment.unit_id)))
            .await
            .map_err(|_| ProtocolError::Timeout(format!("connect {}", target)))?
            .map_err(|e| ProtocolError::Connection(format!("{}: {}", target, e)))?;

        info!(
            equipment_id = %equipment.id,
            addr = %addr,
            unit_id = equipment.unit_id,
            "connected to modbus device"
        );

        Ok(Box::new(ModbusTcpReader {
            ctx,
            peer: target,
            read_timeout: Duration::from_millis(self.config.read_timeout_ms),
            alive: true,
        }))
    }
}

/// 单台设备的 Modbus TCP 链路
pub struct ModbusTcpReader {
    ctx: tokio_modbus::client::Context,
    peer: String,
    read_timeout: Duration,
    alive: bool,
}

impl ModbusTcpReader {
    /// 展开 `超时 → 传输 → 异常码` 三层结果；前两层失败时标记链路失效。
    fn settle<T, X: Debug, E: Display>(
        &mut self,
        what: &str,
        response: Result<Result<Result<T, X>, E>, Elapsed>,
    ) -> Result<T, ProtocolError> {
        match response {
            Err(_) => {
                self.alive = false;
                Err(ProtocolError::Timeout(format!("{} {}", what, self.peer)))
            }
            Ok(Err(e)) => {
                self.alive = false;
                Err(ProtocolError::Modbus(format!("{} {}: {}", what, self.peer, e)))
            }
            Ok(Ok(Err(code))) => Err(ProtocolError::Exception(format!("{} {:?}", what, code))),
            Ok(Ok(Ok(value))) => Ok(value),
        }
    }
}

#[async_trait]
impl RegisterReader for ModbusTcpReader {
    fn is_alive(&self) -> bool {
        self.alive
    }

    async fn read_holding_registers(
        &mut self,
        unit_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ProtocolError> {
        self.ctx.set_slave(Slave(unit_id));
        let response = timeout(
            self.read_timeout,
            self.ctx.read_holding_registers(address, count),
        )
        .await;
        let words = self.settle("read holding registers", response)?;

        debug!(
            peer = %self.peer,
            unit_id,
            register = address,
            count,
            values = ?words,
            "read modbus registers"
        );
        Ok(words)
    }

    async fn read_discrete_inputs(
        &mut self,
        unit_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<bool>, ProtocolError> {
        self.ctx.set_slave(Slave(unit_id));
        let response = timeout(
            self.read_timeout,
            self.ctx.read_discrete_inputs(address, count),
        )
        .await;
        self.settle("read discrete inputs", response)
    }
}
