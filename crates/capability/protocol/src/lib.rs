//! # 设备通信能力模块
//!
//! 负责与现场设备（电能表、PLC）通信并产出原始读数：
//! - **codec**：寄存器字 → 物理量（float32 大端、十进制系数、互感器变比）
//! - **register_map**：电能表/控制器寄存器地址表
//! - **modbus_tcp**：基于 `tokio-modbus` 的链路实现
//! - **collector**：单设备采集器（懒连接、单次重连、部分读取容错）
//!
//! ## 架构设计
//!
//! ```text
//! Equipment + Meter 配置
//!       │
//!       ▼
//! DeviceCollector ──(DeviceConnector)──► RegisterReader (ModbusTcpReader)
//!       │
//!       ▼
//! DevicePoll { RawReading…, EquipmentState? }  /  CollectError
//!       │
//!       ▼
//! PollingScheduler → Validator → ThresholdEngine → Storage
//! ```
//!
//! ## 默认寄存器表
//!
//! | 参数 | 地址 | 系数 |
//! |------|------|------|
//! | active_power / reactive_power | 0x0000 / 0x0002 | ÷1000 |
//! | voltage_l1..l3 | 0x0004 / 0x0006 / 0x0008 | ÷100 |
//! | current_l1..l3 | 0x000A / 0x000C / 0x000E | ÷1000 |
//! | frequency | 0x0010 | ÷100 |
//! | 控制器状态字 / 离散输入 | 0x0100 (10) / 0x0200 (16) | - |

pub mod codec;
mod collector;
mod error;
mod modbus_tcp;
mod reader;
mod register_map;

pub use collector::{DeviceCollector, DevicePoll};
pub use error::{CollectError, ProtocolError};
pub use modbus_tcp::{ModbusTcpConfig, ModbusTcpConnector, ModbusTcpReader};
pub use reader::{DeviceConnector, RegisterReader};
pub use register_map::{
    default_divisor, ControllerRegisterMap, MeterRegisterMap, RegisterMaps, RegisterPoint,
};
