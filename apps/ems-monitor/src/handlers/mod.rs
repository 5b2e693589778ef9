//! Handlers 模块

pub mod collector;
pub mod events;
pub mod health;
pub mod metrics;
pub mod readings;
pub mod stats;

pub use collector::*;
pub use events::*;
pub use health::*;
pub use metrics::*;
pub use readings::*;
pub use stats::*;
