//! 基础设施层：配置、日志、存储

pub mod config;
#[cfg(feature = "database")]
pub mod database;
pub mod logger;
pub mod memory;
pub mod store;
