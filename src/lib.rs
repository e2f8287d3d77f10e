//! # 产品库存服务
//!
//! 基于 Axum 的产品库存 REST 服务，包括：
//! - 单条产品的增删改查
//! - JSON / CSV 批量导入（逐条插入或更新，单条失败不影响整批）
//! - 简单的浏览器管理页面
//! - 第三方产品源代理（分页拉取，有限次重试）
//!
//! 分层结构：`app`（路由、处理器、业务）、`core`（错误、响应、中间件）、
//! `infrastructure`（配置、日志、存储）。

pub mod app;
pub mod core;
pub mod infrastructure;
pub mod server;

pub use app::{create_routes, AppState};
pub use infrastructure::config::Config;
