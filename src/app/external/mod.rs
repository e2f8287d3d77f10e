//! 第三方产品源代理

pub mod client;
pub mod handler;

pub use client::{ExternalError, ExternalFeedClient};
