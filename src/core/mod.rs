//! 核心层：错误处理、响应封装、中间件

pub mod error;
pub mod middleware;
pub mod response;
