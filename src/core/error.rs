//! 核心错误处理模块

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, warn};

use crate::app::external::ExternalError;
use crate::infrastructure::store::StorageError;

/// 核心错误类型
#[derive(Debug)]
pub enum CoreError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    BadGateway(String),
    InternalServerError(String),
}

/// 错误响应体
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    pub code: u16,
    pub timestamp: String,
}

impl CoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            CoreError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Conflict(_) => StatusCode::CONFLICT,
            CoreError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            CoreError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 机器可读的错误码，与状态码一一对应
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::BadRequest(_) => "BAD_REQUEST",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::BadGateway(_) => "BAD_GATEWAY",
            CoreError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.code();
        let message = match self {
            CoreError::BadRequest(msg)
            | CoreError::NotFound(msg)
            | CoreError::Conflict(msg) => msg,
            CoreError::BadGateway(msg) => {
                warn!("Upstream error: {msg}");
                msg
            }
            CoreError::InternalServerError(msg) => {
                error!("Internal error: {msg}");
                msg
            }
        };

        let body = ErrorResponse {
            error,
            message,
            code: status.as_u16(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(msg) => CoreError::Conflict(msg),
            other => CoreError::InternalServerError(other.to_string()),
        }
    }
}

impl From<ExternalError> for CoreError {
    fn from(err: ExternalError) -> Self {
        CoreError::BadGateway(err.to_string())
    }
}
