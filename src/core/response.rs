//! 响应封装与请求 ID

use std::convert::Infallible;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::Serialize;
use uuid::Uuid;

/// 请求 ID，由请求日志中间件写入请求扩展；客户端传入的 `x-request-id` 原样沿用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // 未经过中间件（例如单独挂载的处理器）时现场生成
        Ok(parts
            .extensions
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(RequestId::generate))
    }
}

/// 成功响应信封
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub request_id: String,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn new(RequestId(request_id): RequestId, data: T) -> Self {
        Self {
            success: true,
            data,
            request_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// 简单消息体，例如删除成功
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let response = ApiResponse::new(RequestId("req-1".into()), MessageBody::new("ok"));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["requestId"], "req-1");
        assert_eq!(json["data"]["message"], "ok");
    }
}
