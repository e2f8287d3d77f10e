//! 请求日志中间件

use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{info, info_span, warn, Instrument};

use super::response::RequestId;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// 分配请求 ID、记录请求耗时，并把请求 ID 回写到响应头
pub async fn request_logging_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(|value| RequestId(value.to_string()))
        .unwrap_or_else(RequestId::generate);
    req.extensions_mut().insert(request_id.clone());

    let span = info_span!(
        "request",
        id = %request_id.0,
        method = %req.method(),
        path = %req.uri().path(),
    );
    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let start = Instant::now();

    let mut response = next.run(req).instrument(span.clone()).await;

    let status = response.status().as_u16();
    let elapsed_ms = start.elapsed().as_millis() as u64;
    span.in_scope(|| {
        if response.status().is_server_error() {
            warn!(status, elapsed_ms, user_agent = ?user_agent, "request failed");
        } else {
            info!(status, elapsed_ms, user_agent = ?user_agent, "request completed");
        }
    });

    if let Ok(value) = HeaderValue::from_str(&request_id.0) {
        response.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
    }
    response
}
