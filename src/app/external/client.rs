//! 外部产品源客户端
//!
//! 逐页拉取 `{base_url}?page=N&limit=page_size`，返回的页短于 `page_size` 即为最后一页。
//! 429 与 5xx 在同一页上重试，连续重试次数有上限。

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::infrastructure::config::ExternalConfig;

const API_KEY_HEADER: &str = "API-Key";

#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("external feed not configured")]
    NotConfigured,

    #[error("request to external feed failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("external feed responded with status {status} on page {page}")]
    Status { page: u32, status: u16 },

    #[error("external feed still failing with status {status} on page {page} after {retries} retries")]
    RetriesExhausted { page: u32, status: u16, retries: u32 },

    #[error("invalid data format from external feed on page {0}")]
    InvalidPayload(u32),
}

#[derive(Clone)]
pub struct ExternalFeedClient {
    http: reqwest::Client,
    config: ExternalConfig,
}

impl ExternalFeedClient {
    pub fn new(config: ExternalConfig, timeout: Duration) -> Result<Self, ExternalError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, config })
    }

    /// 拉取全部页面并合并
    pub async fn fetch_all(&self) -> Result<Vec<Value>, ExternalError> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .ok_or(ExternalError::NotConfigured)?;
        let page_size = self.config.page_size;

        let mut products = Vec::new();
        let mut page = 1u32;
        let mut retries = 0u32;

        loop {
            debug!(page, limit = page_size, "fetching external page");

            let mut request = self
                .http
                .get(base_url)
                .query(&[("page", page), ("limit", page_size)]);
            if let Some(api_key) = &self.config.api_key {
                request = request.header(API_KEY_HEADER, api_key);
            }

            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if retries >= self.config.max_retries {
                    return Err(ExternalError::RetriesExhausted {
                        page,
                        status: status.as_u16(),
                        retries,
                    });
                }
                retries += 1;
                warn!(
                    page,
                    status = status.as_u16(),
                    attempt = retries,
                    "external feed throttled or failing, retrying"
                );
                sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                continue;
            }

            if !status.is_success() {
                return Err(ExternalError::Status {
                    page,
                    status: status.as_u16(),
                });
            }
            retries = 0;

            let items = match response.json::<Value>().await? {
                Value::Object(mut body) => match body.remove("data") {
                    Some(Value::Array(items)) => items,
                    _ => return Err(ExternalError::InvalidPayload(page)),
                },
                _ => return Err(ExternalError::InvalidPayload(page)),
            };

            let received = items.len();
            products.extend(items);
            debug!(page, received, total = products.len(), "external page received");

            if received < page_size as usize {
                break;
            }
            page += 1;
            sleep(Duration::from_millis(self.config.page_delay_ms)).await;
        }

        info!(total = products.len(), pages = page, "external feed fetched");
        Ok(products)
    }
}
