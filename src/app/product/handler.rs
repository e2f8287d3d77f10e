//! 产品处理器

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::Value;

use super::model::Product;
use crate::app::import::normalizer::RawRecord;
use crate::app::AppState;
use crate::core::error::CoreError;
use crate::core::response::{ApiResponse, MessageBody, RequestId};

/// 主键恰好是 "bulk" 的产品与批量导入共用 `/products/bulk` 路径
const BULK_PATH_KEY: &str = "bulk";

fn json_object(payload: Result<Json<Value>, JsonRejection>) -> Result<RawRecord, CoreError> {
    match payload.map_err(|e| CoreError::BadRequest(e.body_text()))? {
        Json(Value::Object(raw)) => Ok(raw),
        _ => Err(CoreError::BadRequest("expected a JSON object".to_string())),
    }
}

pub async fn list_products(
    State(state): State<AppState>,
    request_id: RequestId,
) -> Result<Json<ApiResponse<Vec<Product>>>, CoreError> {
    let products = state.product_service.list_products().await?;
    Ok(Json(ApiResponse::new(request_id, products)))
}

pub async fn get_product(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<Product>>, CoreError> {
    let product = state.product_service.get_product(&key).await?;
    Ok(Json(ApiResponse::new(request_id, product)))
}

pub async fn create_product(
    State(state): State<AppState>,
    request_id: RequestId,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>), CoreError> {
    let raw = json_object(payload)?;
    let product = state.product_service.create_product(&raw).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(request_id, product))))
}

pub async fn replace_product(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(key): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiResponse<Product>>, CoreError> {
    let raw = json_object(payload)?;
    let product = state.product_service.replace_product(&key, &raw).await?;
    Ok(Json(ApiResponse::new(request_id, product)))
}

pub async fn delete_product(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<MessageBody>>, CoreError> {
    state.product_service.delete_product(&key).await?;
    Ok(Json(ApiResponse::new(request_id, MessageBody::new("Product removed"))))
}

pub async fn get_bulk_keyed(
    state: State<AppState>,
    request_id: RequestId,
) -> Result<Json<ApiResponse<Product>>, CoreError> {
    get_product(state, request_id, Path(BULK_PATH_KEY.to_string())).await
}

pub async fn replace_bulk_keyed(
    state: State<AppState>,
    request_id: RequestId,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiResponse<Product>>, CoreError> {
    replace_product(state, request_id, Path(BULK_PATH_KEY.to_string()), payload).await
}

pub async fn delete_bulk_keyed(
    state: State<AppState>,
    request_id: RequestId,
) -> Result<Json<ApiResponse<MessageBody>>, CoreError> {
    delete_product(state, request_id, Path(BULK_PATH_KEY.to_string())).await
}

/// 健康检查
pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, CoreError> {
    let store = state.product_service.check_store().await?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "store": store,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}
