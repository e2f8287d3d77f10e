//! 外部产品源处理器

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::core::error::CoreError;

/// GET /external/products
pub async fn fetch_external_products(
    State(state): State<AppState>,
) -> Result<Json<Value>, CoreError> {
    let products = state.external.fetch_all().await?;

    Ok(Json(json!({
        "status": 200,
        "totalReturned": products.len(),
        "data": products,
    })))
}
