//! 批量导入处理器

use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    http::header,
    response::{IntoResponse, Json},
};
use serde_json::Value;
use tracing::info;

use super::csv_file::{decode_rows, TEMPLATE_CSV, TEMPLATE_FILE_NAME};
use super::reconciler::BatchResult;
use crate::app::AppState;
use crate::core::error::CoreError;

const UPLOAD_FIELD: &str = "file";

/// POST /products/bulk
pub async fn bulk_import(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BatchResult>, CoreError> {
    let Json(payload) = payload.map_err(|e| CoreError::BadRequest(e.body_text()))?;

    let items = match payload {
        Value::Array(items) if !items.is_empty() => items,
        _ => {
            return Err(CoreError::BadRequest(
                "Invalid products data: expected a non-empty JSON array".to_string(),
            ))
        }
    };

    info!(records = items.len(), "bulk import received");
    Ok(Json(state.reconciler.reconcile_json(items).await))
}

/// POST /upload-products（multipart，字段名 `file`）
pub async fn upload_products(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BatchResult>, CoreError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| CoreError::BadRequest(e.body_text()))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            let file_name = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| CoreError::BadRequest(e.body_text()))?;
            upload = Some((file_name, bytes));
            break;
        }
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| CoreError::BadRequest("No file uploaded".to_string()))?;

    let rows = decode_rows(&bytes)
        .map_err(|e| CoreError::BadRequest(format!("Error processing CSV file: {e}")))?;

    info!(
        file = file_name.as_deref().unwrap_or("<unnamed>"),
        bytes = bytes.len(),
        rows = rows.len(),
        "csv upload received"
    );
    Ok(Json(state.reconciler.reconcile(rows).await))
}

/// GET /download-template
pub async fn download_template() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={TEMPLATE_FILE_NAME}"),
            ),
        ],
        TEMPLATE_CSV,
    )
}
