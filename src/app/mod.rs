//! 应用层：路由与共享状态

pub mod external;
pub mod import;
pub mod product;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::core::middleware::request_logging_middleware;
use crate::infrastructure::config::Config;
use crate::infrastructure::store::ProductStore;
use external::{handler::fetch_external_products, ExternalError, ExternalFeedClient};
use import::{
    handler::{bulk_import, download_template, upload_products},
    BatchReconciler, RecordNormalizer,
};
use product::{
    handler::{
        create_product, delete_bulk_keyed, delete_product, get_bulk_keyed, get_product,
        health_check, list_products, replace_bulk_keyed, replace_product,
    },
    ProductService,
};

const MANAGEMENT_PAGE: &str = "product-management.html";

#[derive(Clone)]
pub struct AppState {
    pub product_service: ProductService,
    pub reconciler: BatchReconciler,
    pub external: ExternalFeedClient,
}

impl AppState {
    pub fn new(store: Arc<dyn ProductStore>, config: &Config) -> Result<Self, ExternalError> {
        let normalizer = RecordNormalizer::new(config.import.aliases.clone());

        Ok(Self {
            product_service: ProductService::new(store.clone(), normalizer.clone()),
            reconciler: BatchReconciler::new(store, normalizer),
            external: ExternalFeedClient::new(
                config.external.clone(),
                Duration::from_secs(config.server.timeout_seconds),
            )?,
        })
    }
}

/// 创建路由
///
/// 外部产品源要分页拉取并重试，不受全局请求超时约束，改用 `external.timeout_seconds`。
pub fn create_routes(state: AppState, config: &Config) -> Router {
    let server = &config.server;

    let local = Router::new()
        .route("/health", get(health_check))
        // 单条记录 CRUD
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:key",
            get(get_product).put(replace_product).delete(delete_product),
        )
        // 批量导入；主键为 "bulk" 的产品也通过这条路径读写
        .route(
            "/products/bulk",
            post(bulk_import)
                .get(get_bulk_keyed)
                .put(replace_bulk_keyed)
                .delete(delete_bulk_keyed),
        )
        .route("/upload-products", post(upload_products))
        .route("/download-template", get(download_template))
        // 页面
        .route_service(
            "/product-management",
            ServeFile::new(server.public_dir.join(MANAGEMENT_PAGE)),
        )
        .fallback_service(ServeDir::new(&server.public_dir))
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(server.timeout_seconds)));

    let external = Router::new()
        .route("/external/products", get(fetch_external_products))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.external.timeout_seconds,
        )));

    local
        .merge(external)
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
