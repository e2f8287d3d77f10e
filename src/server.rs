//! 服务启动：选择存储后端、绑定端口、优雅退出

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use crate::app::{create_routes, AppState};
use crate::infrastructure::config::{Config, DatabaseConfig};
use crate::infrastructure::memory::MemoryStore;
use crate::infrastructure::store::ProductStore;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 配置了数据库时使用 PostgreSQL，否则使用内存存储
pub async fn build_store(config: &DatabaseConfig) -> Result<Arc<dyn ProductStore>, BoxError> {
    match &config.url {
        #[cfg(feature = "database")]
        Some(url) => {
            let manager = crate::infrastructure::database::DatabaseManager::new(url, config).await?;
            manager.create_tables().await?;
            Ok(Arc::new(manager.into_store()))
        }
        #[cfg(not(feature = "database"))]
        Some(_) => {
            warn!("database url set but the `database` feature is disabled, using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        None => {
            info!("No database configured, using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

pub async fn start_server(config: Config) -> Result<(), BoxError> {
    info!("Initializing state...");
    let store = build_store(&config.database).await?;
    let state = AppState::new(store, &config)?;
    let app = create_routes(state, &config);

    let address = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on http://{address}");
    info!("   GET    /products            - list products");
    info!("   POST   /products            - create product");
    info!("   GET    /products/:key       - get product");
    info!("   PUT    /products/:key       - replace product");
    info!("   DELETE /products/:key       - delete product");
    info!("   POST   /products/bulk       - bulk import (JSON array)");
    info!("   POST   /upload-products     - bulk import (CSV file)");
    info!("   GET    /download-template   - CSV template");
    info!("   GET    /external/products   - external product feed");
    info!("   GET    /product-management  - management UI");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
