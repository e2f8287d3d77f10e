use std::path::PathBuf;

use product_inventory::infrastructure::{config::load_config, logger::init_logging};
use product_inventory::server::{start_server, BoxError};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // 可选的配置文件路径
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let (config, source) = load_config(config_path.as_deref())?;

    let _guard = init_logging(&config.logging)?;
    match &source {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    start_server(config).await.map_err(|e| {
        error!("Server error: {e}");
        e
    })
}
