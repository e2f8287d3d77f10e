//! 日志基础设施

use std::io;

use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use super::config::LoggingConfig;

/// 初始化日志系统
///
/// - `RUST_LOG` 优先，否则使用配置中的级别
/// - 控制台输出始终开启
/// - `file_output` 开启时额外写入按日期滚动的日志文件
///
/// 返回的 guard 必须在进程生命周期内持有，否则文件日志会丢失。
pub fn init_logging(config: &LoggingConfig) -> io::Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let console = fmt::layer().with_writer(io::stdout).with_ansi(true);

    let (file_layer, guard) = if config.file_output {
        std::fs::create_dir_all(&config.log_dir)?;

        let file_appender = rolling::daily(&config.log_dir, &config.file_prefix);
        let (writer, guard) = non_blocking(file_appender);
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false) // 文件中不使用颜色
            .with_target(false)
            .with_thread_names(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    Ok(guard)
}
