//! 配置管理
//!
//! 从 TOML 文件加载，找不到文件时使用默认值，随后应用环境变量覆盖。

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// 系统配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP 服务配置
    pub server: ServerConfig,
    /// 数据库配置
    pub database: DatabaseConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 批量导入配置
    pub import: ImportConfig,
    /// 外部产品源配置
    pub external: ExternalConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 绑定地址
    pub bind_address: String,
    /// HTTP 服务端口
    pub port: u16,
    /// 请求超时时间（秒）
    pub timeout_seconds: u64,
    /// 静态页面目录
    pub public_dir: PathBuf,
    /// 请求体上限（字节），包括 CSV 上传
    pub max_body_bytes: usize,
}

/// 数据库配置，未设置 `url` 时使用内存存储
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别 (trace, debug, info, warn, error)
    pub level: String,
    /// 日志目录
    pub log_dir: PathBuf,
    /// 日志文件名前缀
    pub file_prefix: String,
    /// 是否写入滚动日志文件
    pub file_output: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub aliases: FieldAliases,
}

/// 字段别名表：规范字段 → 可接受的输入字段名（大小写不敏感，按顺序优先）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldAliases {
    pub key: Vec<String>,
    pub description: Vec<String>,
    pub manufacturer: Vec<String>,
    pub cost: Vec<String>,
}

/// 外部产品源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub page_size: u32,
    /// 同一页连续重试的上限
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub page_delay_ms: u64,
    /// 整个代理请求（全部分页与重试）的时间上限（秒）
    pub timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            timeout_seconds: 30,
            public_dir: PathBuf::from("public"),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 20,
            min_connections: 1,
            acquire_timeout_seconds: 8,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            file_prefix: "inventory".to_string(),
            file_output: false,
        }
    }
}

impl Default for FieldAliases {
    fn default() -> Self {
        fn names(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }

        Self {
            key: names(&["key", "sku", "vp_code"]),
            description: names(&["description"]),
            manufacturer: names(&["manufacturer", "brand"]),
            cost: names(&["cost"]),
        }
    }
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            page_size: 200,
            max_retries: 5,
            retry_delay_ms: 2000,
            page_delay_ms: 300,
            timeout_seconds: 300,
        }
    }
}

impl Config {
    /// 从配置文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::FileRead(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(port) = env::var("PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| ConfigError::Validation(format!("invalid PORT value {port:?}: {e}")))?;
        }
        if let Ok(address) = env::var("BIND_ADDRESS") {
            self.server.bind_address = address;
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(api_key) = env::var("EXTERNAL_API_KEY") {
            self.external.api_key = Some(api_key);
        }
        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port must be greater than 0".to_string()));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Validation("server.max_body_bytes must be greater than 0".to_string()));
        }
        if self.server.bind_address.is_empty() {
            return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
        }

        let aliases = &self.import.aliases;
        for (field, names) in [
            ("key", &aliases.key),
            ("description", &aliases.description),
            ("manufacturer", &aliases.manufacturer),
            ("cost", &aliases.cost),
        ] {
            if names.iter().all(|name| name.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "import.aliases.{field} needs at least one field name"
                )));
            }
        }

        if self.external.page_size == 0 {
            return Err(ConfigError::Validation("external.page_size must be greater than 0".to_string()));
        }
        if self.external.timeout_seconds == 0 {
            return Err(ConfigError::Validation("external.timeout_seconds must be greater than 0".to_string()));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "invalid log level: {}, expected one of {:?}",
                self.logging.level, valid_levels
            )));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(String),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Validation(String),
}

/// 加载配置：显式路径优先，其次 `config.toml`、`./config/config.toml`，最后默认值
///
/// 同时返回实际读取的文件路径。此时日志尚未初始化，由调用方在初始化后记录。
pub fn load_config(explicit: Option<&Path>) -> Result<(Config, Option<PathBuf>), ConfigError> {
    let source = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => ["config.toml", "./config/config.toml"]
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists()),
    };

    let mut config = match &source {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    config.apply_env_overrides()?;
    config.validate()?;
    Ok((config, source))
}
