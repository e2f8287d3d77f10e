//! 数据库基础设施

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use super::config::DatabaseConfig;
use super::store::{ProductStore, StorageError};
use crate::app::product::model::{lookup_candidates, Product};

const PRODUCT_COLUMNS: &str = "product_key, description, manufacturer, cost, last_updated";

pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    pub async fn new(database_url: &str, config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        info!(
            "Connecting to database: {}",
            redact_url(database_url)
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// 创建产品表（不做迁移管理）
    pub async fn create_tables(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                product_key TEXT PRIMARY KEY CHECK (product_key <> ''),
                description TEXT NOT NULL DEFAULT '',
                manufacturer TEXT NOT NULL DEFAULT '',
                cost DOUBLE PRECISION NOT NULL DEFAULT 0,
                last_updated TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Database tables ready");
        Ok(())
    }

    pub fn into_store(self) -> PgProductStore {
        PgProductStore { pool: self.pool }
    }
}

/// PostgreSQL 产品存储
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn find_by_key(&self, key: &str) -> Result<Option<Product>, StorageError> {
        let query = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE product_key = ANY($1) \
             ORDER BY (product_key = $2) DESC LIMIT 1"
        );

        sqlx::query_as::<_, Product>(&query)
            .bind(lookup_candidates(key))
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn upsert(&self, product: Product) -> Result<Product, StorageError> {
        let query = format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (product_key) DO UPDATE SET \
                description = EXCLUDED.description, \
                manufacturer = EXCLUDED.manufacturer, \
                cost = EXCLUDED.cost, \
                last_updated = EXCLUDED.last_updated \
             RETURNING {PRODUCT_COLUMNS}"
        );

        sqlx::query_as::<_, Product>(&query)
            .bind(&product.key)
            .bind(&product.description)
            .bind(&product.manufacturer)
            .bind(product.cost)
            .bind(product.last_updated)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn list(&self) -> Result<Vec<Product>, StorageError> {
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY product_key");

        sqlx::query_as::<_, Product>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "DELETE FROM products WHERE product_key = ( \
                SELECT product_key FROM products \
                WHERE product_key = ANY($1) \
                ORDER BY (product_key = $2) DESC LIMIT 1)",
        )
        .bind(lookup_candidates(key))
        .bind(key)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    match err {
        // SQLSTATE 23xxx: 完整性约束
        sqlx::Error::Database(db)
            if db.code().map_or(false, |code| code.starts_with("23")) =>
        {
            StorageError::Conflict(db.message().to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StorageError::Unavailable(err.to_string())
        }
        other => StorageError::Database(other.to_string()),
    }
}

/// 日志中隐藏连接串里的密码
pub fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let credentials = &url[scheme_end + 3..at];
            match credentials.find(':') {
                Some(colon) => format!(
                    "{}{}:***{}",
                    &url[..scheme_end + 3],
                    &credentials[..colon],
                    &url[at..]
                ),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}
