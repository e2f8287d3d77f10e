//! 存储抽象
//!
//! 业务层只依赖 [`ProductStore`]；具体实现见 `memory`（内存）与 `database`（PostgreSQL）。
//! 所有按主键的读取都遵循 [`crate::app::product::model::lookup_candidates`] 定义的查找规则。

use async_trait::async_trait;
use thiserror::Error;

use crate::app::product::model::Product;

/// 持久化错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("constraint violation: {0}")]
    Conflict(String),
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// 按查找规则获取产品
    async fn find_by_key(&self, key: &str) -> Result<Option<Product>, StorageError>;

    /// 不存在则插入，存在则整体替换（以 `product.key` 为准），单条原子写入
    async fn upsert(&self, product: Product) -> Result<Product, StorageError>;

    /// 全部产品，按主键排序
    async fn list(&self) -> Result<Vec<Product>, StorageError>;

    /// 按查找规则删除，返回是否删除了记录
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    async fn ping(&self) -> Result<(), StorageError>;

    /// 后端名称，用于健康检查
    fn backend(&self) -> &'static str;
}
