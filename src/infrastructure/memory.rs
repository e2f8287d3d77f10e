//! 内存存储
//!
//! 未配置数据库时使用，也用于测试。

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{ProductStore, StorageError};
use crate::app::product::model::{lookup_candidates, Product};

#[derive(Default)]
pub struct MemoryStore {
    products: RwLock<BTreeMap<String, Product>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置数据（历史数据导入、测试）
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products = products
            .into_iter()
            .map(|product| (product.key.clone(), product))
            .collect();
        Self {
            products: RwLock::new(products),
        }
    }

    pub async fn len(&self) -> usize {
        self.products.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.products.read().await.is_empty()
    }

    fn resolve<'a>(products: &'a BTreeMap<String, Product>, key: &str) -> Option<&'a Product> {
        lookup_candidates(key)
            .iter()
            .find_map(|candidate| products.get(candidate))
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn find_by_key(&self, key: &str) -> Result<Option<Product>, StorageError> {
        let products = self.products.read().await;
        Ok(Self::resolve(&products, key).cloned())
    }

    async fn upsert(&self, product: Product) -> Result<Product, StorageError> {
        let mut products = self.products.write().await;
        products.insert(product.key.clone(), product.clone());
        Ok(product)
    }

    async fn list(&self) -> Result<Vec<Product>, StorageError> {
        let products = self.products.read().await;
        Ok(products.values().cloned().collect())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let mut products = self.products.write().await;
        let stored_key = match Self::resolve(&products, key) {
            Some(product) => product.key.clone(),
            None => return Ok(false),
        };
        Ok(products.remove(&stored_key).is_some())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(key: &str, cost: f64) -> Product {
        Product {
            key: key.to_string(),
            description: String::new(),
            manufacturer: String::new(),
            cost,
            last_updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_find_prefers_exact_match() {
        let store = MemoryStore::with_products([product("123", 1.0), product("0123", 2.0)]);

        let found = store.find_by_key("0123").await.unwrap().unwrap();
        assert_eq!(found.cost, 2.0);
    }

    #[tokio::test]
    async fn test_find_by_numeric_literal() {
        // 历史数据以数字 123 写入
        let store = MemoryStore::with_products([product("123", 1.0)]);

        assert!(store.find_by_key("123").await.unwrap().is_some());
        assert!(store.find_by_key("123.0").await.unwrap().is_some());
        assert!(store.find_by_key("124").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let store = MemoryStore::new();
        store.upsert(product("A", 1.0)).await.unwrap();
        store.upsert(product("A", 3.0)).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.find_by_key("A").await.unwrap().unwrap().cost, 3.0);
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let store = MemoryStore::with_products([product("B", 1.0), product("A", 2.0)]);

        let keys: Vec<String> = store.list().await.unwrap().into_iter().map(|p| p.key).collect();
        assert_eq!(keys, vec!["A", "B"]);

        assert!(store.delete("A").await.unwrap());
        assert!(!store.delete("A").await.unwrap());
        assert_eq!(store.len().await, 1);
    }
}
