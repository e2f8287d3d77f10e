//! 产品业务服务（单条记录增删改查）

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::model::Product;
use crate::app::import::normalizer::{RawRecord, RecordNormalizer};
use crate::core::error::CoreError;
use crate::infrastructure::store::ProductStore;

const NOT_FOUND: &str = "Product not found";

#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn ProductStore>,
    normalizer: RecordNormalizer,
}

impl ProductService {
    pub fn new(store: Arc<dyn ProductStore>, normalizer: RecordNormalizer) -> Self {
        Self { store, normalizer }
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, CoreError> {
        Ok(self.store.list().await?)
    }

    pub async fn get_product(&self, key: &str) -> Result<Product, CoreError> {
        self.store
            .find_by_key(key.trim())
            .await?
            .ok_or_else(|| CoreError::NotFound(NOT_FOUND.to_string()))
    }

    /// 新建产品；请求体与批量导入一样经过规范化，主键已存在时返回冲突
    pub async fn create_product(&self, raw: &RawRecord) -> Result<Product, CoreError> {
        let record = self
            .normalizer
            .normalize(raw)
            .map_err(|e| CoreError::BadRequest(e.to_string()))?;

        if self.store.find_by_key(&record.key).await?.is_some() {
            return Err(CoreError::Conflict(
                "Product with this key already exists".to_string(),
            ));
        }

        let product = self
            .store
            .upsert(Product::from_record(record, Utc::now()))
            .await?;

        info!(key = %product.key, "product created");
        Ok(product)
    }

    /// 整体替换可选字段，缺失的字段回到默认值
    ///
    /// 请求体与批量导入一样经过规范化，旧格式字段名（`Description`、`Cost` 等）同样有效；
    /// 主键以路径为准，按查找规则命中时保留已存储的主键。
    pub async fn replace_product(&self, key: &str, raw: &RawRecord) -> Result<Product, CoreError> {
        let record = self
            .normalizer
            .normalize_with_key(key, raw)
            .map_err(|e| CoreError::BadRequest(e.to_string()))?;

        let mut product = self.get_product(&record.key).await?;
        product.replace(record, Utc::now());

        let product = self.store.upsert(product).await?;

        info!(key = %product.key, "product replaced");
        Ok(product)
    }

    pub async fn delete_product(&self, key: &str) -> Result<(), CoreError> {
        if !self.store.delete(key.trim()).await? {
            return Err(CoreError::NotFound(NOT_FOUND.to_string()));
        }

        info!(key = %key, "product deleted");
        Ok(())
    }

    /// 存储健康检查，返回后端名称
    pub async fn check_store(&self) -> Result<&'static str, CoreError> {
        self.store.ping().await?;
        Ok(self.store.backend())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::MemoryStore;
    use serde_json::json;

    fn service() -> ProductService {
        ProductService::new(Arc::new(MemoryStore::new()), RecordNormalizer::default())
    }

    fn raw(value: serde_json::Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_then_conflict() {
        let service = service();

        let product = service
            .create_product(&raw(json!({"Sku": 42, "Cost": "3.5"})))
            .await
            .unwrap();
        assert_eq!(product.key, "42");
        assert_eq!(product.cost, 3.5);

        let err = service
            .create_product(&raw(json!({"key": "42.0"})))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_requires_key() {
        let err = service()
            .create_product(&raw(json!({"description": "no key"})))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::BadRequest(msg) if msg == "missing key"));
    }

    #[tokio::test]
    async fn test_replace_resets_missing_fields() {
        let service = service();
        service
            .create_product(&raw(json!({"key": "A", "manufacturer": "X", "cost": 9})))
            .await
            .unwrap();

        let product = service
            .replace_product("A", &raw(json!({"description": "New"})))
            .await
            .unwrap();

        assert_eq!(product.description, "New");
        assert_eq!(product.manufacturer, "");
        assert_eq!(product.cost, 0.0);
    }

    #[tokio::test]
    async fn test_replace_accepts_legacy_field_names() {
        let service = service();
        service
            .create_product(&raw(json!({
                "Sku": "S1",
                "Description": "Gauze",
                "Manufacturer": "Acme",
                "Cost": 9
            })))
            .await
            .unwrap();

        let product = service
            .replace_product(
                "S1",
                &raw(json!({"Description": "Gauze XL", "Manufacturer": "Acme", "Cost": 12})),
            )
            .await
            .unwrap();

        assert_eq!(product.key, "S1");
        assert_eq!(product.description, "Gauze XL");
        assert_eq!(product.manufacturer, "Acme");
        assert_eq!(product.cost, 12.0);
    }

    #[tokio::test]
    async fn test_replace_rejects_negative_cost() {
        let service = service();
        service.create_product(&raw(json!({"key": "A", "cost": 3}))).await.unwrap();

        let err = service
            .replace_product("A", &raw(json!({"cost": -1})))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::BadRequest(msg) if msg.starts_with("invalid cost")));

        assert_eq!(service.get_product("A").await.unwrap().cost, 3.0);
    }

    #[tokio::test]
    async fn test_missing_product() {
        let service = service();

        assert!(matches!(
            service.get_product("nope").await,
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_product("nope").await,
            Err(CoreError::NotFound(_))
        ));
    }
}
