//! 批量协调（插入或更新）
//!
//! 按输入顺序逐条处理：规范化 → 按主键查找 → 合并或新建 → 持久化。
//! 单条记录失败只会记入 `errors`，整批始终执行完并返回 [`BatchResult`]。
//! 同一批次内重复的主键按顺序生效，后出现的记录是对前一条的更新。

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::normalizer::{RawRecord, RecordNormalizer};
use crate::app::product::model::Product;
use crate::infrastructure::store::ProductStore;

const UNKNOWN_KEY: &str = "unknown";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub inserted: usize,
    pub updated: usize,
    pub errors: Vec<RecordError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordError {
    pub key: String,
    pub error: String,
}

impl RecordError {
    fn new(key: Option<String>, error: impl ToString) -> Self {
        Self {
            key: key.unwrap_or_else(|| UNKNOWN_KEY.to_string()),
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Inserted,
    Updated,
}

impl BatchResult {
    pub fn record(&mut self, outcome: Result<Outcome, RecordError>) {
        match outcome {
            Ok(Outcome::Inserted) => self.inserted += 1,
            Ok(Outcome::Updated) => self.updated += 1,
            Err(error) => self.errors.push(error),
        }
    }

    /// 已处理的记录数
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.errors.len()
    }
}

#[derive(Clone)]
pub struct BatchReconciler {
    store: Arc<dyn ProductStore>,
    normalizer: RecordNormalizer,
}

impl BatchReconciler {
    pub fn new(store: Arc<dyn ProductStore>, normalizer: RecordNormalizer) -> Self {
        Self { store, normalizer }
    }

    pub async fn reconcile<I>(&self, records: I) -> BatchResult
    where
        I: IntoIterator<Item = RawRecord>,
    {
        self.run(records.into_iter().map(Ok)).await
    }

    /// JSON 数组入口：不是对象的元素记为该条记录的错误
    pub async fn reconcile_json(&self, items: Vec<Value>) -> BatchResult {
        let records = items.into_iter().map(|item| match item {
            Value::Object(raw) => Ok(raw),
            _ => Err(RecordError::new(None, "record must be a JSON object")),
        });
        self.run(records).await
    }

    async fn run<I>(&self, records: I) -> BatchResult
    where
        I: IntoIterator<Item = Result<RawRecord, RecordError>>,
    {
        let start = Instant::now();
        let mut result = BatchResult::default();

        for raw in records {
            let outcome = match raw {
                Ok(raw) => self.reconcile_one(&raw).await,
                Err(error) => Err(error),
            };
            if let Err(ref failure) = outcome {
                warn!(key = %failure.key, error = %failure.error, "record rejected");
            }
            result.record(outcome);
        }

        info!(
            inserted = result.inserted,
            updated = result.updated,
            failed = result.errors.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "batch reconciled"
        );
        result
    }

    /// 处理单条记录；持久化只有一次 upsert，失败时该记录不产生任何可见变化
    pub async fn reconcile_one(&self, raw: &RawRecord) -> Result<Outcome, RecordError> {
        let record = self
            .normalizer
            .normalize(raw)
            .map_err(|e| RecordError::new(self.normalizer.raw_key(raw), e))?;

        let key = record.key.clone();
        let now = Utc::now();

        let existing = self
            .store
            .find_by_key(&key)
            .await
            .map_err(|e| RecordError::new(Some(key.clone()), e))?;

        let (product, outcome) = match existing {
            // 沿用已存储的主键，数字字面量匹配时不产生重复记录
            Some(mut product) => {
                product.merge(record, now);
                (product, Outcome::Updated)
            }
            None => (Product::from_record(record, now), Outcome::Inserted),
        };

        self.store
            .upsert(product)
            .await
            .map_err(|e| RecordError::new(Some(key), e))?;

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::MemoryStore;
    use crate::infrastructure::store::StorageError;
    use async_trait::async_trait;
    use serde_json::json;

    fn raw_records(value: Value) -> Vec<RawRecord> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item.as_object().cloned().unwrap())
            .collect()
    }

    fn reconciler(store: Arc<dyn ProductStore>) -> BatchReconciler {
        BatchReconciler::new(store, RecordNormalizer::default())
    }

    fn stored(key: &str, cost: f64, manufacturer: &str) -> Product {
        Product {
            key: key.to_string(),
            description: String::new(),
            manufacturer: manufacturer.to_string(),
            cost,
            last_updated: Utc::now() - chrono::Duration::days(1),
        }
    }

    /// 对指定主键的查找或写入失败
    #[derive(Default)]
    struct FailingStore {
        inner: MemoryStore,
        fail_lookup_on: Option<&'static str>,
        fail_upsert_on: Option<&'static str>,
    }

    #[async_trait]
    impl ProductStore for FailingStore {
        async fn find_by_key(&self, key: &str) -> Result<Option<Product>, StorageError> {
            if self.fail_lookup_on == Some(key) {
                return Err(StorageError::Database("statement timeout".into()));
            }
            self.inner.find_by_key(key).await
        }

        async fn upsert(&self, product: Product) -> Result<Product, StorageError> {
            if self.fail_upsert_on == Some(product.key.as_str()) {
                return Err(StorageError::Unavailable("connection reset".into()));
            }
            self.inner.upsert(product).await
        }

        async fn list(&self) -> Result<Vec<Product>, StorageError> {
            self.inner.list().await
        }

        async fn delete(&self, key: &str) -> Result<bool, StorageError> {
            self.inner.delete(key).await
        }

        async fn ping(&self) -> Result<(), StorageError> {
            Ok(())
        }

        fn backend(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_mixed_batch_against_empty_store() {
        let store = Arc::new(MemoryStore::new());
        let result = reconciler(store.clone())
            .reconcile(raw_records(json!([
                {"key": "P1", "cost": 5},
                {"key": "P2", "cost": 7},
                {"cost": 9}
            ])))
            .await;

        assert_eq!(
            result,
            BatchResult {
                inserted: 2,
                updated: 0,
                errors: vec![RecordError {
                    key: "unknown".into(),
                    error: "missing key".into()
                }],
            }
        );
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_second_run_updates_everything() {
        let store = Arc::new(MemoryStore::new());
        let reconciler = reconciler(store);
        let batch = json!([
            {"key": "A", "cost": 1},
            {"key": "B", "description": "Bone saw"},
            {"key": "C", "manufacturer": "Acme"}
        ]);

        let first = reconciler.reconcile(raw_records(batch.clone())).await;
        assert_eq!((first.inserted, first.updated), (3, 0));

        let second = reconciler.reconcile(raw_records(batch)).await;
        assert_eq!((second.inserted, second.updated), (0, 3));
        assert!(second.errors.is_empty());
    }

    #[tokio::test]
    async fn test_non_destructive_merge() {
        let store = Arc::new(MemoryStore::with_products([stored("A", 10.0, "X")]));
        let result = reconciler(store.clone())
            .reconcile(raw_records(json!([{"key": "A", "cost": 20}])))
            .await;

        assert_eq!(result.updated, 1);
        let product = store.find_by_key("A").await.unwrap().unwrap();
        assert_eq!(product.cost, 20.0);
        assert_eq!(product.manufacturer, "X");
        assert!(product.last_updated > Utc::now() - chrono::Duration::minutes(1));
    }

    #[tokio::test]
    async fn test_string_key_finds_numeric_legacy_record() {
        // 历史记录以数字 123 写入
        let store = Arc::new(MemoryStore::with_products([stored("123", 1.0, "Legacy")]));
        let result = reconciler(store.clone())
            .reconcile(raw_records(json!([
                {"key": "123", "cost": 2},
                {"Sku": 123.0, "description": "Forceps"}
            ])))
            .await;

        assert_eq!((result.inserted, result.updated), (0, 2));
        assert_eq!(store.len().await, 1);

        let product = store.find_by_key("123").await.unwrap().unwrap();
        assert_eq!(product.cost, 2.0);
        assert_eq!(product.description, "Forceps");
        assert_eq!(product.manufacturer, "Legacy");
    }

    #[tokio::test]
    async fn test_storage_failure_does_not_abort_batch() {
        let store = Arc::new(FailingStore {
            fail_upsert_on: Some("B"),
            ..FailingStore::default()
        });
        let result = reconciler(store.clone())
            .reconcile(raw_records(json!([
                {"key": "A"},
                {"key": "B"},
                {"key": "C"}
            ])))
            .await;

        assert_eq!(result.inserted, 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].key, "B");
        assert!(result.errors[0].error.contains("connection reset"));
        assert!(store.find_by_key("B").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_failure_is_recorded_under_normalized_key() {
        let store = Arc::new(FailingStore {
            fail_lookup_on: Some("C-7"),
            ..FailingStore::default()
        });
        let result = reconciler(store.clone())
            .reconcile(raw_records(json!([
                {"Sku": "  C-7 ", "cost": 1},
                {"key": "D", "cost": 2}
            ])))
            .await;

        assert_eq!(result.inserted, 1);
        assert_eq!(
            result.errors,
            vec![RecordError {
                key: "C-7".into(),
                error: "database error: statement timeout".into()
            }]
        );
        assert!(store.inner.find_by_key("C-7").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_keys_apply_in_order() {
        let store = Arc::new(MemoryStore::new());
        let result = reconciler(store.clone())
            .reconcile(raw_records(json!([
                {"key": "D", "cost": 1, "manufacturer": "First"},
                {"key": "D", "cost": 2}
            ])))
            .await;

        assert_eq!((result.inserted, result.updated), (1, 1));
        let product = store.find_by_key("D").await.unwrap().unwrap();
        assert_eq!(product.cost, 2.0);
        assert_eq!(product.manufacturer, "First");
    }

    #[tokio::test]
    async fn test_non_object_json_items() {
        let store = Arc::new(MemoryStore::new());
        let result = reconciler(store)
            .reconcile_json(vec![json!({"key": "A"}), json!(42), json!(["B"])])
            .await;

        assert_eq!(result.inserted, 1);
        assert_eq!(result.errors.len(), 2);
        assert!(result
            .errors
            .iter()
            .all(|e| e.key == "unknown" && e.error == "record must be a JSON object"));
    }

    #[tokio::test]
    async fn test_counts_always_cover_input() {
        let store = Arc::new(MemoryStore::new());
        let records = raw_records(json!([
            {"key": "A"},
            {"key": ""},
            {"key": "B", "cost": -4},
            {"Sku": "A", "cost": "12"},
            {"description": "orphan"},
            {"vp_code": 77, "brand": "Z"}
        ]));
        let total = records.len();

        let result = reconciler(store).reconcile(records).await;

        assert_eq!(result.total(), total);
        assert_eq!(result.errors[0].key, "unknown");
        assert_eq!(result.errors[1].key, "B");
        assert!(result.errors[1].error.starts_with("invalid cost"));
    }
}
