//! 产品数据模型
//!
//! 唯一实体 `Product`。业务主键 `key`（SKU / VP-code）始终以字符串保存和比较。
//!
//! ## 主键查找规则
//!
//! 历史数据中部分主键曾以数字类型写入，因此按主键查找时会同时尝试两种表示：
//!
//! 1. 原样的字符串主键；
//! 2. 若主键可解析为有限数字，则再尝试它的规范数字字面量
//!    （`"0123"` → `"123"`，`"123.0"` → `"123"`，`"1e2"` → `"100"`）。
//!
//! 精确匹配优先于数字字面量匹配。所有存储后端都通过 [`lookup_candidates`] 实现这条规则。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::import::normalizer::NormalizedRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct Product {
    #[cfg_attr(feature = "database", sqlx(rename = "product_key"))]
    pub key: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub cost: f64,
    pub last_updated: DateTime<Utc>,
}

impl Product {
    /// 由规范化记录新建产品，缺省字段取默认值
    pub fn from_record(record: NormalizedRecord, now: DateTime<Utc>) -> Self {
        Self {
            key: record.key,
            description: record.description.unwrap_or_default(),
            manufacturer: record.manufacturer.unwrap_or_default(),
            cost: record.cost.unwrap_or(0.0),
            last_updated: now,
        }
    }

    /// 非破坏性合并：只有输入中存在且非空的字段才会覆盖已有值
    pub fn merge(&mut self, record: NormalizedRecord, now: DateTime<Utc>) {
        if let Some(description) = record.description {
            self.description = description;
        }
        if let Some(manufacturer) = record.manufacturer {
            self.manufacturer = manufacturer;
        }
        if let Some(cost) = record.cost {
            self.cost = cost;
        }
        self.last_updated = now;
    }

    /// 整体替换可选字段，缺失的字段回到默认值；主键不变
    pub fn replace(&mut self, record: NormalizedRecord, now: DateTime<Utc>) {
        self.description = record.description.unwrap_or_default();
        self.manufacturer = record.manufacturer.unwrap_or_default();
        self.cost = record.cost.unwrap_or(0.0);
        self.last_updated = now;
    }
}

/// 返回按查找规则应尝试的主键，精确形式在前
pub fn lookup_candidates(key: &str) -> Vec<String> {
    let mut candidates = vec![key.to_string()];
    if let Some(literal) = numeric_literal(key) {
        if literal != key {
            candidates.push(literal);
        }
    }
    candidates
}

/// 主键的规范数字字面量；不是有限数字时返回 `None`
pub fn numeric_literal(key: &str) -> Option<String> {
    let value: f64 = key.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    if value == 0.0 {
        return Some("0".to_string());
    }
    Some(value.to_string())
}
