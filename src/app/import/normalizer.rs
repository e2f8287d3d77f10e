//! 记录规范化
//!
//! 把 JSON 对象或 CSV 行（均为字符串键的映射）转换成规范的产品字段。
//! 字段名通过 [`FieldAliases`] 匹配（大小写不敏感，按别名顺序取第一个非空值），
//! 因此 `Sku`/`Description`/`Manufacturer`/`Cost` 与 `vp_code`/`brand`/`cost`
//! 两种历史格式都在这一层统一，处理器不再区分。

use serde_json::{Map, Value};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::infrastructure::config::FieldAliases;

/// 未经处理的输入记录
pub type RawRecord = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing key")]
    MissingKey,

    #[error("invalid cost: {0}")]
    InvalidCost(String),

    #[error("{0}")]
    InvalidField(String),
}

/// 规范化后的记录；`None` 表示输入中缺失或为空
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct NormalizedRecord {
    #[validate(length(min = 1, max = 128, message = "key must be 1-128 characters"))]
    pub key: String,

    #[validate(length(max = 1024, message = "description is too long"))]
    pub description: Option<String>,

    #[validate(length(max = 256, message = "manufacturer is too long"))]
    pub manufacturer: Option<String>,

    pub cost: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    aliases: FieldAliases,
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new(FieldAliases::default())
    }
}

impl RecordNormalizer {
    pub fn new(aliases: FieldAliases) -> Self {
        Self { aliases }
    }

    pub fn normalize(&self, raw: &RawRecord) -> Result<NormalizedRecord, ValidationError> {
        let key = match lookup(raw, &self.aliases.key) {
            Some(value) => text("key", value)?,
            None => return Err(ValidationError::MissingKey),
        };

        self.normalize_fields(key, raw)
    }

    /// 主键由调用方给出（例如 URL 路径），记录中的主键字段被忽略
    pub fn normalize_with_key(
        &self,
        key: &str,
        raw: &RawRecord,
    ) -> Result<NormalizedRecord, ValidationError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ValidationError::MissingKey);
        }
        self.normalize_fields(key.to_string(), raw)
    }

    fn normalize_fields(
        &self,
        key: String,
        raw: &RawRecord,
    ) -> Result<NormalizedRecord, ValidationError> {
        let description = lookup(raw, &self.aliases.description)
            .map(|value| text("description", value))
            .transpose()?;
        let manufacturer = lookup(raw, &self.aliases.manufacturer)
            .map(|value| text("manufacturer", value))
            .transpose()?;
        let cost = lookup(raw, &self.aliases.cost).map(parse_cost).transpose()?;

        let record = NormalizedRecord {
            key,
            description,
            manufacturer,
            cost,
        };
        record
            .validate()
            .map_err(|e| ValidationError::InvalidField(describe_validation(&e)))?;

        Ok(record)
    }

    /// 错误报告用的主键：能取到就取，取不到时返回 `None`
    pub fn raw_key(&self, raw: &RawRecord) -> Option<String> {
        lookup(raw, &self.aliases.key).and_then(|value| text("key", value).ok())
    }
}

/// 按别名顺序查找第一个非空字段值
fn lookup<'a>(raw: &'a RawRecord, aliases: &[String]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        raw.iter()
            .filter(|(name, _)| name.trim().eq_ignore_ascii_case(alias.trim()))
            .map(|(_, value)| value)
            .find(|value| is_present(value))
    })
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// 文本字段；数字主键也一律转成字符串
fn text(field: &str, value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(number_text(n)),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(ValidationError::InvalidField(format!(
            "{field} must be a string or number"
        ))),
    }
}

fn number_text(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64().map(|f| f.to_string()).unwrap_or_else(|| n.to_string())
    }
}

fn parse_cost(value: &Value) -> Result<f64, ValidationError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(cost) if cost.is_finite() && cost >= 0.0 => Ok(cost),
        _ => Err(ValidationError::InvalidCost(match value {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        })),
    }
}

/// 把 validator 的错误汇总成一行信息
fn describe_validation(err: &ValidationErrors) -> String {
    let mut messages: Vec<String> = err
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                error
                    .message
                    .as_ref()
                    .map(|msg| msg.to_string())
                    .unwrap_or_else(|| format!("invalid {field}"))
            })
        })
        .collect();
    messages.sort();
    messages.join(", ")
}
