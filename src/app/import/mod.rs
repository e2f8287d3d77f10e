//! 批量导入：记录规范化、批量协调、CSV 上传

pub mod csv_file;
pub mod handler;
pub mod normalizer;
pub mod reconciler;

pub use normalizer::{NormalizedRecord, RawRecord, RecordNormalizer, ValidationError};
pub use reconciler::{BatchReconciler, BatchResult, Outcome, RecordError};
