//! CSV 文件解码与下载模板

use csv::{ReaderBuilder, Trim};
use serde_json::Value;

use super::normalizer::RawRecord;

pub const TEMPLATE_FILE_NAME: &str = "product_template.csv";

/// 下载模板：表头与两行示例
pub const TEMPLATE_CSV: &str = "key,description,manufacturer,cost\n\
Sku123,Product Description,Manufacturer Name,10.99\n\
Sku456,Another Product,Another Manufacturer,15.50\n";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 把上传的 CSV 解码为原始记录，每行一个以表头为键的映射；空行跳过
pub fn decode_rows(bytes: &[u8]) -> Result<Vec<RawRecord>, csv::Error> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let row: RawRecord = headers
            .iter()
            .zip(record.iter())
            .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_template() {
        let rows = decode_rows(TEMPLATE_CSV.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["key"], "Sku123");
        assert_eq!(rows[1]["cost"], "15.50");
    }

    #[test]
    fn test_decode_trims_bom_blank_lines_and_short_rows() {
        let input = "\u{feff}Sku, Description ,Cost\n A1 , Gauze ,2\n\n,,\nA2\n";
        let rows = decode_rows(input.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Sku"], "A1");
        assert_eq!(rows[0]["Description"], "Gauze");
        assert_eq!(rows[1]["Sku"], "A2");
        assert!(rows[1].get("Cost").is_none());
    }

    #[test]
    fn test_header_only_is_empty() {
        assert!(decode_rows(b"key,description,manufacturer,cost\n").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_error() {
        assert!(decode_rows(b"key\n\xff\xfe\n").is_err());
    }
}
