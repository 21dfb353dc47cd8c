use crate::error::{AppError, AppResult, FileError};
use crate::models::record::ProductTable;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

/// 候选分隔符，按优先级排列
const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// 从 CSV 文件加载商品表
pub async fn load_product_table(csv_path: &Path) -> AppResult<ProductTable> {
    let source = csv_path.display().to_string();
    let bytes = fs::read(csv_path)
        .await
        .map_err(|e| AppError::file_read_failed(&source, e))?;

    let table = parse_product_table(&bytes, &source)?;
    info!(
        "✓ 已加载 {}: {} 列, {} 条记录",
        source,
        table.headers().len(),
        table.len()
    );
    Ok(table)
}

/// 解析 CSV 内容
///
/// 表头定义列名；行可以不齐，缺失的单元格视为空；完全空白的行被跳过
pub fn parse_product_table(bytes: &[u8], source: &str) -> AppResult<ProductTable> {
    let decoded = decode_text(bytes, source);
    let text = decoded.strip_prefix('\u{feff}').unwrap_or(&decoded);

    let header_line = text.lines().next().unwrap_or_default();
    if header_line.trim().is_empty() {
        return Err(FileError::MissingHeader {
            path: source.to_string(),
        }
        .into());
    }
    let delimiter = sniff_delimiter(header_line);
    debug!("{} 使用分隔符 {:?}", source, delimiter as char);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::csv_failed(source, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AppError::csv_failed(source, e))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(ProductTable::new(headers, rows))
}

/// 按 UTF-8 解码，失败时退回 Latin-1
fn decode_text(bytes: &[u8], source: &str) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            warn!("⚠️ {} 不是合法的 UTF-8，按 Latin-1 解码", source);
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

/// 取表头中出现次数最多的候选分隔符，并列时按优先级取前者
fn sniff_delimiter(header_line: &str) -> u8 {
    let mut best = DELIMITERS[0];
    let mut best_count = 0;
    for candidate in DELIMITERS {
        let count = header_line.matches(candidate as char).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}
