//! 输入表与单条商品记录

use std::fmt;
use std::sync::Arc;

/// 一条输入记录：列名 → 原始值，保持表头顺序，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    /// 数据行号（从 1 开始，不含表头）
    row: usize,
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl ProductRecord {
    /// 创建记录，缺失的尾部单元格补空字符串，多余的单元格丢弃
    pub fn new(row: usize, headers: Arc<[String]>, mut values: Vec<String>) -> Self {
        values.resize(headers.len(), String::new());
        Self {
            row,
            headers,
            values,
        }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    /// 按列名取值
    pub fn get(&self, column: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h == column)
            .map(|idx| self.values[idx].as_str())
    }

    /// 按表头顺序遍历 (列名, 值)
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    /// 记录标识：指定了标识列且该列非空时用列值，否则用行号
    pub fn identity(&self, identity_column: Option<&str>) -> RecordIdentity {
        let code = identity_column
            .and_then(|column| self.get(column))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        RecordIdentity {
            row: self.row,
            code,
        }
    }
}

/// 记录标识，生成结果通过它回指原始记录
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordIdentity {
    pub row: usize,
    pub code: Option<String>,
}

impl fmt::Display for RecordIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "#{} ({})", self.row, code),
            None => write!(f, "#{}", self.row),
        }
    }
}

/// 整张输入表
#[derive(Debug, Clone)]
pub struct ProductTable {
    headers: Arc<[String]>,
    records: Vec<ProductRecord>,
}

impl ProductTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers: Arc<[String]> = headers.into();
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(idx, values)| ProductRecord::new(idx + 1, headers.clone(), values))
            .collect();
        Self { headers, records }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ProductRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
