//! 变量 → 列 的映射值对象
//!
//! 由 `SchemaMapper` 在批次开始时一次性构建，之后只读

use crate::models::record::ProductRecord;
use std::collections::BTreeMap;

/// 操作员提交的映射请求（可以只覆盖部分变量）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingRequest {
    /// 变量 → 列名
    pub assignments: BTreeMap<String, String>,
    /// 变量 → 默认值
    pub defaults: BTreeMap<String, String>,
    /// 作为记录标识的列（如商品编码）
    pub identity_column: Option<String>,
}

impl MappingRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(mut self, variable: impl Into<String>, column: impl Into<String>) -> Self {
        self.assignments.insert(variable.into(), column.into());
        self
    }

    pub fn with_default(mut self, variable: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(variable.into(), value.into());
        self
    }

    pub fn with_identity_column(mut self, column: impl Into<String>) -> Self {
        self.identity_column = Some(column.into());
        self
    }
}

/// 单个变量的绑定方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// 取某一列的值，单元格为空时使用 `fallback`
    Column {
        column: String,
        fallback: Option<String>,
    },
    /// 固定值
    Constant(String),
    /// 可选变量未分配，解析为空字符串
    Unbound,
}

impl Binding {
    pub fn resolve<'a>(&'a self, record: &'a ProductRecord) -> &'a str {
        match self {
            Binding::Column { column, fallback } => {
                let value = record.get(column).unwrap_or_default();
                if value.trim().is_empty() {
                    fallback.as_deref().unwrap_or(value)
                } else {
                    value
                }
            }
            Binding::Constant(value) => value,
            Binding::Unbound => "",
        }
    }
}

/// 变量映射
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    bindings: BTreeMap<String, Binding>,
    identity_column: Option<String>,
}

impl ColumnMapping {
    pub(crate) fn new(bindings: BTreeMap<String, Binding>, identity_column: Option<String>) -> Self {
        Self {
            bindings,
            identity_column,
        }
    }

    pub fn binding(&self, variable: &str) -> Option<&Binding> {
        self.bindings.get(variable)
    }

    /// 变量在某条记录中的值，未映射的变量为空字符串
    pub fn value<'a>(&'a self, variable: &str, record: &'a ProductRecord) -> &'a str {
        self.bindings
            .get(variable)
            .map(|binding| binding.resolve(record))
            .unwrap_or_default()
    }

    /// 所有已映射变量（按名称排序）
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn identity_column(&self) -> Option<&str> {
        self.identity_column.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
