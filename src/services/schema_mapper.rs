//! 列映射服务 - 业务能力层
//!
//! 只负责把操作员的"变量 → 列"分配校验成 `ColumnMapping`，纯转换，无副作用

use crate::error::MappingError;
use crate::models::mapping::{Binding, ColumnMapping, MappingRequest};
use crate::models::template::PromptTemplate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// 列映射服务
///
/// 职责：
/// - 在批次开始前一次性校验映射
/// - 模板引用的每个变量都在结果中有一项（可能是 `Unbound`）
/// - 未被使用的列直接忽略，不算错误
pub struct SchemaMapper<'a> {
    columns: &'a [String],
}

impl<'a> SchemaMapper<'a> {
    /// 使用输入表的列名创建
    pub fn new(columns: &'a [String]) -> Self {
        Self { columns }
    }

    /// 构建映射
    ///
    /// # 参数
    /// - `request`: 操作员的分配（可以不完整）
    /// - `template`: 当前使用的提示词模板
    ///
    /// # 返回
    /// 模板必需的变量既没有列也没有默认值时返回 `MappingError`
    pub fn build(
        &self,
        request: &MappingRequest,
        template: &PromptTemplate,
    ) -> Result<ColumnMapping, MappingError> {
        let mut variables: BTreeSet<String> = template.variables().into_iter().collect();
        variables.extend(template.required.iter().cloned());
        variables.extend(request.assignments.keys().cloned());
        variables.extend(request.defaults.keys().cloned());

        let mut bindings = BTreeMap::new();
        for variable in variables {
            if !is_valid_variable(&variable) {
                return Err(MappingError::InvalidVariable { variable });
            }
            let binding = self.bind(&variable, request, template)?;
            debug!("变量 {} → {:?}", variable, binding);
            bindings.insert(variable, binding);
        }

        let identity_column = match non_blank(request.identity_column.as_deref()) {
            Some(wanted) => Some(
                self.resolve_column(wanted)
                    .ok_or_else(|| MappingError::UnknownIdentityColumn {
                        column: wanted.to_string(),
                    })?
                    .to_string(),
            ),
            None => None,
        };

        let ignored = self.unused_columns(&bindings, identity_column.as_deref());
        if !ignored.is_empty() {
            debug!("未使用的列: {}", ignored.join(", "));
        }

        info!(
            "✓ 变量映射完成: {} 个变量, {} 列未使用",
            bindings.len(),
            ignored.len()
        );

        Ok(ColumnMapping::new(bindings, identity_column))
    }

    fn bind(
        &self,
        variable: &str,
        request: &MappingRequest,
        template: &PromptTemplate,
    ) -> Result<Binding, MappingError> {
        let default = non_blank(request.defaults.get(variable).map(String::as_str));

        if let Some(wanted) = non_blank(request.assignments.get(variable).map(String::as_str)) {
            let column = self
                .resolve_column(wanted)
                .ok_or_else(|| MappingError::UnknownColumn {
                    variable: variable.to_string(),
                    column: wanted.to_string(),
                    available: self.columns.join(", "),
                })?;
            return Ok(Binding::Column {
                column: column.to_string(),
                fallback: default.map(str::to_string),
            });
        }

        if let Some(value) = default {
            return Ok(Binding::Constant(value.to_string()));
        }

        if template.is_required(variable) {
            return Err(MappingError::MissingRequired {
                variable: variable.to_string(),
            });
        }

        Ok(Binding::Unbound)
    }

    /// 先精确匹配列名，再忽略首尾空白和大小写匹配
    fn resolve_column(&self, wanted: &str) -> Option<&'a str> {
        let columns: &'a [String] = self.columns;
        columns
            .iter()
            .find(|c| c.as_str() == wanted)
            .or_else(|| {
                let wanted = wanted.trim().to_lowercase();
                columns.iter().find(|c| c.trim().to_lowercase() == wanted)
            })
            .map(String::as_str)
    }

    fn unused_columns(
        &self,
        bindings: &BTreeMap<String, Binding>,
        identity_column: Option<&str>,
    ) -> Vec<&'a str> {
        let columns: &'a [String] = self.columns;
        columns
            .iter()
            .map(String::as_str)
            .filter(|column| Some(*column) != identity_column)
            .filter(|column| {
                !bindings.values().any(|binding| {
                    matches!(binding, Binding::Column { column: bound, .. } if bound == column)
                })
            })
            .collect()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn is_valid_variable(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
