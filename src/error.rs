//! 错误类型定义
//!
//! 分两类：
//! - 批次级错误（`MappingError`、`ConfigError`、`FileError`、鉴权中止）会向上冒泡并终止整个运行
//! - 单条记录的失败（`GenerationFailure`）被收进该记录的结果里，不会逃出批次

use std::fmt;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 变量映射错误
    #[error("映射错误: {0}")]
    Mapping(#[from] MappingError),
    /// 生成失败（仅批次致命的失败会以这种形式冒泡）
    #[error("生成失败: {0}")]
    Generation(#[from] GenerationFailure),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 批次被中止，部分结果已导出
    #[error("批次已中止 (已完成 {completed}/{total}): {reason}")]
    BatchAborted {
        reason: GenerationFailure,
        completed: usize,
        total: usize,
    },
    /// 其他错误
    #[error("错误: {0}")]
    Other(String),
}

/// 变量映射错误
///
/// 在批次开始前一次性报告，任何记录都不会被处理
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MappingError {
    /// 模板必需的变量没有分配列，也没有默认值
    #[error("模板必需的变量 `{variable}` 没有对应的列，也没有默认值")]
    MissingRequired { variable: String },
    /// 分配的列在输入表中不存在
    #[error("变量 `{variable}` 指向的列 `{column}` 不存在 (可用列: {available})")]
    UnknownColumn {
        variable: String,
        column: String,
        available: String,
    },
    /// 标识列不存在
    #[error("标识列 `{column}` 不存在")]
    UnknownIdentityColumn { column: String },
    /// 变量名不合法
    #[error("变量名 `{variable}` 不合法，只允许 ASCII 字母、数字和下划线")]
    InvalidVariable { variable: String },
}

/// 单条记录的失败类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Timeout,
    RateLimit,
    Auth,
    Provider,
    Parse,
}

impl FailureKind {
    /// 输出表中使用的稳定标签
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::RateLimit => "rate_limit",
            FailureKind::Auth => "auth",
            FailureKind::Provider => "provider",
            FailureKind::Parse => "parse",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单条记录的失败描述（类别 + 消息）
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationFailure {
    /// 每次尝试都超时
    #[error("请求超时 (已尝试 {attempts} 次)")]
    Timeout { attempts: u32 },
    /// 重试用尽后仍被限流
    #[error("触发频率限制 (已尝试 {attempts} 次): {message}")]
    RateLimit { attempts: u32, message: String },
    /// 凭证无效，不重试
    #[error("鉴权失败: {message}")]
    Auth { message: String },
    /// 其他传输或服务端错误
    #[error("模型服务错误 (已尝试 {attempts} 次): {message}")]
    Provider { attempts: u32, message: String },
    /// 模型输出缺少必需字段
    #[error("模型输出解析失败: {message}")]
    Parse { message: String },
}

impl GenerationFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            GenerationFailure::Timeout { .. } => FailureKind::Timeout,
            GenerationFailure::RateLimit { .. } => FailureKind::RateLimit,
            GenerationFailure::Auth { .. } => FailureKind::Auth,
            GenerationFailure::Provider { .. } => FailureKind::Provider,
            GenerationFailure::Parse { .. } => FailureKind::Parse,
        }
    }

    /// 是否需要中止整个批次
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, GenerationFailure::Auth { .. })
    }
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// CSV 解析或写出失败
    #[error("CSV 处理失败 ({path}): {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    /// CSV 没有表头
    #[error("CSV 文件缺少表头: {path}")]
    MissingHeader { path: String },
    /// TOML 解析失败
    #[error("TOML 解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 配置错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 环境变量不存在或为空
    #[error("环境变量 {var_name} 不存在或为空")]
    EnvVarNotFound { var_name: String },
    /// 数值配置不合法
    #[error("配置项 {name} 的值 {value} 不合法: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
    /// 未知的语气选项
    #[error("未知的语气选项: {tone}")]
    UnknownTone { tone: String },
    /// 选择了自定义语气但没有提供内容
    #[error("选择了自定义语气 (Personalizzato) 但 custom_tone 为空")]
    EmptyCustomTone,
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建 CSV 错误
    pub fn csv_failed(path: impl Into<String>, source: csv::Error) -> Self {
        AppError::File(FileError::Csv {
            path: path.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
