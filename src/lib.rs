//! # Product Copy Generator
//!
//! 根据商品表批量生成电商文案（标题、描述、SEO meta）
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 记录、变量映射、生成配置、模板、结果
//! - `models/loaders` - CSV 输入表与 TOML 任务描述的加载
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单条记录
//! - `SchemaMapper` - 列 → 变量 的一次性校验
//! - `PromptBuilder` - 提示词构建（纯函数）
//! - `CompletionClient` - 模型调用（超时、重试、退避）
//! - `OutputValidator` - 输出解析与长度约束
//! - `ResultWriter` - CSV 导出
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一条记录"的完整处理流程
//! - `RecordCtx` - 上下文封装（记录标识 + 处理阶段）
//! - `RecordFlow` - 流程编排（prompt → completion → validate）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 有界并发、有序结果、中止与取消
//! - `orchestrator/app` - 应用生命周期
//!
//! ## 模块结构

pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, RetryPolicy};
pub use error::{AppError, AppResult, FailureKind, GenerationFailure, MappingError};
pub use models::{
    ColumnMapping, GeneratedCard, GenerationConfig, GenerationResult, MappingRequest,
    ProductRecord, ProductTable, PromptTemplate, ToneOfVoice,
};
pub use orchestrator::{App, BatchControl, BatchOrchestrator, BatchReport, BatchState};
pub use services::{BackendError, ChatBackend, CompletionClient};
pub use workflow::{RecordCtx, RecordFlow};
