//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量记录处理器
//! - 控制并发数量（Semaphore）
//! - 预留结果槽位，保证输出顺序与输入一致
//! - 鉴权失败中止、外部取消、批次时限
//! - 发布进度（watch 通道）
//!
//! ### `app` - 应用生命周期
//! - 加载任务描述和输入表
//! - 在批次开始前校验变量映射
//! - 导出结果并输出统计信息
//!
//! ## 层次关系
//!
//! ```text
//! app (加载 / 导出)
//!     ↓
//! batch_processor (处理 Vec<ProductRecord>)
//!     ↓
//! workflow::RecordFlow (处理单条记录)
//!     ↓
//! services (能力层：prompt / completion / validate)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_processor 管并发，app 管输入输出
//! 2. **只读共享**：映射和生成配置在批次内不可变
//! 3. **向下依赖**：编排层 → workflow → services → models
//! 4. **无业务逻辑**：只做调度和统计，不做具体业务判断

pub mod app;
pub mod batch_processor;

// 重新导出主要类型
pub use app::App;
pub use batch_processor::{BatchControl, BatchOrchestrator, BatchProgress, BatchReport, BatchState};
