//! 记录处理上下文
//!
//! 封装"我正在处理第几条记录、走到了哪一步"这一信息

use std::fmt::Display;
use tracing::debug;

use crate::models::record::RecordIdentity;

/// 单条记录的处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStage {
    Pending,
    Mapped,
    Prompted,
    Completing,
    Validating,
    Done,
}

impl RecordStage {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStage::Pending => "pending",
            RecordStage::Mapped => "mapped",
            RecordStage::Prompted => "prompted",
            RecordStage::Completing => "completing",
            RecordStage::Validating => "validating",
            RecordStage::Done => "done",
        }
    }
}

/// 记录处理上下文
#[derive(Debug, Clone)]
pub struct RecordCtx {
    /// 记录标识（行号 + 可选代码）
    pub identity: RecordIdentity,

    /// 在本批次中的位置（从1开始，仅用于日志显示）
    pub index: usize,

    /// 本批次记录总数
    pub total: usize,

    stage: RecordStage,
}

impl RecordCtx {
    pub fn new(identity: RecordIdentity, index: usize, total: usize) -> Self {
        Self {
            identity,
            index,
            total,
            stage: RecordStage::Pending,
        }
    }

    pub fn stage(&self) -> RecordStage {
        self.stage
    }

    /// 进入下一阶段
    pub fn advance(&mut self, stage: RecordStage) {
        debug!("{} {} → {}", self, self.stage.as_str(), stage.as_str());
        self.stage = stage;
    }
}

impl Display for RecordCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[记录 {}/{} {}]", self.index, self.total, self.identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_stage() {
        let mut ctx = RecordCtx::new(
            RecordIdentity {
                row: 3,
                code: Some("SKU-3".to_string()),
            },
            3,
            5,
        );
        assert_eq!(ctx.stage(), RecordStage::Pending);
        ctx.advance(RecordStage::Completing);
        assert_eq!(ctx.stage(), RecordStage::Completing);
        assert!(ctx.to_string().starts_with("[记录 3/5 "));
        assert!(ctx.to_string().contains("SKU-3"));
    }
}
