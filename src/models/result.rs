//! 单条记录的处理结果

use crate::error::GenerationFailure;
use crate::models::card::GeneratedCard;
use crate::models::record::RecordIdentity;

/// 每条输入记录对应一个结果，顺序与输入一致
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult {
    /// 生成成功
    Success(GeneratedCard),
    /// 生成失败
    Failure {
        identity: RecordIdentity,
        failure: GenerationFailure,
    },
    /// 批次被取消或中止，未派发
    NotAttempted { identity: RecordIdentity },
}

impl GenerationResult {
    pub fn identity(&self) -> &RecordIdentity {
        match self {
            GenerationResult::Success(card) => &card.identity,
            GenerationResult::Failure { identity, .. } => identity,
            GenerationResult::NotAttempted { identity } => identity,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success(_))
    }

    pub fn card(&self) -> Option<&GeneratedCard> {
        match self {
            GenerationResult::Success(card) => Some(card),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&GenerationFailure> {
        match self {
            GenerationResult::Failure { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// 输出表中的状态列
    pub fn status_label(&self) -> String {
        match self {
            GenerationResult::Success(_) => "success".to_string(),
            GenerationResult::Failure { failure, .. } => format!("failure: {}", failure.kind()),
            GenerationResult::NotAttempted { .. } => "not attempted".to_string(),
        }
    }

    /// 输出表中的错误信息列，成功时为空
    pub fn error_message(&self) -> String {
        match self {
            GenerationResult::Success(_) => String::new(),
            GenerationResult::Failure { failure, .. } => failure.to_string(),
            GenerationResult::NotAttempted { .. } => "批次已停止，记录未处理".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> RecordIdentity {
        RecordIdentity { row: 3, code: None }
    }

    #[test]
    fn test_status_labels() {
        let failure = GenerationResult::Failure {
            identity: identity(),
            failure: GenerationFailure::Timeout { attempts: 3 },
        };
        assert_eq!(failure.status_label(), "failure: timeout");
        assert!(!failure.error_message().is_empty());

        let skipped = GenerationResult::NotAttempted { identity: identity() };
        assert_eq!(skipped.status_label(), "not attempted");
        assert_eq!(skipped.identity().row, 3);
    }
}
