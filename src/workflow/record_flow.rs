//! 记录处理流程 - 流程层
//!
//! 核心职责：定义"一条记录"的完整处理流程
//!
//! 流程顺序：
//! 1. 构建提示词
//! 2. 调用模型（含重试）
//! 3. 解析并校验输出

use tracing::{debug, info, warn};

use crate::models::generation::GenerationConfig;
use crate::models::mapping::ColumnMapping;
use crate::models::record::ProductRecord;
use crate::models::result::GenerationResult;
use crate::models::template::PRODUCT_NAME;
use crate::services::{ChatBackend, CompletionClient, OutputValidator, PromptBuilder};
use crate::utils::logging::truncate_text;
use crate::workflow::record_ctx::{RecordCtx, RecordStage};

/// 记录处理流程
///
/// - 编排单条记录的 构建 → 调用 → 校验
/// - 任何失败都收敛成该记录的 `GenerationResult`，不向外抛
/// - 只读共享映射和配置，不持有批次状态
pub struct RecordFlow<B> {
    prompt_builder: PromptBuilder,
    client: CompletionClient<B>,
    validator: OutputValidator,
}

impl<B: ChatBackend> RecordFlow<B> {
    pub fn new(
        prompt_builder: PromptBuilder,
        client: CompletionClient<B>,
        validator: OutputValidator,
    ) -> Self {
        Self {
            prompt_builder,
            client,
            validator,
        }
    }

    /// 使用默认字段长度上限创建
    pub fn with_client(client: CompletionClient<B>) -> Self {
        Self::new(PromptBuilder::default(), client, OutputValidator::default())
    }

    pub async fn run(
        &self,
        ctx: &mut RecordCtx,
        record: &ProductRecord,
        mapping: &ColumnMapping,
        config: &GenerationConfig,
    ) -> GenerationResult {
        self.log_record(ctx, record, mapping);
        ctx.advance(RecordStage::Mapped);

        let prompt = self.prompt_builder.build(record, mapping, config);
        ctx.advance(RecordStage::Prompted);
        debug!("{} 提示词长度: {} 字符", ctx, prompt.user.chars().count());

        ctx.advance(RecordStage::Completing);
        let raw = match self.client.complete(&prompt, &ctx.identity).await {
            Ok(raw) => raw,
            Err(failure) => {
                ctx.advance(RecordStage::Done);
                return GenerationResult::Failure {
                    identity: ctx.identity.clone(),
                    failure,
                };
            }
        };

        ctx.advance(RecordStage::Validating);
        let result = match self.validator.validate(&raw, ctx.identity.clone()) {
            Ok(card) => {
                info!("{} ✓ 文案生成成功: {}", ctx, truncate_text(&card.title, 40));
                GenerationResult::Success(card)
            }
            Err(failure) => {
                warn!("{} ⚠️ 模型输出无法解析: {}", ctx, failure);
                debug!("{} 原始输出: {}", ctx, truncate_text(&raw, 300));
                GenerationResult::Failure {
                    identity: ctx.identity.clone(),
                    failure,
                }
            }
        };
        ctx.advance(RecordStage::Done);
        result
    }

    // ========== 日志辅助方法 ==========

    fn log_record(&self, ctx: &RecordCtx, record: &ProductRecord, mapping: &ColumnMapping) {
        let name = mapping.value(PRODUCT_NAME, record);
        info!("{} 开始处理: {}", ctx, truncate_text(name, 60));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::error::GenerationFailure;
    use crate::models::generation::ToneOfVoice;
    use crate::models::mapping::MappingRequest;
    use crate::models::record::ProductTable;
    use crate::models::template::PromptTemplate;
    use crate::services::prompt_builder::Prompt;
    use crate::services::{BackendError, SchemaMapper};
    use std::future::Future;
    use std::time::Duration;

    struct FixedBackend(Result<String, BackendError>);

    impl ChatBackend for FixedBackend {
        fn chat<'a>(
            &'a self,
            _prompt: &'a Prompt,
        ) -> impl Future<Output = Result<String, BackendError>> + Send + 'a {
            let reply = self.0.clone();
            async move { reply }
        }
    }

    fn flow(reply: Result<String, BackendError>) -> RecordFlow<FixedBackend> {
        let policy = RetryPolicy {
            max_attempts: 2,
            request_timeout: Duration::from_millis(100),
            backoff_base: Duration::from_millis(1),
            backoff_max: Duration::from_millis(1),
        };
        RecordFlow::with_client(CompletionClient::new(FixedBackend(reply), policy))
    }

    fn fixture() -> (ProductTable, ColumnMapping, GenerationConfig) {
        let table = ProductTable::new(
            vec!["codice".into(), "nome".into()],
            vec![vec!["P1".into(), "Lampada da tavolo".into()]],
        );
        let mapping = SchemaMapper::new(table.headers())
            .build(
                &MappingRequest::new()
                    .assign("product_name", "nome")
                    .with_identity_column("codice"),
                &PromptTemplate::default(),
            )
            .unwrap();
        let config = GenerationConfig::new("Luci Srl", "", ToneOfVoice::Amichevole);
        (table, mapping, config)
    }

    fn ctx_for(table: &ProductTable, mapping: &ColumnMapping) -> RecordCtx {
        let record = &table.records()[0];
        RecordCtx::new(record.identity(mapping.identity_column()), 1, 1)
    }

    #[tokio::test]
    async fn test_success_path() {
        let (table, mapping, config) = fixture();
        let flow = flow(Ok(
            "TITOLO: Lampada\nDESCRIZIONE: Luce calda.\nMETA_TITLE: Lampada\nMETA_DESCRIPTION: Lampada LED."
                .to_string(),
        ));
        let mut ctx = ctx_for(&table, &mapping);
        let result = flow
            .run(&mut ctx, &table.records()[0], &mapping, &config)
            .await;
        assert!(result.is_success());
        assert_eq!(result.identity().code.as_deref(), Some("P1"));
        assert_eq!(ctx.stage(), RecordStage::Done);
    }

    #[tokio::test]
    async fn test_unparseable_output_is_parse_failure() {
        let (table, mapping, config) = fixture();
        let flow = flow(Ok("Ecco il testo che hai chiesto!".to_string()));
        let mut ctx = ctx_for(&table, &mapping);
        let result = flow
            .run(&mut ctx, &table.records()[0], &mapping, &config)
            .await;
        assert_eq!(result.status_label(), "failure: parse");
    }

    #[tokio::test]
    async fn test_auth_failure_is_captured() {
        let (table, mapping, config) = fixture();
        let flow = flow(Err(BackendError::Unauthorized("bad key".to_string())));
        let mut ctx = ctx_for(&table, &mapping);
        let result = flow
            .run(&mut ctx, &table.records()[0], &mapping, &config)
            .await;
        assert_eq!(
            result.failure(),
            Some(&GenerationFailure::Auth {
                message: "bad key".to_string()
            })
        );
    }
}
