//! LLM 服务 - 业务能力层
//!
//! 只负责"发一次对话请求"能力，重试和超时由 `CompletionClient` 负责
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use backoff::ExponentialBackoffBuilder;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::services::completion_client::{classify_provider_message, BackendError, ChatBackend};
use crate::services::prompt_builder::Prompt;

/// LLM 服务
///
/// 职责：
/// - 把 `Prompt` 转成 chat completion 请求
/// - 把服务端错误分类成 `BackendError`
/// - 不重试、不计时
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        // 关闭库内重试，每个 429/5xx 第一次出现就交给 CompletionClient 分类和重试
        let no_retry = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();
        let client = Client::with_config(openai_config).with_backoff(no_retry);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 发送一次对话请求
    ///
    /// # 返回
    /// 返回第一个候选的文本内容（去掉首尾空白）
    pub async fn send_to_llm(&self, prompt: &Prompt) -> Result<String, BackendError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", prompt.user.chars().count());

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(prompt.system.as_str())
            .build()
            .map_err(build_error)?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.user.as_str())
            .build()
            .map_err(build_error)?;

        let messages = vec![
            ChatCompletionRequestMessage::System(system_msg),
            ChatCompletionRequestMessage::User(user_msg),
        ];

        // 构建请求
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(build_error)?;

        // 调用 API
        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            classify_openai_error(e)
        })?;

        debug!("LLM API 调用成功");

        // 提取响应内容
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| BackendError::Other("LLM 返回内容为空".to_string()))?;

        Ok(content.trim().to_string())
    }
}

impl ChatBackend for LlmService {
    fn chat<'a>(
        &'a self,
        prompt: &'a Prompt,
    ) -> impl Future<Output = Result<String, BackendError>> + Send + 'a {
        self.send_to_llm(prompt)
    }
}

fn build_error(e: OpenAIError) -> BackendError {
    BackendError::Other(format!("请求构建失败: {}", e))
}

/// 服务端返回的结构化错误带有 code/type，一并参与分类
fn classify_openai_error(e: OpenAIError) -> BackendError {
    match e {
        OpenAIError::ApiError(api) => {
            let signal = format!("{:?}", api);
            classify_provider_message(&signal, api.message.clone())
        }
        other => {
            let text = other.to_string();
            classify_provider_message(&text, text.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or_else(|_| "sk-test".to_string()),
            llm_model_name: "gpt-4o-mini".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_service_uses_configured_model() {
        let service = LlmService::new(&test_config());
        assert_eq!(service.model_name(), "gpt-4o-mini");
        assert_eq!(service.max_tokens, Config::default().llm_max_tokens);
    }

    mod provider_errors {
        use super::*;
        use crate::config::RetryPolicy;
        use crate::error::{FailureKind, GenerationFailure};
        use crate::models::record::RecordIdentity;
        use crate::services::completion_client::CompletionClient;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        const RATE_LIMIT_BODY: &str = r#"{"error":{"message":"Rate limit reached for gpt-4o-mini. Please try again in 1s.","type":"requests","param":null,"code":"rate_limit_exceeded"}}"#;

        async fn provider_answering(status: u16, body: &str) -> MockServer {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/v1/chat/completions"))
                .respond_with(ResponseTemplate::new(status).set_body_raw(body, "application/json"))
                .mount(&server)
                .await;
            server
        }

        fn service_for(server: &MockServer) -> LlmService {
            LlmService::new(&Config {
                llm_api_key: "sk-test".to_string(),
                llm_api_base_url: format!("{}/v1", server.uri()),
                llm_model_name: "gpt-4o-mini".to_string(),
                ..Config::default()
            })
        }

        fn two_attempts() -> RetryPolicy {
            RetryPolicy {
                max_attempts: 2,
                request_timeout: Duration::from_secs(3),
                backoff_base: Duration::from_millis(1),
                backoff_max: Duration::from_millis(10),
            }
        }

        fn prompt() -> Prompt {
            Prompt {
                system: "sys".to_string(),
                user: "TITOLO:".to_string(),
            }
        }

        async fn request_count(server: &MockServer) -> usize {
            server.received_requests().await.map_or(0, |r| r.len())
        }

        #[tokio::test]
        async fn test_single_429_is_classified_as_rate_limit() {
            let server = provider_answering(429, RATE_LIMIT_BODY).await;
            let err = service_for(&server).send_to_llm(&prompt()).await.unwrap_err();

            match err {
                BackendError::RateLimited { retry_after, message } => {
                    assert_eq!(retry_after, Some(Duration::from_secs(1)));
                    assert!(message.starts_with("Rate limit reached"));
                }
                other => panic!("期望限流错误，实际: {:?}", other),
            }
            assert_eq!(request_count(&server).await, 1);
        }

        #[tokio::test]
        async fn test_rate_limit_reaches_completion_client() {
            let server = provider_answering(429, RATE_LIMIT_BODY).await;
            let client = CompletionClient::new(service_for(&server), two_attempts());
            let identity = RecordIdentity { row: 1, code: None };

            let failure = client.complete(&prompt(), &identity).await.unwrap_err();

            assert_eq!(failure.kind(), FailureKind::RateLimit);
            assert_eq!(request_count(&server).await, 2);
        }

        #[tokio::test]
        async fn test_server_error_reaches_completion_client() {
            let server = provider_answering(500, "upstream boom").await;
            let client = CompletionClient::new(service_for(&server), two_attempts());
            let identity = RecordIdentity { row: 1, code: None };

            let failure = client.complete(&prompt(), &identity).await.unwrap_err();

            assert_eq!(failure.kind(), FailureKind::Provider);
            match failure {
                GenerationFailure::Provider { attempts, message } => {
                    assert_eq!(attempts, 2);
                    assert!(message.contains("upstream boom"));
                }
                other => panic!("期望服务端错误，实际: {:?}", other),
            }
            assert_eq!(request_count(&server).await, 2);
        }
    }

    /// 测试真实 API 调用
    ///
    /// 运行方式：
    /// ```bash
    /// LLM_API_KEY=... cargo test test_send_to_llm_live -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_send_to_llm_live() {
        let _ = tracing_subscriber::fmt::try_init();

        let service = LlmService::new(&test_config());
        let prompt = Prompt {
            system: "Sei un assistente conciso.".to_string(),
            user: "TITOLO: scrivi un titolo per una sedia da ufficio.".to_string(),
        };

        match service.send_to_llm(&prompt).await {
            Ok(response) => {
                println!("\n========== LLM 响应 ==========");
                println!("{}", response);
                println!("==============================\n");
                assert!(!response.is_empty());
            }
            Err(e) => panic!("LLM 调用失败: {:?}", e),
        }
    }
}
