//! 模型调用服务 - 业务能力层
//!
//! 把一次模型调用包装成 `complete(prompt) -> 文本 | 失败`：
//! - 每次请求有超时，超时 / 限流 / 其他错误都按指数退避重试
//! - 限流时优先使用服务端给出的等待时间
//! - 凭证无效立即失败，不重试

use crate::config::RetryPolicy;
use crate::error::GenerationFailure;
use crate::models::record::RecordIdentity;
use crate::services::prompt_builder::Prompt;
use regex::Regex;
use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

/// 后端返回的错误信号（已分类）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// 请求超时
    Timeout,
    /// 被限流，可能带有建议等待时间
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },
    /// 凭证无效或无权限
    Unauthorized(String),
    /// 其他传输或服务端错误
    Other(String),
}

impl BackendError {
    fn into_failure(self, attempts: u32) -> GenerationFailure {
        match self {
            BackendError::Timeout => GenerationFailure::Timeout { attempts },
            BackendError::RateLimited { message, .. } => {
                GenerationFailure::RateLimit { attempts, message }
            }
            BackendError::Unauthorized(message) => GenerationFailure::Auth { message },
            BackendError::Other(message) => GenerationFailure::Provider { attempts, message },
        }
    }
}

/// 模型后端
///
/// 只负责发出一次请求并把错误分类，重试与超时由 `CompletionClient` 处理
pub trait ChatBackend: Send + Sync + 'static {
    fn chat<'a>(
        &'a self,
        prompt: &'a Prompt,
    ) -> impl Future<Output = Result<String, BackendError>> + Send + 'a;
}

/// 模型调用客户端
pub struct CompletionClient<B> {
    backend: B,
    policy: RetryPolicy,
}

impl<B: ChatBackend> CompletionClient<B> {
    pub fn new(backend: B, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// 发送提示词，返回模型原始输出
    ///
    /// # 参数
    /// - `prompt`: 已构建好的提示词
    /// - `identity`: 记录标识（仅用于日志）
    pub async fn complete(
        &self,
        prompt: &Prompt,
        identity: &RecordIdentity,
    ) -> Result<String, GenerationFailure> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("{} 调用模型 (第 {}/{} 次)", identity, attempt, max_attempts);

            let outcome = match timeout(self.policy.request_timeout, self.backend.chat(prompt)).await
            {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout),
            };

            let backend_error = match outcome {
                Ok(text) => {
                    debug!("{} 模型调用成功 (第 {} 次)", identity, attempt);
                    return Ok(text);
                }
                Err(e) => e,
            };

            if let BackendError::Unauthorized(message) = backend_error {
                error!("{} ❌ 鉴权失败，不再重试: {}", identity, message);
                return Err(GenerationFailure::Auth { message });
            }

            if attempt >= max_attempts {
                let failure = backend_error.into_failure(attempt);
                error!("{} ❌ 重试 {} 次后仍失败: {}", identity, attempt, failure);
                return Err(failure);
            }

            let delay = self.retry_delay(&backend_error, attempt);
            warn!(
                "{} ⚠️ 第 {}/{} 次调用失败 ({:?})，{:?} 后重试",
                identity, attempt, max_attempts, backend_error, delay
            );
            sleep(delay).await;
        }
    }

    /// 第 `attempt` 次失败后的等待时间
    ///
    /// 限流提示比计算出的退避更长时以提示为准，但不超过 `backoff_max`
    fn retry_delay(&self, error: &BackendError, attempt: u32) -> Duration {
        let backoff = self.policy.backoff(attempt);
        match error {
            BackendError::RateLimited {
                retry_after: Some(hint),
                ..
            } => (*hint).min(self.policy.backoff_max).max(backoff),
            _ => backoff,
        }
    }
}

fn retry_after_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:try again|retry)\s+(?:in|after)\s+(\d+(?:\.\d+)?)\s*(ms|milliseconds?|s|secs?|seconds?)?",
        )
        .expect("retry-after pattern is valid")
    })
}

/// 从服务端消息中提取建议等待时间，例如 "Please try again in 20s"
pub fn parse_retry_after(message: &str) -> Option<Duration> {
    let caps = retry_after_regex().captures(message)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let millis = match caps.get(2).map(|m| m.as_str().to_lowercase()) {
        Some(unit) if unit.starts_with("ms") || unit.starts_with("milli") => value,
        _ => value * 1000.0,
    };
    Some(Duration::from_millis(millis.ceil() as u64))
}

/// 根据服务端错误文本分类
///
/// # 参数
/// - `signal`: 用于判断类别的完整错误文本（含错误码）
/// - `message`: 保留给诊断的可读消息
pub fn classify_provider_message(signal: &str, message: String) -> BackendError {
    let lower = signal.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&[
        "invalid_api_key",
        "incorrect api key",
        "invalid api key",
        "unauthorized",
        "authentication",
        "insufficient_quota",
    ]) {
        BackendError::Unauthorized(message)
    } else if has(&["rate_limit", "rate limit", "too many requests"]) {
        BackendError::RateLimited {
            retry_after: parse_retry_after(signal),
            message,
        }
    } else if has(&["timed out", "timeout"]) {
        BackendError::Timeout
    } else {
        BackendError::Other(message)
    }
}
