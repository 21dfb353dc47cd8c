use crate::error::ConfigError;
use std::fmt;
use std::time::Duration;

/// 程序配置
#[derive(Clone)]
pub struct Config {
    /// 同时处理的记录数量（worker 数）
    pub max_concurrent_records: usize,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 每条记录的最大尝试次数（含首次）
    pub max_attempts: u32,
    /// 退避基准时长（毫秒），第 n 次重试等待 base * 2^(n-1)
    pub backoff_base_ms: u64,
    /// 退避上限（毫秒）
    pub backoff_max_ms: u64,
    /// 整个批次的时间预算（秒），超出后停止派发
    pub batch_deadline_secs: Option<u64>,
    /// 输入 CSV 路径
    pub input_csv: String,
    /// 输出 CSV 路径
    pub output_csv: String,
    /// 任务描述文件（TOML）
    pub job_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_records: 3,
            request_timeout_secs: 60,
            max_attempts: 3,
            backoff_base_ms: 1_000,
            backoff_max_ms: 30_000,
            batch_deadline_secs: None,
            input_csv: "products.csv".to_string(),
            output_csv: "product_cards.csv".to_string(),
            job_file: "job.toml".to_string(),
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            llm_temperature: 0.7,
            llm_max_tokens: 1024,
        }
    }
}

// 凭证不能出现在日志里
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("max_concurrent_records", &self.max_concurrent_records)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .field("backoff_max_ms", &self.backoff_max_ms)
            .field("batch_deadline_secs", &self.batch_deadline_secs)
            .field("input_csv", &self.input_csv)
            .field("output_csv", &self.output_csv)
            .field("job_file", &self.job_file)
            .field("verbose_logging", &self.verbose_logging)
            .field("llm_api_key", &"***")
            .field("llm_api_base_url", &self.llm_api_base_url)
            .field("llm_model_name", &self.llm_model_name)
            .field("llm_temperature", &self.llm_temperature)
            .field("llm_max_tokens", &self.llm_max_tokens)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_concurrent_records: std::env::var("MAX_CONCURRENT_RECORDS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_records),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            max_attempts: std::env::var("MAX_ATTEMPTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_attempts),
            backoff_base_ms: std::env::var("BACKOFF_BASE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.backoff_base_ms),
            backoff_max_ms: std::env::var("BACKOFF_MAX_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.backoff_max_ms),
            batch_deadline_secs: std::env::var("BATCH_DEADLINE_SECS").ok().and_then(|v| v.parse().ok()).or(default.batch_deadline_secs),
            input_csv: std::env::var("INPUT_CSV").unwrap_or(default.input_csv),
            output_csv: std::env::var("OUTPUT_CSV").unwrap_or(default.output_csv),
            job_file: std::env::var("JOB_FILE").unwrap_or(default.job_file),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            llm_temperature: std::env::var("LLM_TEMPERATURE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.llm_temperature),
            llm_max_tokens: std::env::var("LLM_MAX_TOKENS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.llm_max_tokens),
        }
    }

    /// 检查运行前必须满足的配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::EnvVarNotFound {
                var_name: "LLM_API_KEY".to_string(),
            });
        }
        if self.max_concurrent_records == 0 {
            return Err(invalid("MAX_CONCURRENT_RECORDS", 0, "至少需要 1 个 worker"));
        }
        if self.max_attempts == 0 {
            return Err(invalid("MAX_ATTEMPTS", 0, "至少需要尝试 1 次"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("REQUEST_TIMEOUT_SECS", 0, "超时必须大于 0"));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            backoff_max: Duration::from_millis(self.backoff_max_ms),
        }
    }

    pub fn batch_deadline(&self) -> Option<Duration> {
        self.batch_deadline_secs.map(Duration::from_secs)
    }
}

fn invalid(name: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// 单次模型调用的超时与重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub request_timeout: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Config::default().retry_policy()
    }
}

impl RetryPolicy {
    /// 第 `attempt` 次失败之后的等待时长（attempt 从 1 开始）
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_base
            .checked_mul(factor)
            .unwrap_or(self.backoff_max)
            .min(self.backoff_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_api_key() {
        let config = Config::default();
        assert_eq!(
            config.validate(),
            Err(ConfigError::EnvVarNotFound {
                var_name: "LLM_API_KEY".to_string()
            })
        );

        let config = Config {
            llm_api_key: "sk-test".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = Config {
            llm_api_key: "sk-test".to_string(),
            max_concurrent_records: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config {
            llm_api_key: "sk-secret-value".to_string(),
            ..Config::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("sk-secret-value"));
        assert!(printed.contains("***"));
    }

    #[test]
    fn test_backoff_grows_exponentially_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            request_timeout: Duration::from_secs(1),
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_millis(3_000),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1_000));
        assert_eq!(policy.backoff(3), Duration::from_millis(2_000));
        assert_eq!(policy.backoff(4), Duration::from_millis(3_000));
        assert_eq!(policy.backoff(40), Duration::from_millis(3_000));
    }
}
