//! 任务描述文件（TOML）
//!
//! 对应前端表单收集的内容：站点信息、语气、附加说明、变量映射

use crate::error::{AppError, AppResult, ConfigError, FileError};
use crate::models::generation::{GenerationConfig, ToneOfVoice};
use crate::models::mapping::MappingRequest;
use crate::models::template::PromptTemplate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub site_name: String,
    #[serde(default)]
    pub site_url: String,
    #[serde(default = "default_tone")]
    pub tone: String,
    /// 仅在 tone = "Personalizzato" 时使用
    #[serde(default)]
    pub custom_tone: Option<String>,
    #[serde(default)]
    pub additional_instructions: String,
    #[serde(default)]
    pub identity_column: Option<String>,
    /// 变量 → 列名
    #[serde(default)]
    pub mapping: BTreeMap<String, String>,
    /// 变量 → 默认值
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
    #[serde(default)]
    pub template: Option<PromptTemplate>,
}

fn default_tone() -> String {
    "Professionale".to_string()
}

impl JobFile {
    pub fn from_toml_str(content: &str, source: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| {
            AppError::File(FileError::TomlParseFailed {
                path: source.to_string(),
                source: e,
            })
        })
    }

    pub fn generation_config(&self) -> Result<GenerationConfig, ConfigError> {
        let tone = ToneOfVoice::from_selection(&self.tone, self.custom_tone.as_deref())?;
        Ok(GenerationConfig::new(&self.site_name, &self.site_url, tone)
            .with_additional_instructions(&self.additional_instructions)
            .with_template(self.template.clone().unwrap_or_default()))
    }

    pub fn mapping_request(&self) -> MappingRequest {
        MappingRequest {
            assignments: self.mapping.clone(),
            defaults: self.defaults.clone(),
            identity_column: self.identity_column.clone(),
        }
    }
}

/// 从 TOML 文件加载任务描述
pub async fn load_job_file(job_file_path: &Path) -> AppResult<JobFile> {
    let source = job_file_path.display().to_string();
    let content = fs::read_to_string(job_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(&source, e))?;

    JobFile::from_toml_str(&content, &source)
}
