//! 生成配置（整个批次共享、只读）

use crate::error::ConfigError;
use crate::models::template::PromptTemplate;
use std::fmt;

/// 语气：预设选项 + 一个自定义文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToneOfVoice {
    Professionale,
    Amichevole,
    Tecnico,
    Persuasivo,
    Elegante,
    Personalizzato(String),
}

impl ToneOfVoice {
    /// 全部预设选项（不含自定义）
    pub const PRESETS: [ToneOfVoice; 5] = [
        ToneOfVoice::Professionale,
        ToneOfVoice::Amichevole,
        ToneOfVoice::Tecnico,
        ToneOfVoice::Persuasivo,
        ToneOfVoice::Elegante,
    ];

    /// 从界面选项解析，`custom` 只在选择 "Personalizzato" 时使用
    pub fn from_selection(selection: &str, custom: Option<&str>) -> Result<Self, ConfigError> {
        let tone = match selection.trim().to_lowercase().as_str() {
            "professionale" => ToneOfVoice::Professionale,
            "amichevole" => ToneOfVoice::Amichevole,
            "tecnico" => ToneOfVoice::Tecnico,
            "persuasivo" => ToneOfVoice::Persuasivo,
            "elegante" => ToneOfVoice::Elegante,
            "personalizzato" => {
                let text = custom.map(str::trim).unwrap_or_default();
                if text.is_empty() {
                    return Err(ConfigError::EmptyCustomTone);
                }
                ToneOfVoice::Personalizzato(text.to_string())
            }
            _ => {
                return Err(ConfigError::UnknownTone {
                    tone: selection.to_string(),
                })
            }
        };
        Ok(tone)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ToneOfVoice::Professionale => "Professionale",
            ToneOfVoice::Amichevole => "Amichevole",
            ToneOfVoice::Tecnico => "Tecnico",
            ToneOfVoice::Persuasivo => "Persuasivo",
            ToneOfVoice::Elegante => "Elegante",
            ToneOfVoice::Personalizzato(_) => "Personalizzato",
        }
    }

    /// 写进提示词的语气指令
    pub fn directive(&self) -> &str {
        match self {
            ToneOfVoice::Professionale => {
                "Usa un tono professionale, autorevole e chiaro, adatto a un pubblico di acquirenti informati."
            }
            ToneOfVoice::Amichevole => {
                "Usa un tono amichevole, caldo e colloquiale, dando del tu al lettore."
            }
            ToneOfVoice::Tecnico => {
                "Usa un tono tecnico e preciso, mettendo in evidenza specifiche, materiali e dati misurabili."
            }
            ToneOfVoice::Persuasivo => {
                "Usa un tono persuasivo orientato alla conversione, evidenziando i benefici concreti e invitando all'acquisto."
            }
            ToneOfVoice::Elegante => {
                "Usa un tono elegante e ricercato, adatto a un marchio premium, evitando superlativi banali."
            }
            ToneOfVoice::Personalizzato(text) => text,
        }
    }
}

impl fmt::Display for ToneOfVoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 生成配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    pub site_name: String,
    pub site_url: String,
    pub tone: ToneOfVoice,
    /// 原样追加在结构化模板之后
    pub additional_instructions: String,
    pub template: PromptTemplate,
}

impl GenerationConfig {
    pub fn new(site_name: impl Into<String>, site_url: impl Into<String>, tone: ToneOfVoice) -> Self {
        Self {
            site_name: site_name.into(),
            site_url: site_url.into(),
            tone,
            additional_instructions: String::new(),
            template: PromptTemplate::default(),
        }
    }

    pub fn with_additional_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.additional_instructions = instructions.into();
        self
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_selection_presets_case_insensitive() {
        assert_eq!(
            ToneOfVoice::from_selection("Professionale", None).unwrap(),
            ToneOfVoice::Professionale
        );
        assert_eq!(
            ToneOfVoice::from_selection(" TECNICO ", Some("ignorato")).unwrap(),
            ToneOfVoice::Tecnico
        );
    }

    #[test]
    fn test_custom_tone_requires_text() {
        assert_eq!(
            ToneOfVoice::from_selection("Personalizzato", Some("   ")),
            Err(ConfigError::EmptyCustomTone)
        );
        let tone =
            ToneOfVoice::from_selection("Personalizzato", Some("Ironico ma rispettoso")).unwrap();
        assert_eq!(tone.directive(), "Ironico ma rispettoso");
    }

    #[test]
    fn test_unknown_tone_rejected() {
        assert!(matches!(
            ToneOfVoice::from_selection("Sarcastico", None),
            Err(ConfigError::UnknownTone { .. })
        ));
    }

    #[test]
    fn test_every_preset_has_directive() {
        for tone in ToneOfVoice::PRESETS {
            assert!(!tone.directive().is_empty());
            assert_eq!(ToneOfVoice::from_selection(tone.label(), None).unwrap(), tone);
        }
    }
}
