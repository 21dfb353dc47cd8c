//! 输出校验服务 - 业务能力层
//!
//! 只负责"解析 + 长度约束"：
//! - 缺少字段是硬错误（`Parse` 失败）
//! - 超长是软错误，在最近的空白处截断

use crate::error::GenerationFailure;
use crate::models::card::{CardField, FieldLimits, GeneratedCard};
use crate::models::record::RecordIdentity;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// 行首的字段标签，容忍 markdown 修饰（`**TITOLO:**`、`- Titolo:`）
fn label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?mi)^[ \t>*#_\-]*(TITOLO|DESCRIZIONE|META[ _]TITLE|META[ _]DESCRIPTION)[ \t*_]*:[ \t*_]*",
        )
        .expect("label pattern is valid")
    })
}

/// 输出校验服务
#[derive(Debug, Clone, Default)]
pub struct OutputValidator {
    limits: FieldLimits,
}

impl OutputValidator {
    pub fn new(limits: FieldLimits) -> Self {
        Self { limits }
    }

    /// 解析模型输出并执行长度约束
    ///
    /// # 参数
    /// - `raw`: 模型返回的原始文本
    /// - `identity`: 原始记录的标识，写入卡片
    pub fn validate(
        &self,
        raw: &str,
        identity: RecordIdentity,
    ) -> Result<GeneratedCard, GenerationFailure> {
        let sections = parse_sections(raw);

        let missing: Vec<&str> = CardField::ALL
            .into_iter()
            .filter(|field| sections.get(field).map_or(true, |v| v.is_empty()))
            .map(CardField::label)
            .collect();
        if !missing.is_empty() {
            return Err(GenerationFailure::Parse {
                message: format!("缺少字段: {}", missing.join(", ")),
            });
        }

        let field = |field: CardField| -> String {
            let value = sections.get(&field).map(String::as_str).unwrap_or_default();
            let limit = self.limits.limit(field);
            let truncated = truncate_at_word_boundary(value, limit);
            if truncated.len() != value.len() {
                warn!(
                    "{} 字段 {} 超长 ({} > {} 字符)，已截断为 {} 字符",
                    identity,
                    field.label(),
                    value.chars().count(),
                    limit,
                    truncated.chars().count()
                );
            }
            truncated
        };

        let title = field(CardField::Title);
        let description = field(CardField::Description);
        let meta_title = field(CardField::MetaTitle);
        let meta_description = field(CardField::MetaDescription);

        let card = GeneratedCard {
            identity,
            title,
            description,
            meta_title,
            meta_description,
        };
        debug!("{} 输出校验通过", card.identity);
        Ok(card)
    }
}

/// 按标签切分输出，同一标签出现多次时取第一次
fn parse_sections(raw: &str) -> HashMap<CardField, String> {
    let re = label_regex();
    let matches: Vec<_> = re.captures_iter(raw).collect();

    let mut sections = HashMap::new();
    for (idx, caps) in matches.iter().enumerate() {
        let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let normalized = label.as_str().replace(' ', "_");
        let Some(field) = CardField::from_label(&normalized) else {
            continue;
        };
        let end = matches
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map_or(raw.len(), |m| m.start());
        let value = clean_value(&raw[whole.end()..end]);
        sections.entry(field).or_insert(value);
    }
    sections
}

fn clean_value(value: &str) -> String {
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    value.trim().to_string()
}

/// 截断到不超过 `max_chars` 个字符，尽量停在单词边界
///
/// 结果总是原文的前缀；只有当第一个单词本身就超长时才会在单词中间截断
pub fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut = text
        .char_indices()
        .nth(max_chars)
        .map_or(text.len(), |(idx, _)| idx);
    let head = &text[..cut];
    let next_is_space = text[cut..].chars().next().is_some_and(char::is_whitespace);

    let boundary = if next_is_space {
        head
    } else {
        head.rfind(char::is_whitespace)
            .map_or(head, |idx| &head[..idx])
    };

    let trimmed = boundary.trim_end();
    if trimmed.is_empty() {
        head.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> RecordIdentity {
        RecordIdentity {
            row: 1,
            code: Some("A1".to_string()),
        }
    }

    const WELL_FORMED: &str = "TITOLO: Sedia Ufficio Acme Ergonomica
DESCRIZIONE: Una sedia da ufficio comoda.
Schienale regolabile e braccioli imbottiti.
META_TITLE: Sedia Ufficio Acme | Arredo Rossi
META_DESCRIPTION: Scopri la sedia ergonomica Acme per il tuo ufficio.";

    #[test]
    fn test_well_formed_output_kept_exactly() {
        let card = OutputValidator::default()
            .validate(WELL_FORMED, identity())
            .unwrap();
        assert_eq!(card.title, "Sedia Ufficio Acme Ergonomica");
        assert_eq!(
            card.description,
            "Una sedia da ufficio comoda.\nSchienale regolabile e braccioli imbottiti."
        );
        assert_eq!(card.meta_title, "Sedia Ufficio Acme | Arredo Rossi");
        assert_eq!(
            card.meta_description,
            "Scopri la sedia ergonomica Acme per il tuo ufficio."
        );
        assert_eq!(card.identity, identity());
    }

    #[test]
    fn test_markdown_decorated_labels() {
        let raw = "**Titolo:** Lampada\n**Descrizione:** Luce calda.\n- Meta Title: Lampada LED\n## META_DESCRIPTION: \"Lampada da tavolo\"";
        let card = OutputValidator::default().validate(raw, identity()).unwrap();
        assert_eq!(card.title, "Lampada");
        assert_eq!(card.description, "Luce calda.");
        assert_eq!(card.meta_title, "Lampada LED");
        assert_eq!(card.meta_description, "Lampada da tavolo");
    }

    #[test]
    fn test_missing_field_is_parse_failure() {
        let raw = "TITOLO: Lampada\nDESCRIZIONE: Luce calda.\nMETA_TITLE: Lampada";
        let err = OutputValidator::default()
            .validate(raw, identity())
            .unwrap_err();
        assert!(matches!(err, GenerationFailure::Parse { ref message } if message.contains("META_DESCRIPTION")));
    }

    #[test]
    fn test_empty_field_is_parse_failure() {
        let raw = "TITOLO:\nDESCRIZIONE: Luce calda.\nMETA_TITLE: Lampada\nMETA_DESCRIPTION: Lampada";
        let err = OutputValidator::default()
            .validate(raw, identity())
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Parse);
    }

    #[test]
    fn test_overlong_title_truncated_at_word_boundary() {
        // 120 个字符的标题
        let title = "Sedia ergonomica da ufficio con schienale in rete traspirante e supporto lombare regolabile, ideale per lavorare in casa";
        assert_eq!(title.chars().count(), 120);
        let raw = format!(
            "TITOLO: {}\nDESCRIZIONE: Comoda.\nMETA_TITLE: Sedia\nMETA_DESCRIPTION: Sedia comoda.",
            title
        );
        let card = OutputValidator::default().validate(&raw, identity()).unwrap();
        assert!(card.title.chars().count() <= 80);
        assert!(title.starts_with(&card.title));
        let next = title[card.title.len()..].chars().next();
        assert!(next.map_or(true, char::is_whitespace));
    }

    #[test]
    fn test_truncate_within_limit_is_identity() {
        assert_eq!(truncate_at_word_boundary("ciao mondo", 10), "ciao mondo");
        assert_eq!(truncate_at_word_boundary("", 10), "");
    }

    #[test]
    fn test_truncate_exactly_at_space() {
        // 第 10 个字符之后正好是空格
        assert_eq!(truncate_at_word_boundary("ciao mondo bello", 10), "ciao mondo");
        assert_eq!(truncate_at_word_boundary("ciao mondobello", 10), "ciao");
    }

    #[test]
    fn test_truncate_multibyte_characters() {
        let text = "perché così è più bello";
        let truncated = truncate_at_word_boundary(text, 12);
        assert_eq!(truncated, "perché così");
        assert!(truncated.chars().count() <= 12);
    }

    #[test]
    fn test_truncate_single_long_word_hard_cut() {
        let truncated = truncate_at_word_boundary("supercalifragilistichespiralidoso", 10);
        assert_eq!(truncated, "supercalif");
    }

    #[test]
    fn test_truncation_property_over_many_limits() {
        let text = "Divano letto matrimoniale in tessuto sfoderabile con contenitore, ideale per piccoli spazi";
        for limit in 1..text.chars().count() {
            let truncated = truncate_at_word_boundary(text, limit);
            assert!(truncated.chars().count() <= limit, "limit {}", limit);
            assert!(text.starts_with(&truncated), "limit {}", limit);
        }
    }
}
