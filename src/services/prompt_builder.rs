//! 提示词构建服务 - 业务能力层
//!
//! 纯函数：同样的 (记录, 映射, 配置) 永远得到逐字节相同的提示词

use crate::models::card::{CardField, FieldLimits};
use crate::models::generation::GenerationConfig;
use crate::models::mapping::ColumnMapping;
use crate::models::record::ProductRecord;
use std::fmt::Write;

/// 一次模型调用的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// 提示词构建服务
///
/// 用户消息的段落顺序固定：
/// 1. 渲染后的模板
/// 2. 模板没有引用、但操作员映射了的变量
/// 3. 语气指令
/// 4. 输出格式与字段长度上限
/// 5. 附加说明（原样放在最后，可以覆盖前面的默认写法）
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    limits: FieldLimits,
}

impl PromptBuilder {
    pub fn new(limits: FieldLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> FieldLimits {
        self.limits
    }

    pub fn build(
        &self,
        record: &ProductRecord,
        mapping: &ColumnMapping,
        config: &GenerationConfig,
    ) -> Prompt {
        Prompt {
            system: self.system_message(config),
            user: self.user_message(record, mapping, config),
        }
    }

    fn system_message(&self, config: &GenerationConfig) -> String {
        let mut message = String::from(
            "Sei un copywriter e-commerce esperto di SEO. Scrivi testi originali, accurati e \
             pronti per la pubblicazione, senza inventare caratteristiche non presenti nei dati.",
        );
        if !config.site_name.trim().is_empty() {
            let _ = write!(message, "\nScrivi per il sito \"{}\"", config.site_name.trim());
            if !config.site_url.trim().is_empty() {
                let _ = write!(message, " ({})", config.site_url.trim());
            }
            message.push('.');
        }
        message
    }

    fn user_message(
        &self,
        record: &ProductRecord,
        mapping: &ColumnMapping,
        config: &GenerationConfig,
    ) -> String {
        let template = &config.template;
        let mut message = template.render(|variable| Some(mapping.value(variable, record)));

        // 模板之外的变量（例如自定义变量），按名称排序
        let extras: Vec<(&str, &str)> = mapping
            .variables()
            .filter(|variable| !template.references(variable))
            .map(|variable| (variable, mapping.value(variable, record)))
            .filter(|(_, value)| !value.trim().is_empty())
            .collect();
        if !extras.is_empty() {
            message.push_str("\n\nAltre informazioni:");
            for (variable, value) in extras {
                let _ = write!(message, "\n- {}: {}", variable, value);
            }
        }

        let _ = write!(
            message,
            "\n\nTono di voce ({}): {}",
            config.tone.label(),
            config.tone.directive()
        );

        message.push_str("\n\n");
        message.push_str(&self.format_block());

        if !config.additional_instructions.trim().is_empty() {
            message.push_str("\n\nIstruzioni aggiuntive:\n");
            message.push_str(&config.additional_instructions);
        }

        message
    }

    /// 输出格式要求，标签与 `OutputValidator` 解析时使用的一致
    fn format_block(&self) -> String {
        let mut block = String::from(
            "Rispondi esclusivamente con le quattro sezioni seguenti, nell'ordine indicato, \
             ognuna introdotta dalla propria etichetta seguita da due punti:",
        );
        for field in CardField::ALL {
            let _ = write!(
                block,
                "\n{}: <{}, massimo {} caratteri>",
                field.label(),
                field_hint(field),
                self.limits.limit(field)
            );
        }
        block.push_str(
            "\nNon superare mai il numero massimo di caratteri indicato per ciascuna sezione \
             e non aggiungere altro testo prima o dopo le sezioni.",
        );
        block
    }
}

fn field_hint(field: CardField) -> &'static str {
    match field {
        CardField::Title => "titolo del prodotto",
        CardField::Description => "descrizione del prodotto",
        CardField::MetaTitle => "meta title SEO",
        CardField::MetaDescription => "meta description SEO",
    }
}
