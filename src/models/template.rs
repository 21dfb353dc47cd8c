//! 提示词模板
//!
//! 模板正文使用 `{{variable}}` 占位符，并声明哪些变量是必需的

use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// 内置变量词表
pub const PRODUCT_NAME: &str = "product_name";
pub const BRAND: &str = "brand";
pub const PRICE: &str = "price";
pub const CATEGORY: &str = "category";
pub const EXISTING_DESCRIPTION: &str = "existing_description";
pub const FEATURES: &str = "features";

pub const STANDARD_VARIABLES: [&str; 6] = [
    PRODUCT_NAME,
    BRAND,
    PRICE,
    CATEGORY,
    EXISTING_DESCRIPTION,
    FEATURES,
];

const DEFAULT_BODY: &str = "Scrivi i contenuti della scheda prodotto per il seguente articolo.

Nome prodotto: {{product_name}}
Marca: {{brand}}
Prezzo: {{price}}
Categoria: {{category}}
Caratteristiche: {{features}}
Descrizione attuale: {{existing_description}}";

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder pattern is valid")
    })
}

/// 提示词模板
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PromptTemplate {
    pub body: String,
    #[serde(default)]
    pub required: Vec<String>,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            body: DEFAULT_BODY.to_string(),
            required: vec![PRODUCT_NAME.to_string()],
        }
    }
}

impl PromptTemplate {
    pub fn new(body: impl Into<String>, required: Vec<String>) -> Self {
        Self {
            body: body.into(),
            required,
        }
    }

    /// 模板引用的变量（按首次出现顺序，去重）
    pub fn variables(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for caps in placeholder_regex().captures_iter(&self.body) {
            let name = caps[1].to_string();
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
        seen
    }

    /// 模板是否引用了某个变量
    pub fn references(&self, variable: &str) -> bool {
        placeholder_regex()
            .captures_iter(&self.body)
            .any(|caps| &caps[1] == variable)
    }

    pub fn is_required(&self, variable: &str) -> bool {
        self.required.iter().any(|v| v == variable)
    }

    /// 用 `lookup` 替换所有占位符，查不到的变量替换为空字符串
    pub fn render<'a, F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        placeholder_regex()
            .replace_all(&self.body, |caps: &regex::Captures<'_>| {
                lookup(&caps[1]).unwrap_or_default().to_string()
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_references_standard_variables() {
        let template = PromptTemplate::default();
        let variables = template.variables();
        for name in STANDARD_VARIABLES {
            assert!(variables.iter().any(|v| v == name), "缺少变量 {}", name);
        }
        assert!(template.is_required(PRODUCT_NAME));
        assert!(!template.is_required(BRAND));
    }

    #[test]
    fn test_variables_deduplicated_in_order() {
        let template = PromptTemplate::new("{{ b }} {{a}} {{b}}", vec![]);
        assert_eq!(template.variables(), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_render_never_leaves_placeholders() {
        let template = PromptTemplate::new("Nome: {{product_name}} / Colore: {{colore}}", vec![]);
        let rendered = template.render(|name| match name {
            "product_name" => Some("Sedia"),
            _ => None,
        });
        assert_eq!(rendered, "Nome: Sedia / Colore: ");
        assert!(!rendered.contains("{{"));
    }
}
