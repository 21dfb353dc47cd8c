//! 生成结果卡片与字段长度上限

use crate::models::record::RecordIdentity;

/// 卡片的四个字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardField {
    Title,
    Description,
    MetaTitle,
    MetaDescription,
}

impl CardField {
    pub const ALL: [CardField; 4] = [
        CardField::Title,
        CardField::Description,
        CardField::MetaTitle,
        CardField::MetaDescription,
    ];

    /// 提示词与模型输出中使用的分隔标签
    pub fn label(self) -> &'static str {
        match self {
            CardField::Title => "TITOLO",
            CardField::Description => "DESCRIZIONE",
            CardField::MetaTitle => "META_TITLE",
            CardField::MetaDescription => "META_DESCRIPTION",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        CardField::ALL
            .into_iter()
            .find(|field| field.label().eq_ignore_ascii_case(label))
    }
}

/// 每个字段的最大字符数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLimits {
    pub title: usize,
    pub description: usize,
    pub meta_title: usize,
    pub meta_description: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            title: 80,
            description: 500,
            meta_title: 60,
            meta_description: 155,
        }
    }
}

impl FieldLimits {
    pub fn limit(&self, field: CardField) -> usize {
        match field {
            CardField::Title => self.title,
            CardField::Description => self.description,
            CardField::MetaTitle => self.meta_title,
            CardField::MetaDescription => self.meta_description,
        }
    }
}

/// 一条记录的生成结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCard {
    pub identity: RecordIdentity,
    pub title: String,
    pub description: String,
    pub meta_title: String,
    pub meta_description: String,
}

impl GeneratedCard {
    pub fn field(&self, field: CardField) -> &str {
        match field {
            CardField::Title => &self.title,
            CardField::Description => &self.description,
            CardField::MetaTitle => &self.meta_title,
            CardField::MetaDescription => &self.meta_description,
        }
    }
}
