//! 批评解析：从批评者回复中抽取「批评建议」与「推荐的关键词」
//!
//! 回复应遵循两段式模板：
//!
//! ```text
//! 1. 批评建议：
//! - （具体建议）
//! 2. 推荐的关键词：
//! - （关键词1, 关键词2, ...）
//! ```
//!
//! 两段各自独立匹配；缺失的一段记为 Missing，不报错。

use std::sync::LazyLock;

use regex::Regex;

pub const SUGGESTIONS_PLACEHOLDER: &str = "未提供批评建议";
pub const KEYWORDS_PLACEHOLDER: &str = "未提供关键词";

static SUGGESTIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)1\. 批评建议：\n(.*?)2\. 推荐的关键词：").expect("suggestions regex")
});
static KEYWORDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"2\. 推荐的关键词：\n- (.*)").expect("keywords regex"));

/// 单个字段的抽取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Found(String),
    Missing,
}

impl Extracted {
    fn from_capture(re: &Regex, text: &str) -> Self {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| Extracted::Found(m.as_str().trim().to_string()))
            .unwrap_or(Extracted::Missing)
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Extracted::Found(_))
    }

    pub fn as_deref_or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        match self {
            Extracted::Found(s) => s,
            Extracted::Missing => placeholder,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CritiqueResult {
    pub suggestions: Extracted,
    pub keywords: Extracted,
}

impl CritiqueResult {
    /// 两段都缺失（批评者回复为空时使用）
    pub fn missing() -> Self {
        Self {
            suggestions: Extracted::Missing,
            keywords: Extracted::Missing,
        }
    }

    pub fn parse_succeeded(&self) -> bool {
        self.suggestions.is_found() && self.keywords.is_found()
    }

    pub fn suggestions_or_placeholder(&self) -> &str {
        self.suggestions.as_deref_or(SUGGESTIONS_PLACEHOLDER)
    }

    pub fn keywords_or_placeholder(&self) -> &str {
        self.keywords.as_deref_or(KEYWORDS_PLACEHOLDER)
    }
}

pub fn parse_critique(content: &str) -> CritiqueResult {
    CritiqueResult {
        suggestions: Extracted::from_capture(&SUGGESTIONS_RE, content),
        keywords: Extracted::from_capture(&KEYWORDS_RE, content),
    }
}
