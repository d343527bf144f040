//! 博客写作助手的默认 prompt 与展示文案
//!
//! 写作者与批评者的 prompt 可由 config/prompts/writer.txt、critic.txt 覆盖。

use crate::config::load_prompt_override;

pub const WRITER_NAME: &str = "写作者";
pub const CRITIC_NAME: &str = "批评者";

pub const DEFAULT_WRITER_PROMPT: &str =
    "你是一位优秀的AI内容写作者，请撰写一篇有吸引力且信息丰富的博客内容。";

pub const DEFAULT_CRITIC_PROMPT: &str = "作为一位严谨的批评者，请给出建设性的批评和改进建议，并基于相关主题使用已有的工具推荐一些参考文献，推荐的关键词应该是英语形式，简洁且切题。
请按照以下格式提供反馈：
1. 批评建议：
- （具体建议）
2. 推荐的关键词：
- （关键词1, 关键词2, ...）";

/// 批评者回复为空、未做检索时的文献占位
pub const LITERATURE_PLACEHOLDER: &str = "未检索到推荐文献";

pub fn writer_prompt() -> String {
    load_prompt_override("writer").unwrap_or_else(|| DEFAULT_WRITER_PROMPT.to_string())
}

pub fn critic_prompt() -> String {
    load_prompt_override("critic").unwrap_or_else(|| DEFAULT_CRITIC_PROMPT.to_string())
}

/// 用户话题 → 写作者的初始请求
pub fn topic_request(topic: &str) -> String {
    format!("请撰写一篇关于{topic}的博客文章，要求表达专业，生动有趣，并且易于理解。")
}

/// 批评与文献合并后的展示文本（替换批评者消息的正文）
pub fn critique_summary(suggestions: &str, literature: &str) -> String {
    format!("**批评建议**:\n{suggestions}\n\n**推荐的文献**:\n{literature}")
}

/// 交给写作者的改进请求
pub fn improvement_request(suggestions: &str, literature: &str) -> String {
    format!(
        "根据以下批评建议和推荐文献对内容进行改进：\n\n批评建议：\n{suggestions}\n\n推荐文献：\n{literature}\n\n请优化初始内容，使其更加清晰、丰富，并符合专业水准。"
    )
}
