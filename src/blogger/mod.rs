//! 博客写作助手：写作者生成初稿，批评者给出建议与关键词，检索 arXiv 文献后由写作者改进

pub mod critique;
pub mod events;
pub mod orchestrator;
pub mod prompts;

pub use critique::{
    parse_critique, CritiqueResult, Extracted, KEYWORDS_PLACEHOLDER, SUGGESTIONS_PLACEHOLDER,
};
pub use events::{BloggerEvent, Stage};
pub use orchestrator::{Blogger, BloggerOptions, BloggerPhase};
pub use prompts::{CRITIC_NAME, LITERATURE_PLACEHOLDER, WRITER_NAME};
