//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::{MockLlmClient, MockReply};
pub use openai::{normalize_api_base, OpenAiClient, TokenUsage};
pub use traits::{LlmClient, LlmError};
