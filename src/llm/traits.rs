//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 LlmClient：complete 发起一次非流式补全，失败直接返回错误，不做重试。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::Message;

/// LLM 调用错误（传输层失败原样上抛，由调用方决定如何展示）
#[derive(Error, Debug)]
pub enum LlmError {
    /// 请求构造失败（参数非法等）
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 网络或 API 返回错误
    #[error("API error: {0}")]
    Api(String),
}

/// LLM 客户端 trait：一次补全返回模型回复文本（可能为空）
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
