//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（书生·浦语、DeepSeek、自建代理等）。
//! 页面上填写的 API Base 往往是完整的 `.../chat/completions` 地址，这里统一去掉该后缀再交给 async_openai。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};
use crate::memory::{Message, Role};

const CHAT_COMPLETIONS_SUFFIX: &str = "/chat/completions";

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// 去掉末尾的 `/` 与 `/chat/completions`，得到 async_openai 需要的 api_base
pub fn normalize_api_base(api_base: &str) -> String {
    let trimmed = api_base.trim().trim_end_matches('/');
    trimmed
        .strip_suffix(CHAT_COMPLETIONS_SUFFIX)
        .unwrap_or(trimmed)
        .to_string()
}

/// OpenAI 兼容客户端：持有 Client、model 名与输出上限，complete 时转 Message 为 API 格式并取首条 content
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u32,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(api_base: &str, model: &str, api_key: &str, max_tokens: u32) -> Self {
        let config = OpenAIConfig::new()
            .with_api_base(normalize_api_base(api_base))
            .with_api_key(api_key);

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            max_tokens,
            usage: TokenUsage::new(),
        }
    }

    /// 使用自定义 HTTP 客户端（用于设置请求超时）
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.client = self.client.with_http_client(http_client);
        self
    }

    fn to_openai_messages(
        &self,
        messages: &[Message],
    ) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        messages
            .iter()
            .map(|m| {
                let converted = match m.role {
                    Role::System => ChatCompletionRequestSystemMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map(ChatCompletionRequestMessage::System),
                    Role::User => ChatCompletionRequestUserMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map(ChatCompletionRequestMessage::User),
                    Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map(ChatCompletionRequestMessage::Assistant),
                };
                converted.map_err(|e| LlmError::InvalidRequest(e.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(self.to_openai_messages(messages)?)
            .max_completion_tokens(self.max_tokens)
            .build()
            .map_err(|e| LlmError::InvalidRequest(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
        }

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        tracing::debug!(
            model = %self.model,
            chars = content.chars().count(),
            "chat completion done"
        );
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_normalize_api_base() {
        assert_eq!(
            normalize_api_base("https://internlm-chat.intern-ai.org.cn/puyu/api/v1/chat/completions"),
            "https://internlm-chat.intern-ai.org.cn/puyu/api/v1"
        );
        assert_eq!(
            normalize_api_base("https://api.openai.com/v1/"),
            "https://api.openai.com/v1"
        );
        assert_eq!(
            normalize_api_base(" http://localhost:8000/v1/chat/completions/ "),
            "http://localhost:8000/v1"
        );
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1700000000,
                "model": "internlm2.5-latest",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "你好" },
                    "finish_reason": "stop"
                }],
                "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = OpenAiClient::new(
            &format!("{}/v1/chat/completions", mock_server.uri()),
            "internlm2.5-latest",
            "test-token",
            4096,
        );
        let reply = client
            .complete(&[Message::system("sys"), Message::user("hi")])
            .await
            .unwrap();

        assert_eq!(reply, "你好");
        assert_eq!(client.token_usage(), (12, 3, 15));
    }
}
