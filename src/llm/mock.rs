//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按顺序返回预设回复，并记录每次调用收到的消息，便于断言调用次数与 prompt 内容。
//! 预设回复用完后回显最后一条用户消息。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};
use crate::memory::{Message, Role};

/// 预设回复：成功文本或模拟的 API 错误
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Error(String),
}

/// Mock 客户端：依次弹出预设回复
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以一组文本回复创建
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        for r in replies {
            client.push_reply(r);
        }
        client
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.lock_replies().push_back(MockReply::Text(reply.into()));
    }

    pub fn push_error(&self, error: impl Into<String>) {
        self.lock_replies().push_back(MockReply::Error(error.into()));
    }

    /// 所有调用收到的消息（按调用顺序）
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<MockReply>> {
        self.replies.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }

        match self.lock_replies().pop_front() {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Error(e)) => Err(LlmError::Api(e)),
            None => {
                let last_user = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.as_str())
                    .unwrap_or("(no input)");
                Ok(format!("Echo from Mock: {}", last_user))
            }
        }
    }
}
