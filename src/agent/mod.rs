//! Agent 封装：prompt + 名称 + 可选输出格式 + 消息钩子 + 短期记忆，每次 call 发起一次 LLM 请求
//!
//! call 流程：钩子变换输入 → 拼接 system prompt 与记忆 → LLM 补全 → 输出格式解析 → 写回记忆。
//! LLM 错误直接上抛，不重试；空回复视为合法结果。

pub mod hooks;
pub mod message;
pub mod parser;

use std::sync::Arc;

pub use hooks::{ContentTransform, MessageHook, SenderMatch};
pub use message::AgentMessage;
pub use parser::{OutputFormat, ParseStatus, ParsedOutput, PluginCall, PluginParser, PLUGIN_CN};

use crate::llm::{LlmClient, LlmError};
use crate::memory::{ConversationMemory, Message};

pub struct Agent {
    name: String,
    prompt: String,
    llm: Arc<dyn LlmClient>,
    output_format: Option<Arc<dyn OutputFormat>>,
    hooks: Vec<MessageHook>,
    memory: ConversationMemory,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        prompt: impl Into<String>,
        llm: Arc<dyn LlmClient>,
        max_context_turns: usize,
    ) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            llm,
            output_format: None,
            hooks: Vec::new(),
            memory: ConversationMemory::new(max_context_turns),
        }
    }

    pub fn with_output_format(mut self, output_format: Arc<dyn OutputFormat>) -> Self {
        self.output_format = Some(output_format);
        self
    }

    pub fn with_hook(mut self, hook: MessageHook) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn history(&self) -> &[Message] {
        self.memory.messages()
    }

    /// 清空短期记忆
    pub fn reset(&mut self) {
        self.memory.clear();
    }

    fn system_prompt(&self) -> String {
        match &self.output_format {
            Some(format) => format!("{}\n\n{}", self.prompt.trim(), format.format_instruction()),
            None => self.prompt.trim().to_string(),
        }
    }

    /// 自己发出的消息作为 assistant，其余作为 user
    fn to_llm_message(&self, message: &AgentMessage) -> Message {
        if message.sender == self.name {
            Message::assistant(message.content.clone())
        } else {
            Message::user(message.content.clone())
        }
    }

    pub async fn call(&mut self, message: AgentMessage) -> Result<AgentMessage, LlmError> {
        let message = self
            .hooks
            .iter()
            .fold(message, |msg, hook| hook.apply(msg));
        let incoming = self.to_llm_message(&message);

        let mut request = Vec::with_capacity(self.memory.len() + 2);
        request.push(Message::system(self.system_prompt()));
        request.extend_from_slice(self.memory.messages());
        request.push(incoming.clone());

        tracing::debug!(
            agent = %self.name,
            from = %message.sender,
            history = self.memory.len(),
            "agent call"
        );
        let reply = self.llm.complete(&request).await?;
        if reply.is_empty() {
            tracing::warn!(agent = %self.name, "empty reply from LLM");
        }

        self.memory.push(incoming);
        self.memory.push(Message::assistant(reply.clone()));

        let formatted = self
            .output_format
            .as_ref()
            .map(|format| format.parse_response(&reply));

        Ok(AgentMessage {
            sender: self.name.clone(),
            content: reply,
            formatted,
        })
    }
}
