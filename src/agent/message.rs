//! Agent 之间传递的消息

use serde::{Deserialize, Serialize};

use crate::agent::parser::ParsedOutput;

/// Agent 消息：发送者、正文，以及输出格式解析器产出的结构化结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub sender: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted: Option<ParsedOutput>,
}

impl AgentMessage {
    pub fn new(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
            formatted: None,
        }
    }

    /// 替换正文，保留发送者
    pub fn with_content(self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self
        }
    }

    /// 仅空字符串算空；纯空白内容照常进入后续步骤
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
