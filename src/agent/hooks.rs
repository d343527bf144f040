//! 消息钩子：Agent 调用 LLM 前，对指定发送者的消息依次应用变换
//!
//! 钩子不修改调用方持有的消息，而是返回变换后的副本；
//! 同一条写作者草稿交给批评者加前缀后，写作者记忆中的原文不受影响。

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::agent::AgentMessage;

/// 正文变换函数
pub type ContentTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// 发送者匹配条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SenderMatch {
    Any,
    OneOf(HashSet<String>),
}

impl SenderMatch {
    pub fn one_of<I, S>(senders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::OneOf(senders.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, sender: &str) -> bool {
        match self {
            SenderMatch::Any => true,
            SenderMatch::OneOf(names) => names.contains(sender),
        }
    }
}

/// 钩子：发送者条件 + 有序变换列表
#[derive(Clone)]
pub struct MessageHook {
    senders: SenderMatch,
    transforms: Vec<ContentTransform>,
}

impl MessageHook {
    pub fn new(senders: SenderMatch) -> Self {
        Self {
            senders,
            transforms: Vec::new(),
        }
    }

    /// 给来自 senders 的消息加前缀（批评者用它给写作者的草稿加上「请批评以下内容」）
    pub fn prefix<I, S>(prefix: impl Into<String>, senders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefix = prefix.into();
        Self::new(SenderMatch::one_of(senders))
            .with_transform(move |content| format!("{prefix}{content}"))
    }

    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.transforms.push(Arc::new(transform));
        self
    }

    /// 发送者匹配时按顺序应用全部变换，否则原样返回
    pub fn apply(&self, message: AgentMessage) -> AgentMessage {
        if !self.senders.matches(&message.sender) {
            return message;
        }
        let content = self
            .transforms
            .iter()
            .fold(message.content.clone(), |acc, t| t(&acc));
        message.with_content(content)
    }
}

impl fmt::Debug for MessageHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageHook")
            .field("senders", &self.senders)
            .field("transforms", &self.transforms.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_only_matching_sender() {
        let hook = MessageHook::prefix("请批评：", ["写作者"]);

        let from_writer = hook.apply(AgentMessage::new("写作者", "草稿"));
        assert_eq!(from_writer.content, "请批评：草稿");

        let from_user = hook.apply(AgentMessage::new("user", "草稿"));
        assert_eq!(from_user.content, "草稿");
    }

    #[test]
    fn test_transforms_apply_in_order() {
        let hook = MessageHook::new(SenderMatch::Any)
            .with_transform(|c| format!("{c}1"))
            .with_transform(|c| format!("{c}2"));
        assert_eq!(hook.apply(AgentMessage::new("x", "0")).content, "012");
    }

    #[test]
    fn test_original_message_untouched() {
        let hook = MessageHook::prefix(">", ["a"]);
        let original = AgentMessage::new("a", "text");
        let transformed = hook.apply(original.clone());
        assert_eq!(original.content, "text");
        assert_eq!(transformed.content, ">text");
    }
}
