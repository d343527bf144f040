//! 记忆层：Agent 的短期对话记忆

pub mod conversation;

pub use conversation::{ConversationMemory, Message, Role};
