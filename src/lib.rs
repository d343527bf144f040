//! Scribe - 写作者/批评者多智能体博客助手
//!
//! 模块划分：
//! - **agent**: Agent 封装（prompt、消息钩子、插件调用解析、短期记忆）
//! - **blogger**: 博客编排（初稿 → 批评与文献推荐 → 改进）与批评解析
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、凭据、组件构建、会话状态
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 对话消息与短期记忆
//! - **tools**: 工具箱（arXiv 检索、和风天气）与注册表
//! - **weather**: 天气查询助手
//! - **web**: HTTP 接口与页面（feature `web`）

pub mod agent;
pub mod blogger;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod tools;
pub mod weather;
#[cfg(feature = "web")]
pub mod web;

pub use blogger::{Blogger, BloggerEvent};
pub use crate::core::{CredentialStore, Credentials, ScribeError};
