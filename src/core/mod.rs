//! 核心层：错误类型、凭据、组件构建与会话状态

pub mod builder;
pub mod credentials;
pub mod error;
pub mod session;

pub use builder::AssistantBuilder;
pub use credentials::{CredentialStore, Credentials};
pub use error::ScribeError;
pub use session::{DemoSession, ModelSettings};
