//! 错误类型
//!
//! 只有配置错误与传输错误会中断流程；空输出、批评格式不符属于软失败，由编排器降级为占位文本，不在此列。

use thiserror::Error;

use crate::llm::LlmError;
use crate::tools::ToolError;

/// 应用级错误
#[derive(Error, Debug)]
pub enum ScribeError {
    /// 缺少必需凭据或配置无效，页面无法使用
    #[error("Config error: {0}")]
    Configuration(String),

    /// LLM 调用失败（网络 / API），不重试
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// 外部工具（arXiv / 和风天气）调用失败，不重试
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),
}

impl ScribeError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, ScribeError::Configuration(_))
    }
}
