//! 输出格式解析：插件调用（PluginParser）
//!
//! 模型以 `<|action_start|><|plugin|>{"name": ..., "parameters": {...}}<|action_end|>` 发起工具调用，
//! 标记之前的文字为思考内容。没有标记视为直接给出答案。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::{plugin_call_schema_json, ToolRegistry};

pub const ACTION_BEGIN: &str = "<|action_start|><|plugin|>";
pub const ACTION_END: &str = "<|action_end|>";

/// 插件 prompt 模板，{prompt} 处填入可用工具描述
pub const PLUGIN_CN: &str = "你可以使用如下工具：\n{prompt}\n如果你已经获得足够信息，请直接给出答案. 避免不必要的工具调用! 同时注意你可以使用的工具，不要随意捏造！";

/// 解析出的插件调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginCall {
    pub name: String,
    #[serde(default)]
    pub parameters: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    /// 没有工具调用
    Finished,
    /// 合法的工具调用
    ToolCall,
    /// 有调用标记但 JSON 不合法
    Invalid,
}

/// 结构化输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedOutput {
    pub thought: String,
    pub action: Option<PluginCall>,
    pub status: ParseStatus,
}

/// 输出格式：向 system prompt 追加格式说明，并把回复解析为结构化结果
pub trait OutputFormat: Send + Sync {
    fn format_instruction(&self) -> String;

    fn parse_response(&self, content: &str) -> ParsedOutput;
}

/// 插件调用解析器
#[derive(Debug, Clone)]
pub struct PluginParser {
    template: String,
    tools_prompt: String,
}

impl PluginParser {
    pub fn new(template: impl Into<String>, tools_prompt: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            tools_prompt: tools_prompt.into(),
        }
    }

    /// 使用 PLUGIN_CN 模板，工具描述取自注册表
    pub fn for_tools(tools: &ToolRegistry) -> Self {
        Self::new(PLUGIN_CN, tools.to_schema_json())
    }
}

impl OutputFormat for PluginParser {
    fn format_instruction(&self) -> String {
        format!(
            "{}\n调用工具时，请先写出思考，然后输出：{}<JSON>{}\n其中 JSON 满足以下 Schema：\n{}",
            self.template.replace("{prompt}", &self.tools_prompt),
            ACTION_BEGIN,
            ACTION_END,
            plugin_call_schema_json()
        )
    }

    fn parse_response(&self, content: &str) -> ParsedOutput {
        let Some(start) = content.find(ACTION_BEGIN) else {
            return ParsedOutput {
                thought: content.trim().to_string(),
                action: None,
                status: ParseStatus::Finished,
            };
        };

        let thought = content[..start].trim().to_string();
        let rest = &content[start + ACTION_BEGIN.len()..];
        let body = rest.find(ACTION_END).map_or(rest, |end| &rest[..end]);

        match serde_json::from_str::<PluginCall>(body.trim()) {
            Ok(call) => ParsedOutput {
                thought,
                action: Some(call),
                status: ParseStatus::ToolCall,
            },
            Err(e) => {
                tracing::warn!(error = %e, "invalid plugin call");
                ParsedOutput {
                    thought,
                    action: None,
                    status: ParseStatus::Invalid,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> PluginParser {
        PluginParser::new(PLUGIN_CN, "[]")
    }

    #[test]
    fn test_plain_answer() {
        let out = parser().parse_response("  今天天气不错。 ");
        assert_eq!(out.status, ParseStatus::Finished);
        assert_eq!(out.thought, "今天天气不错。");
        assert!(out.action.is_none());
    }

    #[test]
    fn test_tool_call() {
        let reply = "我需要查询天气。\n<|action_start|><|plugin|>\n{\"name\": \"WeatherQuery\", \"parameters\": {\"query\": \"北京\"}}<|action_end|>\n";
        let out = parser().parse_response(reply);
        assert_eq!(out.status, ParseStatus::ToolCall);
        assert_eq!(out.thought, "我需要查询天气。");
        let call = out.action.unwrap();
        assert_eq!(call.name, "WeatherQuery");
        assert_eq!(call.parameters["query"], "北京");
    }

    #[test]
    fn test_invalid_call() {
        let out = parser().parse_response("想想<|action_start|><|plugin|>{not json}<|action_end|>");
        assert_eq!(out.status, ParseStatus::Invalid);
        assert_eq!(out.thought, "想想");
        assert!(out.action.is_none());
    }

    #[test]
    fn test_instruction_contains_tools() {
        let instruction = PluginParser::new(PLUGIN_CN, "[{\"name\": \"ArxivSearch\"}]").format_instruction();
        assert!(instruction.starts_with("你可以使用如下工具：\n[{\"name\": \"ArxivSearch\"}]"));
        assert!(instruction.contains(ACTION_BEGIN));
    }
}
