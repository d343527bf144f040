//! 天气查询助手：插件调用循环
//!
//! 每轮调用一次 Agent；回复中带合法的工具调用则执行工具，把结果以 environment 身份回传，
//! 否则把回复作为答案返回。工具失败（未知工具、参数错误、接口错误）只作为观察结果回传给模型。

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::agent::{Agent, AgentMessage, ParseStatus, PluginParser};
use crate::config::{load_prompt_override, AppConfig};
use crate::core::ScribeError;
use crate::llm::LlmClient;
use crate::tools::{ToolRegistry, WeatherQuery};

pub const WEATHER_AGENT_NAME: &str = "天气助手";

/// 工具结果回传给 Agent 时使用的发送者
pub const ENVIRONMENT_SENDER: &str = "environment";

pub const DEFAULT_WEATHER_PROMPT: &str = "你是一个天气查询助手。当用户询问某个城市的天气时，请调用 WeatherQuery 工具获取实时天气，再用简洁的中文回答用户。";

pub fn weather_prompt() -> String {
    load_prompt_override("weather").unwrap_or_else(|| DEFAULT_WEATHER_PROMPT.to_string())
}

/// 一次工具调用记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolStep {
    pub tool: String,
    pub parameters: Value,
    pub observation: String,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReply {
    pub answer: String,
    pub steps: Vec<ToolStep>,
}

pub struct WeatherAssistant {
    agent: Agent,
    tools: ToolRegistry,
    max_turn: usize,
}

impl WeatherAssistant {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: ToolRegistry,
        prompt: impl Into<String>,
        max_turn: usize,
        max_context_turns: usize,
    ) -> Self {
        let parser = PluginParser::for_tools(&tools);
        let agent = Agent::new(WEATHER_AGENT_NAME, prompt, llm, max_context_turns)
            .with_output_format(Arc::new(parser));
        Self {
            agent,
            tools,
            max_turn: max_turn.max(1),
        }
    }

    /// 注册 WeatherQuery 并使用配置中的 prompt 与轮数
    pub fn from_config(
        cfg: &AppConfig,
        llm: Arc<dyn LlmClient>,
        weather_token: Option<String>,
    ) -> Self {
        let mut tools = ToolRegistry::new();
        tools.register(WeatherQuery::new(&cfg.weather, weather_token));
        Self::new(
            llm,
            tools,
            weather_prompt(),
            cfg.weather.max_turn,
            cfg.app.max_context_turns,
        )
    }

    pub fn history_len(&self) -> usize {
        self.agent.history().len()
    }

    pub async fn chat(&mut self, query: &str) -> Result<WeatherReply, ScribeError> {
        let mut message = AgentMessage::new("user", query);
        let mut steps = Vec::new();
        let mut last_answer = String::new();

        for turn in 0..self.max_turn {
            let reply = self.agent.call(message).await?;
            let formatted = reply.formatted.clone();

            let call = match formatted {
                Some(parsed) if parsed.status == ParseStatus::ToolCall => {
                    last_answer = parsed.thought;
                    parsed.action
                }
                _ => None,
            };
            let Some(call) = call else {
                return Ok(WeatherReply {
                    answer: reply.content.trim().to_string(),
                    steps,
                });
            };

            tracing::info!(turn, tool = %call.name, "weather assistant tool call");
            let (observation, success) =
                match self.tools.execute(&call.name, call.parameters.clone()).await {
                    Ok(out) => (out, true),
                    Err(e) => {
                        tracing::warn!(tool = %call.name, error = %e, "tool call failed");
                        (format!("Error: {e}"), false)
                    }
                };
            steps.push(ToolStep {
                tool: call.name,
                parameters: call.parameters,
                observation: observation.clone(),
                success,
            });
            message = AgentMessage::new(ENVIRONMENT_SENDER, observation);
        }

        tracing::warn!(max_turn = self.max_turn, "weather assistant ran out of turns");
        Ok(WeatherReply {
            answer: last_answer,
            steps,
        })
    }
}
