//! 会话状态：每个浏览器会话持有自己的博客编排器与天气助手
//!
//! 模型名或 API 地址变化时重建，否则复用（Agent 的短期记忆随之保留）。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::blogger::Blogger;
use crate::config::AppConfig;
use crate::core::{AssistantBuilder, ScribeError};
use crate::weather::WeatherAssistant;

/// 页面上可修改的模型设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub model_name: String,
    pub api_base: String,
}

impl ModelSettings {
    pub fn new(model_name: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            api_base: api_base.into(),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(cfg.llm.model.clone(), cfg.llm.api_base.clone())
    }

    pub fn validate(&self) -> Result<(), ScribeError> {
        if self.model_name.trim().is_empty() {
            return Err(ScribeError::Configuration("model name is empty".to_string()));
        }
        if self.api_base.trim().is_empty() {
            return Err(ScribeError::Configuration("API base is empty".to_string()));
        }
        Ok(())
    }
}

pub struct DemoSession {
    builder: Arc<AssistantBuilder>,
    blogger: Option<(ModelSettings, Blogger)>,
    weather: Option<(ModelSettings, WeatherAssistant)>,
}

impl DemoSession {
    pub fn new(builder: Arc<AssistantBuilder>) -> Self {
        Self {
            builder,
            blogger: None,
            weather: None,
        }
    }

    /// 当前编排器使用的设置
    pub fn blogger_settings(&self) -> Option<&ModelSettings> {
        self.blogger.as_ref().map(|(settings, _)| settings)
    }

    pub fn blogger(&mut self, settings: &ModelSettings) -> Result<&mut Blogger, ScribeError> {
        let slot = match self.blogger.take() {
            Some((current, blogger)) if &current == settings => (current, blogger),
            _ => {
                tracing::info!(model = %settings.model_name, "building blogger");
                (settings.clone(), self.builder.build_blogger(settings)?)
            }
        };
        let (_, blogger) = self.blogger.insert(slot);
        Ok(blogger)
    }

    pub fn weather_assistant(
        &mut self,
        settings: &ModelSettings,
    ) -> Result<&mut WeatherAssistant, ScribeError> {
        let slot = match self.weather.take() {
            Some((current, assistant)) if &current == settings => (current, assistant),
            _ => {
                tracing::info!(model = %settings.model_name, "building weather assistant");
                (settings.clone(), self.builder.build_weather_assistant(settings)?)
            }
        };
        let (_, assistant) = self.weather.insert(slot);
        Ok(assistant)
    }
}
