//! 组件构建器：由配置、凭据与模型设置创建 LLM 客户端、博客编排器与天气助手
//!
//! Web 会话与测试共用同一套构建逻辑；测试可通过 with_llm / with_literature 注入替身。

use std::sync::Arc;
use std::time::Duration;

use crate::agent::PluginParser;
use crate::blogger::{Blogger, BloggerOptions};
use crate::config::AppConfig;
use crate::core::{Credentials, ModelSettings, ScribeError};
use crate::llm::{LlmClient, OpenAiClient};
use crate::tools::{ArxivSearch, LiteratureSearch, Tool, ToolRegistry};
use crate::weather::WeatherAssistant;

pub struct AssistantBuilder {
    config: AppConfig,
    credentials: Credentials,
    llm_override: Option<Arc<dyn LlmClient>>,
    literature_override: Option<Arc<dyn LiteratureSearch>>,
}

impl AssistantBuilder {
    pub fn new(config: AppConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
            llm_override: None,
            literature_override: None,
        }
    }

    /// 使用给定的 LLM 客户端，忽略模型设置
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm_override = Some(llm);
        self
    }

    /// 使用给定的文献检索实现替代 arXiv
    pub fn with_literature(mut self, literature: Arc<dyn LiteratureSearch>) -> Self {
        self.literature_override = Some(literature);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn default_settings(&self) -> ModelSettings {
        ModelSettings::from_config(&self.config)
    }

    pub fn build_llm(&self, settings: &ModelSettings) -> Result<Arc<dyn LlmClient>, ScribeError> {
        settings.validate()?;
        if let Some(llm) = &self.llm_override {
            return Ok(llm.clone());
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.llm.timeouts.request))
            .build()
            .map_err(|e| ScribeError::Configuration(format!("HTTP client: {e}")))?;
        tracing::info!(
            model = %settings.model_name,
            api_base = %settings.api_base,
            "creating LLM client"
        );
        Ok(Arc::new(
            OpenAiClient::new(
                &settings.api_base,
                &settings.model_name,
                self.credentials.llm_token(),
                self.config.llm.max_tokens,
            )
            .with_http_client(http),
        ))
    }

    /// 写作者挂载 ArxivSearch 的插件说明，批评者带前缀钩子
    pub fn build_blogger(&self, settings: &ModelSettings) -> Result<Blogger, ScribeError> {
        let llm = self.build_llm(settings)?;

        let arxiv = Arc::new(ArxivSearch::new(&self.config.arxiv));
        let mut writer_tools = ToolRegistry::new();
        writer_tools.register_arc(arxiv.clone() as Arc<dyn Tool>);
        let literature: Arc<dyn LiteratureSearch> = match &self.literature_override {
            Some(literature) => literature.clone(),
            None => arxiv,
        };

        let options = BloggerOptions::from_config(&self.config)
            .with_writer_format(Arc::new(PluginParser::for_tools(&writer_tools)));
        Ok(Blogger::new(llm, literature, options))
    }

    pub fn build_weather_assistant(
        &self,
        settings: &ModelSettings,
    ) -> Result<WeatherAssistant, ScribeError> {
        let llm = self.build_llm(settings)?;
        if self.credentials.weather_token().is_none() {
            tracing::warn!("weather token is not set, weather queries will fail");
        }
        Ok(WeatherAssistant::from_config(
            &self.config,
            llm,
            self.credentials.weather_token().map(String::from),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> AssistantBuilder {
        AssistantBuilder::new(AppConfig::default(), Credentials::new("sk-test", None).unwrap())
    }

    #[test]
    fn test_default_settings_from_config() {
        let settings = builder().default_settings();
        assert_eq!(settings.model_name, "internlm2.5-latest");
        assert!(settings.api_base.ends_with("/chat/completions"));
    }

    #[test]
    fn test_blank_model_is_configuration_error() {
        let settings = ModelSettings::new(" ", "https://example.com/v1");
        let err = builder().build_blogger(&settings).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_build_with_real_client() {
        let b = builder();
        assert!(b.build_blogger(&b.default_settings()).is_ok());
        assert!(b.build_weather_assistant(&b.default_settings()).is_ok());
    }
}
