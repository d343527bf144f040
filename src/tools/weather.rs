//! 和风天气查询工具
//!
//! 两步请求：城市搜索（geo）得到 location id，再查实时天气（now）。接口以 JSON 的 `code` 字段表示结果，"200" 为成功。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::WeatherSection;
use crate::tools::{Tool, ToolError};

#[derive(Debug, Deserialize)]
struct GeoResponse {
    code: String,
    #[serde(default)]
    location: Vec<GeoLocation>,
}

#[derive(Debug, Deserialize)]
struct GeoLocation {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct NowResponse {
    code: String,
    now: Option<WeatherNow>,
}

/// 实时天气（字段名与和风天气接口一致）
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherNow {
    pub obs_time: String,
    pub temp: String,
    pub feels_like: String,
    pub text: String,
    pub wind_dir: String,
    pub wind_scale: String,
    pub humidity: String,
}

/// 天气查询工具：持有和风天气 token；未配置 token 时调用返回错误
pub struct WeatherQuery {
    client: Client,
    geo_url: String,
    now_url: String,
    api_key: Option<String>,
}

impl WeatherQuery {
    pub fn new(config: &WeatherSection, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "QWeather client build failed, falling back to defaults");
                Client::new()
            });
        Self {
            client,
            geo_url: config.geo_url.clone(),
            now_url: config.now_url.clone(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    fn api_key(&self) -> Result<&str, ToolError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ToolError::InvalidArgs("weather token is not set".to_string()))
    }

    async fn lookup_location(&self, city: &str) -> Result<GeoLocation, ToolError> {
        let resp: GeoResponse = self
            .client
            .get(&self.geo_url)
            .query(&[("location", city), ("key", self.api_key()?)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if resp.code != "200" {
            return Err(ToolError::Api(format!("city lookup failed, code {}", resp.code)));
        }
        resp.location
            .into_iter()
            .next()
            .ok_or_else(|| ToolError::Api(format!("city not found: {city}")))
    }

    async fn now(&self, location_id: &str) -> Result<WeatherNow, ToolError> {
        let resp: NowResponse = self
            .client
            .get(&self.now_url)
            .query(&[("location", location_id), ("key", self.api_key()?)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if resp.code != "200" {
            return Err(ToolError::Api(format!("weather query failed, code {}", resp.code)));
        }
        resp.now
            .ok_or_else(|| ToolError::Api("weather response has no `now` field".to_string()))
    }

    /// 查询城市实时天气并格式化为一句中文描述
    pub async fn query(&self, city: &str) -> Result<String, ToolError> {
        tracing::info!(city = %city, "weather query");
        let location = self.lookup_location(city).await?;
        let now = self.now(&location.id).await?;
        Ok(format!(
            "{}当前天气：{}，温度 {}℃，体感温度 {}℃，{} {}级，相对湿度 {}%，观测时间 {}",
            location.name,
            now.text,
            now.temp,
            now.feels_like,
            now.wind_dir,
            now.wind_scale,
            now.humidity,
            now.obs_time
        ))
    }
}

#[async_trait]
impl Tool for WeatherQuery {
    fn name(&self) -> &str {
        "WeatherQuery"
    }

    fn description(&self) -> &str {
        "一个天气查询 API，可以根据城市名查询实时天气。Args: {\"query\": \"城市名\"}"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "要查询的城市名" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let city = args
            .get("query")
            .or_else(|| args.get("city"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim();
        if city.is_empty() {
            return Err(ToolError::InvalidArgs("Missing query".to_string()));
        }
        self.query(city).await
    }
}
