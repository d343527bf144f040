//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SCRIBE__*` 覆盖（双下划线表示嵌套，如 `SCRIBE__LLM__MODEL=internlm2.5-latest`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub credentials: CredentialsSection,
    pub blogger: BloggerSection,
    pub arxiv: ArxivSection,
    pub weather: WeatherSection,
    pub web: WebSection,
}

/// [app] 段：Agent 短期记忆轮数、启动时的凭据要求
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    /// 每个 Agent 保留的对话轮数（短期记忆）
    #[serde(default = "default_max_context_turns")]
    pub max_context_turns: usize,
    /// 启动时若缺少 LLM token 是否直接退出（否则等待页面表单录入）
    #[serde(default)]
    pub require_credentials_at_startup: bool,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            max_context_turns: default_max_context_turns(),
            require_credentials_at_startup: false,
        }
    }
}

fn default_max_context_turns() -> usize {
    20
}

/// [llm] 段：默认模型、API 地址、输出长度与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_model")]
    pub model: String,
    /// 完整的 chat/completions 地址或其前缀均可
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base: default_api_base(),
            max_tokens: default_max_tokens(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_model() -> String {
    "internlm2.5-latest".to_string()
}

fn default_api_base() -> String {
    "https://internlm-chat.intern-ai.org.cn/puyu/api/v1/chat/completions".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    120
}

/// [credentials] 段：LLM token 与和风天气 token（也可由页面表单录入）
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsSection {
    pub llm_token: Option<String>,
    pub weather_token: Option<String>,
}

/// [blogger] 段：写作者/批评者编排
#[derive(Debug, Clone, Deserialize)]
pub struct BloggerSection {
    /// 保留的轮次上限；编排固定执行一轮三步，该值不参与控制流
    #[serde(default = "default_blogger_max_turn")]
    pub max_turn: usize,
    /// 为 false 时每次生成前清空两个 Agent 的记忆
    #[serde(default)]
    pub keep_history_across_runs: bool,
    #[serde(default = "default_critic_prefix")]
    pub critic_prefix: String,
}

impl Default for BloggerSection {
    fn default() -> Self {
        Self {
            max_turn: default_blogger_max_turn(),
            keep_history_across_runs: false,
            critic_prefix: default_critic_prefix(),
        }
    }
}

fn default_blogger_max_turn() -> usize {
    2
}

fn default_critic_prefix() -> String {
    "请批评以下内容，并提供改进建议：\n\n".to_string()
}

/// [arxiv] 段：arXiv 检索接口与结果截断
#[derive(Debug, Clone, Deserialize)]
pub struct ArxivSection {
    #[serde(default = "default_arxiv_base_url")]
    pub base_url: String,
    #[serde(default = "default_top_k_results")]
    pub top_k_results: usize,
    #[serde(default = "default_max_query_len")]
    pub max_query_len: usize,
    #[serde(default = "default_doc_content_chars_max")]
    pub doc_content_chars_max: usize,
    #[serde(default = "default_arxiv_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ArxivSection {
    fn default() -> Self {
        Self {
            base_url: default_arxiv_base_url(),
            top_k_results: default_top_k_results(),
            max_query_len: default_max_query_len(),
            doc_content_chars_max: default_doc_content_chars_max(),
            timeout_secs: default_arxiv_timeout_secs(),
        }
    }
}

fn default_arxiv_base_url() -> String {
    "http://export.arxiv.org/api/query".to_string()
}

fn default_top_k_results() -> usize {
    3
}

fn default_max_query_len() -> usize {
    300
}

fn default_doc_content_chars_max() -> usize {
    1500
}

fn default_arxiv_timeout_secs() -> u64 {
    30
}

/// [weather] 段：和风天气接口与天气助手的工具调用轮数
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherSection {
    #[serde(default = "default_geo_url")]
    pub geo_url: String,
    #[serde(default = "default_now_url")]
    pub now_url: String,
    #[serde(default = "default_weather_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_weather_max_turn")]
    pub max_turn: usize,
}

impl Default for WeatherSection {
    fn default() -> Self {
        Self {
            geo_url: default_geo_url(),
            now_url: default_now_url(),
            timeout_secs: default_weather_timeout_secs(),
            max_turn: default_weather_max_turn(),
        }
    }
}

fn default_geo_url() -> String {
    "https://geoapi.qweather.com/v2/city/lookup".to_string()
}

fn default_now_url() -> String {
    "https://devapi.qweather.com/v7/weather/now".to_string()
}

fn default_weather_timeout_secs() -> u64 {
    15
}

fn default_weather_max_turn() -> usize {
    4
}

/// [web] 段
#[derive(Debug, Clone, Deserialize)]
pub struct WebSection {
    #[serde(default = "default_port")]
    pub port: u16,
    /// 会话闲置超过该秒数即被回收
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

impl Default for WebSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_session_idle_secs() -> u64 {
    3600
}

/// 从 config 目录加载配置，环境变量 SCRIBE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SCRIBE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SCRIBE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

/// 读取 prompt 覆盖文件：config/prompts/{name}.txt，不存在时返回 None
pub fn load_prompt_override(name: &str) -> Option<String> {
    [
        format!("config/prompts/{name}.txt"),
        format!("../config/prompts/{name}.txt"),
    ]
    .into_iter()
    .find_map(|p| std::fs::read_to_string(p).ok())
    .filter(|s| !s.trim().is_empty())
}
