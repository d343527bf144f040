//! Web 接口：凭据表单、博客生成（NDJSON 流）、天气查询
//!
//! 每个浏览器会话（session_id）持有一个 DemoSession，同一会话内的请求串行执行。
//! session_id 只由服务端签发；未知或已过期的 id 会换发新会话，闲置超过 web.session_idle_secs 的会话被回收。
//! 配置错误（未录入 token、模型设置为空）返回 412；LLM / 工具传输错误在流中以 error 事件结束，天气接口返回 502。

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, Response},
    routing::{delete, get, post},
    Json, Router,
};
use bytes::Bytes;
use futures_util::stream;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::blogger::BloggerEvent;
use crate::config::AppConfig;
use crate::core::{
    AssistantBuilder, CredentialStore, Credentials, DemoSession, ModelSettings, ScribeError,
};
use crate::llm::LlmClient;
use crate::tools::LiteratureSearch;
use crate::weather::ToolStep;

/// 页面默认话题
pub const DEFAULT_TOPIC: &str = "Self-Supervised Learning";

const MISSING_TOKENS: &str = "请输入所有token";

struct SessionEntry {
    session: Arc<Mutex<DemoSession>>,
    last_used: Instant,
}

impl SessionEntry {
    /// 有请求仍持有该会话（如正在推流的博客任务）
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.session) > 1
    }
}

pub struct AppState {
    config: AppConfig,
    credentials: CredentialStore,
    sessions: RwLock<HashMap<String, SessionEntry>>,
    llm_override: Option<Arc<dyn LlmClient>>,
    literature_override: Option<Arc<dyn LiteratureSearch>>,
}

impl AppState {
    pub fn new(config: AppConfig, credentials: CredentialStore) -> Self {
        Self {
            config,
            credentials,
            sessions: RwLock::new(HashMap::new()),
            llm_override: None,
            literature_override: None,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm_override = Some(llm);
        self
    }

    pub fn with_literature(mut self, literature: Arc<dyn LiteratureSearch>) -> Self {
        self.literature_override = Some(literature);
        self
    }

    fn assistant_builder(&self, credentials: &Credentials) -> AssistantBuilder {
        let mut builder = AssistantBuilder::new(self.config.clone(), credentials.clone());
        if let Some(llm) = &self.llm_override {
            builder = builder.with_llm(llm.clone());
        }
        if let Some(literature) = &self.literature_override {
            builder = builder.with_literature(literature.clone());
        }
        builder
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// 取会话：先回收闲置会话，再按 id 查找；id 为空、未知或已过期时签发新 id
    async fn session(
        &self,
        session_id: Option<String>,
    ) -> Result<(String, Arc<Mutex<DemoSession>>), ScribeError> {
        let credentials = self.credentials.require()?;
        let idle_limit = Duration::from_secs(self.config.web.session_idle_secs);
        let now = Instant::now();

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| {
            entry.in_use() || now.duration_since(entry.last_used) < idle_limit
        });
        if sessions.len() < before {
            tracing::info!(evicted = before - sessions.len(), "idle sessions evicted");
        }

        if let Some(id) = session_id.filter(|s| !s.trim().is_empty()) {
            if let Some(entry) = sessions.get_mut(&id) {
                entry.last_used = now;
                return Ok((id, entry.session.clone()));
            }
            tracing::debug!(session_id = %id, "unknown session id, issuing a new one");
        }

        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Mutex::new(DemoSession::new(Arc::new(
            self.assistant_builder(credentials),
        ))));
        sessions.insert(
            id.clone(),
            SessionEntry {
                session: session.clone(),
                last_used: now,
            },
        );
        tracing::info!(session_id = %id, total = sessions.len(), "new session");
        Ok((id, session))
    }

    async fn remove_session(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    /// 请求中未填写的字段取配置默认值
    fn settings(&self, model_name: Option<String>, api_base: Option<String>) -> ModelSettings {
        let defaults = ModelSettings::from_config(&self.config);
        ModelSettings::new(
            model_name
                .map(|s| s.trim().to_string())
                .unwrap_or(defaults.model_name),
            api_base
                .map(|s| s.trim().to_string())
                .unwrap_or(defaults.api_base),
        )
    }
}

type ApiError = (StatusCode, String);

fn api_error(e: ScribeError) -> ApiError {
    let status = match &e {
        ScribeError::Configuration(_) => StatusCode::PRECONDITION_FAILED,
        ScribeError::Llm(_) | ScribeError::Tool(_) => StatusCode::BAD_GATEWAY,
    };
    tracing::warn!(status = %status, error = %e, "request failed");
    (status, e.to_string())
}

fn ndjson_line<T: Serialize>(value: &T) -> Bytes {
    let mut line = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    line.push('\n');
    Bytes::from(line)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/credentials", get(api_credentials_status).post(api_credentials_set))
        .route("/api/defaults", get(api_defaults))
        .route("/api/blog/stream", post(api_blog_stream))
        .route("/api/weather", post(api_weather))
        .route("/api/sessions/:id", delete(api_session_delete))
        .route("/api/health", get(|| async { "OK" }))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

#[derive(Debug, Serialize)]
struct CredentialsStatus {
    set: bool,
    weather: bool,
}

async fn api_credentials_status(State(state): State<Arc<AppState>>) -> Json<CredentialsStatus> {
    let creds = state.credentials.get();
    Json(CredentialsStatus {
        set: creds.is_some(),
        weather: creds.and_then(|c| c.weather_token()).is_some(),
    })
}

#[derive(Debug, Deserialize)]
struct CredentialsRequest {
    #[serde(default)]
    token: String,
    #[serde(default)]
    weather_token: String,
}

/// POST /api/credentials：两个 token 都必填；只能设置一次
async fn api_credentials_set(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<CredentialsStatus>, ApiError> {
    if req.token.trim().is_empty() || req.weather_token.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, MISSING_TOKENS.to_string()));
    }
    let creds = Credentials::new(req.token, Some(req.weather_token))
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    if !state.credentials.set(creds) {
        return Err((StatusCode::CONFLICT, "credentials already set".to_string()));
    }
    tracing::info!("credentials set from form");
    Ok(Json(CredentialsStatus {
        set: true,
        weather: true,
    }))
}

/// DELETE /api/sessions/:id：页面关闭或重置时释放会话
async fn api_session_delete(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> StatusCode {
    if state.remove_session(&session_id).await {
        tracing::info!(session_id = %session_id, "session removed");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Debug, Serialize)]
struct Defaults {
    model_name: String,
    api_base: String,
    topic: &'static str,
}

async fn api_defaults(State(state): State<Arc<AppState>>) -> Json<Defaults> {
    let settings = ModelSettings::from_config(&state.config);
    Json(Defaults {
        model_name: settings.model_name,
        api_base: settings.api_base,
        topic: DEFAULT_TOPIC,
    })
}

#[derive(Debug, Deserialize)]
struct BlogRequest {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    model_name: Option<String>,
    #[serde(default)]
    api_base: Option<String>,
}

/// POST /api/blog/stream：NDJSON，首行为 session_id，之后依次为各步骤事件
async fn api_blog_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BlogRequest>,
) -> Result<Response, ApiError> {
    let topic = req
        .topic
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
    let settings = state.settings(req.model_name, req.api_base);
    let (session_id, session) = state.session(req.session_id).await.map_err(api_error)?;

    // 在开始推流前完成构建，配置错误直接以 412 返回
    let mut guard = session.lock_owned().await;
    guard.blogger(&settings).map_err(api_error)?;

    let (event_tx, event_rx) = mpsc::unbounded_channel::<BloggerEvent>();
    tokio::spawn(async move {
        tracing::info!(topic = %topic, "blog generation started");
        let result = match guard.blogger(&settings) {
            Ok(blogger) => blogger.write_about(&topic, Some(&event_tx)).await.map(|_| ()),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => tracing::info!("blog generation finished"),
            Err(e) => {
                tracing::error!(error = %e, "blog generation interrupted");
                let _ = event_tx.send(BloggerEvent::Error {
                    text: e.to_string(),
                });
            }
        }
    });

    let first_line = ndjson_line(&serde_json::json!({
        "type": "session_id",
        "session_id": session_id
    }));
    let stream = stream::try_unfold(
        (event_rx, Some(first_line)),
        |(mut event_rx, first_line)| async move {
            if let Some(line) = first_line {
                return Ok::<_, Infallible>(Some((line, (event_rx, None))));
            }
            Ok(event_rx
                .recv()
                .await
                .map(|ev| (ndjson_line(&ev), (event_rx, None))))
        },
    );

    let mut res = Response::new(Body::from_stream(stream));
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-ndjson; charset=utf-8"),
    );
    Ok(res)
}

#[derive(Debug, Deserialize)]
struct WeatherRequest {
    #[serde(default)]
    session_id: Option<String>,
    query: String,
    #[serde(default)]
    model_name: Option<String>,
    #[serde(default)]
    api_base: Option<String>,
}

#[derive(Debug, Serialize)]
struct WeatherResponse {
    session_id: String,
    answer: String,
    steps: Vec<ToolStep>,
}

async fn api_weather(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WeatherRequest>,
) -> Result<Json<WeatherResponse>, ApiError> {
    let query = req.query.trim().to_string();
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "query is required".to_string()));
    }
    let settings = state.settings(req.model_name, req.api_base);
    let (session_id, session) = state.session(req.session_id).await.map_err(api_error)?;

    let mut session = session.lock().await;
    let reply = session
        .weather_assistant(&settings)
        .map_err(api_error)?
        .chat(&query)
        .await
        .map_err(api_error)?;
    Ok(Json(WeatherResponse {
        session_id,
        answer: reply.answer,
        steps: reply.steps,
    }))
}
