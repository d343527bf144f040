//! 凭据：LLM token（必需）与和风天气 token（可选）
//!
//! 来源优先级：[credentials] 配置段 / SCRIBE__CREDENTIALS__*，其次环境变量 `token`、`weather_token`，
//! 最后由页面表单录入。进程内只设置一次，之后只读。

use std::fmt;
use std::sync::OnceLock;

use crate::config::AppConfig;
use crate::core::ScribeError;

/// 兼容的环境变量名
pub const LLM_TOKEN_ENV: &str = "token";
pub const WEATHER_TOKEN_ENV: &str = "weather_token";

/// 已校验的凭据：llm_token 非空
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    llm_token: String,
    weather_token: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Credentials {
    pub fn new(
        llm_token: impl Into<String>,
        weather_token: Option<String>,
    ) -> Result<Self, ScribeError> {
        let llm_token = non_empty(Some(llm_token.into())).ok_or_else(|| {
            ScribeError::Configuration("LLM token is missing or empty".to_string())
        })?;
        Ok(Self {
            llm_token,
            weather_token: non_empty(weather_token),
        })
    }

    /// 从配置读取，缺失时回退到环境变量 `token` / `weather_token`
    pub fn from_config(cfg: &AppConfig) -> Result<Self, ScribeError> {
        let llm_token = non_empty(cfg.credentials.llm_token.clone())
            .or_else(|| non_empty(std::env::var(LLM_TOKEN_ENV).ok()))
            .unwrap_or_default();
        let weather_token = non_empty(cfg.credentials.weather_token.clone())
            .or_else(|| non_empty(std::env::var(WEATHER_TOKEN_ENV).ok()));
        Self::new(llm_token, weather_token)
    }

    pub fn llm_token(&self) -> &str {
        &self.llm_token
    }

    pub fn weather_token(&self) -> Option<&str> {
        self.weather_token.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("llm_token", &"***")
            .field("weather_token", &self.weather_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// 进程级凭据存储：首次设置后不可更改
#[derive(Debug, Default)]
pub struct CredentialStore {
    inner: OnceLock<Credentials>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 配置或环境变量中已有 token 时预先填入
    pub fn from_config(cfg: &AppConfig) -> Self {
        let store = Self::new();
        match Credentials::from_config(cfg) {
            Ok(creds) => {
                let _ = store.inner.set(creds);
                tracing::info!("credentials loaded from config/environment");
            }
            Err(_) => tracing::info!("no LLM token configured, waiting for form input"),
        }
        store
    }

    /// 同 from_config；app.require_credentials_at_startup 开启时缺少 token 为配置错误
    pub fn from_config_checked(cfg: &AppConfig) -> Result<Self, ScribeError> {
        let store = Self::from_config(cfg);
        if cfg.app.require_credentials_at_startup {
            store.require()?;
        }
        Ok(store)
    }

    /// 设置凭据；已设置过时返回 false
    pub fn set(&self, credentials: Credentials) -> bool {
        self.inner.set(credentials).is_ok()
    }

    pub fn get(&self) -> Option<&Credentials> {
        self.inner.get()
    }

    /// 取凭据；未设置为配置错误
    pub fn require(&self) -> Result<&Credentials, ScribeError> {
        self.inner
            .get()
            .ok_or_else(|| ScribeError::Configuration("请输入所有token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_llm_token_rejected() {
        let err = Credentials::new("   ", Some("w".to_string())).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_tokens_trimmed_and_weather_optional() {
        let creds = Credentials::new(" sk-1 ", Some(String::new())).unwrap();
        assert_eq!(creds.llm_token(), "sk-1");
        assert_eq!(creds.weather_token(), None);
        assert!(!format!("{creds:?}").contains("sk-1"));
    }

    #[test]
    fn test_from_config_section() {
        let mut cfg = AppConfig::default();
        cfg.credentials.llm_token = Some("sk-config".to_string());
        cfg.credentials.weather_token = Some("qw".to_string());
        let creds = Credentials::from_config(&cfg).unwrap();
        assert_eq!(creds.llm_token(), "sk-config");
        assert_eq!(creds.weather_token(), Some("qw"));
    }

    #[test]
    fn test_required_at_startup() {
        let mut cfg = AppConfig::default();
        cfg.app.require_credentials_at_startup = true;
        cfg.credentials.llm_token = Some("  ".to_string());
        if std::env::var(LLM_TOKEN_ENV).is_err() {
            let err = CredentialStore::from_config_checked(&cfg).unwrap_err();
            assert!(err.is_configuration());
        }

        cfg.credentials.llm_token = Some("sk-startup".to_string());
        let store = CredentialStore::from_config_checked(&cfg).unwrap();
        assert_eq!(store.require().unwrap().llm_token(), "sk-startup");

        cfg.app.require_credentials_at_startup = false;
        cfg.credentials.llm_token = None;
        if std::env::var(LLM_TOKEN_ENV).is_err() {
            let store = CredentialStore::from_config_checked(&cfg).unwrap();
            assert!(store.get().is_none());
        }
    }

    #[test]
    fn test_store_is_set_once() {
        let store = CredentialStore::new();
        assert!(store.require().unwrap_err().is_configuration());

        assert!(store.set(Credentials::new("a", None).unwrap()));
        assert!(!store.set(Credentials::new("b", None).unwrap()));
        assert_eq!(store.require().unwrap().llm_token(), "a");
    }
}
