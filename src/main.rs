//! Scribe Web UI
//!
//! 启动: cargo run
//! 浏览器访问 http://127.0.0.1:8080

use std::sync::Arc;

use anyhow::Context;
use scribe::config::load_config;
use scribe::core::CredentialStore;
use scribe::observability;
use scribe::web::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    observability::init();

    let cfg = load_config(None).context("Failed to load config")?;

    let credentials = CredentialStore::from_config_checked(&cfg).context(
        "LLM token is required at startup (set SCRIBE__CREDENTIALS__LLM_TOKEN or `token`)",
    )?;

    let port = std::env::var("SCRIBE_WEB_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(cfg.web.port);

    let app = router(Arc::new(AppState::new(cfg, credentials)));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Scribe Web UI: http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
