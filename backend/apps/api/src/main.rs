//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router, http,
    http::{Method, header},
};
use base64::Engine;
use base64::engine::general_purpose;
use session::{InMemoryCluster, PluginRegistry, SessionConfig, session_router};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

/// Read an optional, typed environment variable
fn env_parse<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{key} is not valid")),
        Err(_) => Ok(None),
    }
}

fn session_config() -> anyhow::Result<SessionConfig> {
    let mut config = if cfg!(debug_assertions) {
        SessionConfig::development()
    } else {
        SessionConfig::default()
    };

    match env::var("SESSION_SECRET") {
        Ok(secret_b64) => {
            config.session_secret = Engine::decode(&general_purpose::STANDARD, secret_b64.trim())
                .context("SESSION_SECRET must be base64")?;
        }
        Err(_) if cfg!(debug_assertions) => {
            tracing::warn!("SESSION_SECRET not set, using a random development secret");
        }
        Err(_) => anyhow::bail!("SESSION_SECRET must be set in production"),
    }

    if let Some(secs) = env_parse("SESSION_AUTH_VALID_SECS")? {
        config.auth_valid_secs = secs;
    }
    if let Some(secs) = env_parse("SESSION_MAX_AGE_SECS")? {
        config.session_max_age_secs = secs;
    }
    if let Some(node_id) = env_parse::<String>("NODE_ID")? {
        config.node_id = node_id;
    }
    if let Some(load) = env_parse("NODE_REJECT_LOAD")? {
        config.reject_load_threshold = load;
    }
    if let Some(ms) = env_parse("ORACLE_TIMEOUT_MS")? {
        config.oracle_timeout = Duration::from_millis(ms);
    }
    if let Some(enabled) = env_parse("DEV_SIGN_IN")? {
        config.dev_sign_in = enabled;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,session=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = session_config()?;
    tracing::info!(
        node_id = %config.node_id,
        auth_valid_secs = config.auth_valid_secs,
        reject_load_threshold = config.reject_load_threshold,
        dev_sign_in = config.dev_sign_in,
        "Session gate configured"
    );

    // Standalone mode: containers come up as soon as they are launched
    let cluster = InMemoryCluster::with_auto_start();
    let plugins = PluginRegistry::new();

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .nest("/api", session_router(cluster, config, &plugins)?)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr: SocketAddr = env_parse("LISTEN_ADDR")?
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 31113)));
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
