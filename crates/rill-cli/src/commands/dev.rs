//! `rill dev` - the no-bundle dev server.
//!
//! Every request goes through a single fallback handler that hands the path
//! and raw query to [`DevServer::respond`]. Scripts are rewritten on the fly,
//! component files are split into driver, template and style resources, and
//! `/@modules/<name>` serves installed packages.

use axum::body::Body;
use axum::extract::{RawQuery, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use miette::{IntoDiagnostic, Result};
use rill_core::config::{load_server_config, ServerConfig};
use rill_core::{DevRequest, DevServer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Dev server action configuration.
#[derive(Debug, Clone)]
pub struct DevAction {
    /// Project root.
    pub cwd: PathBuf,
    /// Port override (CLI wins over the config file).
    pub port: Option<u16>,
    /// Host override.
    pub host: Option<String>,
    /// Explicit config file path (overrides auto-discovery).
    pub config: Option<PathBuf>,
}

/// Run the dev server until Ctrl+C.
pub async fn run(action: DevAction) -> Result<()> {
    let cwd = dunce::canonicalize(&action.cwd).into_diagnostic()?;

    let mut config = match load_server_config(&cwd, action.config.as_deref()).into_diagnostic()? {
        Some((config_path, config)) => {
            let rel_path = config_path.strip_prefix(&cwd).unwrap_or(&config_path);
            println!("  Loaded config from {}", rel_path.display());
            config
        }
        None => ServerConfig::default(),
    };
    if let Some(port) = action.port {
        config.port = port;
    }
    if let Some(host) = action.host {
        config.host = host;
    }

    let host_ip = if config.host == "localhost" {
        "127.0.0.1".to_string()
    } else {
        config.host.clone()
    };
    let listener = tokio::net::TcpListener::bind((host_ip.as_str(), config.port))
        .await
        .into_diagnostic()?;
    let port = listener.local_addr().into_diagnostic()?.port();

    let timeout = Duration::from_millis(config.request_timeout_ms);
    let server = Arc::new(DevServer::new(cwd.clone(), config.clone()));
    tracing::info!(root = %cwd.display(), port, "starting dev server");

    println!();
    println!("  Dev server running at http://{}:{}", config.host, port);
    println!("  Serving {}", cwd.display());
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    axum::serve(listener, router(server, timeout))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;

    Ok(())
}

/// Build the HTTP router around `server`.
pub fn router(server: Arc<DevServer>, timeout: Duration) -> Router {
    Router::new()
        .fallback(serve)
        .with_state(server)
        .layer(TimeoutLayer::new(timeout))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}

async fn serve(
    State(server): State<Arc<DevServer>>,
    uri: Uri,
    RawQuery(query): RawQuery,
) -> Response {
    let request = DevRequest {
        path: uri.path().to_string(),
        query,
    };
    let response = server.respond(&request).await;
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (
        status,
        [
            (header::CONTENT_TYPE, response.content_type),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from(response.body),
    )
        .into_response()
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutting down");
    }
}
