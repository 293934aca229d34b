//! Web server for the dashboard and its JSON API

use axum::{
    Router,
    http::{HeaderValue, Method, header, request::Parts},
    response::{Html, IntoResponse},
    routing::{get, post},
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;

use super::api;
use super::pid_file::{ServerPidFile, ServerPidInfo};
use super::watcher::watch_logs;
use super::websocket::ws_handler;
use crate::assist::{Assistant, ChatClient};
use crate::config::ResolvedSettings;
use crate::github::GitHubProvider;
use crate::scheduler::Scheduler;
use crate::storage::Store;
use crate::{Error, Result};

/// Default port for `logpilot serve`.
pub const DEFAULT_PORT: u16 = 3000;

/// Capacity of the WebSocket event channel.
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Data root store (wrapped in Mutex so file read-modify-writes don't interleave)
    pub store: Arc<Mutex<Store>>,
    /// Broadcast channel for sending updates to WebSocket clients
    pub update_tx: broadcast::Sender<String>,
    pub assistant: Arc<Assistant>,
    pub github: Arc<GitHubProvider>,
    /// Auto-commit scheduler, when enabled
    pub scheduler: Option<Arc<Scheduler>>,
    /// GitHub organization used to filter links, PRs and notifications
    pub org: Option<String>,
    /// Serve canned PRs and notifications instead of calling GitHub
    pub demo: bool,
    pub data_root: PathBuf,
}

impl AppState {
    pub fn new(
        store: Store,
        github: Arc<GitHubProvider>,
        assistant: Assistant,
        org: Option<String>,
        demo: bool,
    ) -> Self {
        let (update_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let data_root = store.root().to_path_buf();
        Self {
            store: Arc::new(Mutex::new(store)),
            update_tx,
            assistant: Arc::new(assistant),
            github,
            scheduler: None,
            org,
            demo,
            data_root,
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }
}

/// Options for [`start_server`] that come from the command line.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub host: String,
    pub port: u16,
    /// Run the hourly auto-commit scheduler
    pub scheduler: bool,
    /// Serve static files from this directory instead of the built-in page
    pub ui_dir: Option<PathBuf>,
    pub demo: bool,
}

/// Build the application router.
///
/// Without `ui_dir` the embedded single-page dashboard is served at `/`.
pub fn build_router(state: AppState, ui_dir: Option<&Path>) -> Router {
    let app = Router::new()
        .route("/api/log", get(api::get_log).put(api::put_log))
        .route("/api/log/dates", get(api::get_log_dates))
        .route("/api/richlog", get(api::get_rich_log))
        .route(
            "/api/todos",
            get(api::get_todos)
                .post(api::add_todo)
                .put(api::update_todo)
                .delete(api::delete_todo),
        )
        .route("/api/todos/suggest", post(api::suggest_todos))
        .route("/api/prs", get(api::get_prs))
        .route("/api/notifications", get(api::get_notifications))
        .route("/api/config", get(api::get_config).put(api::put_config))
        .route("/api/commit", post(api::commit))
        .route("/api/linkify", post(api::linkify))
        .route("/api/enrich", post(api::enrich))
        .route("/api/summary", post(api::summary))
        .route("/api/summary/save", post(api::save_summary))
        .route("/api/status", get(api::status))
        .route("/ws", get(ws_handler));

    let app = match ui_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app.route("/", get(serve_index)),
    };

    app.layer(cors_layer()).with_state(state)
}

/// Only pages served from this machine may call the API from a browser.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            |origin: &HeaderValue, _parts: &Parts| origin.to_str().is_ok_and(is_local_origin),
        ))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn is_local_origin(origin: &str) -> bool {
    ["http://localhost", "http://127.0.0.1", "http://[::1]"]
        .iter()
        .any(|base| {
            origin
                .strip_prefix(base)
                .is_some_and(|rest| rest.is_empty() || rest.strip_prefix(':').is_some_and(|p| p.parse::<u16>().is_ok()))
        })
}

/// Serve the main HTML page
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("index.html"))
}

fn parse_host(host: &str) -> Result<IpAddr> {
    if host.eq_ignore_ascii_case("localhost") {
        return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
    host.parse()
        .map_err(|e| Error::InvalidInput(format!("Invalid host address '{}': {}", host, e)))
}

/// Start the dashboard server and block until Ctrl+C (or SIGTERM).
pub async fn start_server(settings: &ResolvedSettings, options: ServeOptions) -> Result<()> {
    let root = settings.data_dir().to_path_buf();
    let store = Store::new(&root);
    store.init()?;

    let pid_file = ServerPidFile::new(&root);
    if let Some(running) = pid_file.check_running()? {
        return Err(Error::Other(format!(
            "logpilot is already serving {} (PID {}, http://{}:{})",
            root.display(),
            running.pid,
            running.host,
            running.port
        )));
    }
    if let Some(dir) = &options.ui_dir {
        if !dir.is_dir() {
            return Err(Error::InvalidInput(format!(
                "UI directory not found: {}",
                dir.display()
            )));
        }
    }
    let host_addr = parse_host(&options.host)?;

    let github = Arc::new(GitHubProvider::new(&settings.github_api_url.value));
    let model = {
        let settings = settings.clone();
        tokio::task::spawn_blocking(move || ChatClient::from_settings(&settings))
            .await
            .map_err(|e| Error::Other(e.to_string()))?
    };
    match &model {
        Some(client) => tracing::info!(model = client.model(), "AI assist enabled"),
        None => tracing::info!("AI assist unavailable, using fallbacks"),
    }

    let org = settings.github_org().map(str::to_string);
    let assistant = Assistant::new(model, github.clone(), org.clone());
    let mut state = AppState::new(store, github, assistant, org, options.demo);

    if options.scheduler {
        let scheduler = Arc::new(
            Scheduler::new(&root, settings.commit_interval()).with_notifier(state.update_tx.clone()),
        );
        scheduler.start();
        state = state.with_scheduler(scheduler);
    }

    // Start file watcher in background
    let watcher_tx = state.update_tx.clone();
    let logs_dir = root.join("logs");
    tokio::spawn(async move {
        if let Err(e) = watch_logs(logs_dir, watcher_tx).await {
            tracing::warn!("file watcher stopped: {}", e);
        }
    });

    let app = build_router(state.clone(), options.ui_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(SocketAddr::from((host_addr, options.port))).await?;
    let addr = listener.local_addr()?;
    pid_file.write(&ServerPidInfo {
        pid: std::process::id(),
        port: addr.port(),
        host: options.host.clone(),
    })?;

    tracing::info!(data_root = %root.display(), demo = options.demo, "serving at http://{}", addr);
    println!("Starting logpilot at http://{}", addr);
    println!("Press Ctrl+C to stop");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(scheduler) = &state.scheduler {
        scheduler.stop();
    }
    if let Err(e) = pid_file.delete() {
        tracing::warn!("failed to remove {}: {}", pid_file.path().display(), e);
    }
    tracing::info!("server stopped");

    served?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_origins() {
        assert!(is_local_origin("http://localhost:3000"));
        assert!(is_local_origin("http://127.0.0.1:8080"));
        assert!(is_local_origin("http://localhost"));
        assert!(is_local_origin("http://[::1]:3000"));
    }

    #[test]
    fn test_foreign_origins_rejected() {
        assert!(!is_local_origin("http://localhost.evil.com"));
        assert!(!is_local_origin("https://example.com"));
        assert!(!is_local_origin("http://127.0.0.1.nip.io:3000"));
        assert!(!is_local_origin("null"));
    }

    #[test]
    fn test_parse_host() {
        assert_eq!(parse_host("localhost").unwrap(), IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(parse_host("0.0.0.0").unwrap().to_string(), "0.0.0.0");
        assert!(parse_host("not a host").is_err());
    }
}
