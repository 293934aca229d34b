//! Local web dashboard.
//!
//! An axum server exposing the JSON API under `/api`, a WebSocket at `/ws`
//! that pushes `log-changed` and `commit` events, and either the embedded
//! single-page UI or a static directory passed with `--ui-dir`.

pub mod api;
mod pid_file;
mod server;
mod watcher;
mod websocket;

pub use pid_file::{RUNTIME_DIR, ServerPidFile, ServerPidInfo};
pub use server::{AppState, DEFAULT_PORT, ServeOptions, build_router, is_local_origin, start_server};
pub use watcher::{LogKind, classify_log_path, log_changed_event, watch_logs};
