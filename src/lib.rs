//! Logpilot - a personal work-log dashboard.
//!
//! This library provides the core functionality for the `logpilot` CLI and its
//! local web dashboard: daily markdown logs, a TODO list, open pull requests and
//! notifications from GitHub, AI-assisted log enrichment, and periodic git
//! commits of the log directory.

pub mod assist;
pub mod cli;
pub mod commands;
pub mod config;
pub mod demo;
pub mod github;
pub mod gui;
pub mod logging;
pub mod models;
pub mod scheduler;
pub mod storage;
pub mod sys;


/// Library-level error type for Logpilot operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Git error: {0}")]
    Git(String),

    #[error("GitHub error: {0}")]
    GitHub(#[from] github::GitHubError),

    #[error("Assist error: {0}")]
    Assist(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Logpilot operations.
pub type Result<T> = std::result::Result<T, Error>;
