//! Configuration for Logpilot.
//!
//! Two distinct documents are involved:
//!
//! ## config.toml - machine preferences
//!
//! Located at `~/.config/logpilot/config.toml` (override with `LOGPILOT_CONFIG`).
//! Contains the data root, GitHub organization, server address, auto-commit
//! interval and chat model settings. Never committed.
//!
//! ## data/config.json - app config
//!
//! Lives inside the data root and is edited from the dashboard. Contains the
//! ignored repositories list. Committed together with the logs.
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    Resolved, ResolvedSettings, SettingsOverrides, ValueSource, load_settings, masked_token,
    resolve_github_token, resolve_settings,
};
pub use schema::{AppConfig, LlmSection, SettingsFile};
