//! Schemas for the two configuration documents.
//!
//! - [`SettingsFile`] - `config.toml`, machine-level preferences for the
//!   server, GitHub and the chat model.
//! - [`AppConfig`] - `data/config.json` inside the data root, edited from the
//!   dashboard and committed alongside the logs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::Result;

/// Maximum number of ignored repositories kept in the app config.
pub const MAX_IGNORED_REPOS: usize = 100;

/// Maximum length of one ignored repository name, in characters.
pub const MAX_IGNORED_REPO_LEN: usize = 200;

/// Contents of `config.toml`. Every field is optional; unset fields fall
/// through to environment variables and built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SettingsFile {
    /// Root directory holding `logs/`, `data/` and `summaries/`
    pub data_dir: Option<PathBuf>,
    /// Organization the dashboard is scoped to
    pub github_org: Option<String>,
    /// Base URL of the GitHub REST API
    pub github_api_url: Option<String>,
    /// Address the dashboard binds to
    pub host: Option<String>,
    /// Port the dashboard listens on
    pub port: Option<u16>,
    /// Seconds between scheduled auto-commits
    pub commit_interval_secs: Option<u64>,
    /// Serve canned GitHub data instead of calling the API
    pub demo: Option<bool>,
    /// Chat model settings
    pub llm: LlmSection,
}

/// `[llm]` table of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LlmSection {
    pub enabled: Option<bool>,
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`)
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

impl SettingsFile {
    /// Load a settings file. A missing file yields the empty settings.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Per-installation app config stored in `data/config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Repository names excluded from PR, notification and link aggregation
    pub ignored_repos: Vec<String>,
}

impl AppConfig {
    /// Returns true if `repo` (a bare repository name) is ignored.
    pub fn is_ignored(&self, repo: &str) -> bool {
        self.ignored_repos.iter().any(|r| r == repo)
    }

    /// Replace the ignore list with sanitized entries taken from an untrusted
    /// JSON array: non-strings are dropped, strings are trimmed and cut to
    /// [`MAX_IGNORED_REPO_LEN`] characters, empties are dropped, and at most
    /// [`MAX_IGNORED_REPOS`] are kept.
    pub fn set_ignored_repos(&mut self, values: &[serde_json::Value]) {
        self.ignored_repos = values
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().chars().take(MAX_IGNORED_REPO_LEN).collect::<String>())
            .filter(|s| !s.is_empty())
            .take(MAX_IGNORED_REPOS)
            .collect();
    }
}
