//! Unified precedence resolution for settings and the GitHub token.
//!
//! ## Settings Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. `LOGPILOT_*` environment variables
//! 3. `config.toml` (`LOGPILOT_CONFIG` or `~/.config/logpilot/config.toml`)
//! 4. Built-in defaults
//!
//! ## Token Precedence (highest to lowest)
//!
//! 1. `GITHUB_READ_TOKEN` environment variable
//! 2. `GH_TOKEN` environment variable
//! 3. `gh auth token`

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::schema::SettingsFile;
use crate::github::GitHubError;
use crate::sys::{expand_home, run_with_timeout};
use crate::{Error, Result};

pub const CONFIG_ENV: &str = "LOGPILOT_CONFIG";
pub const DATA_DIR_ENV: &str = "LOGPILOT_DATA_DIR";
pub const GITHUB_ORG_ENV: &str = "LOGPILOT_GITHUB_ORG";
pub const GITHUB_API_ENV: &str = "LOGPILOT_GITHUB_API";
pub const PORT_ENV: &str = "LOGPILOT_PORT";
pub const DEMO_ENV: &str = "LOGPILOT_DEMO";
pub const LLM_ENDPOINT_ENV: &str = "LOGPILOT_LLM_ENDPOINT";
pub const LLM_MODEL_ENV: &str = "LOGPILOT_LLM_MODEL";
pub const LLM_TOKEN_ENV: &str = "LOGPILOT_LLM_TOKEN";
pub const GITHUB_READ_TOKEN_ENV: &str = "GITHUB_READ_TOKEN";
pub const GH_TOKEN_ENV: &str = "GH_TOKEN";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_COMMIT_INTERVAL_SECS: u64 = 60 * 60;
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_LLM_ENDPOINT: &str = "https://models.github.ai/inference";
pub const DEFAULT_LLM_MODEL: &str = "openai/gpt-4.1";

/// How long `gh auth token` may take before we give up on it.
const GH_CLI_TIMEOUT: Duration = Duration::from_secs(10);

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from the settings file
    File,
    /// Value from CLI flag
    CliFlag,
    /// Value printed by `gh auth token`
    GhCli,
    /// Built-in default value
    Default,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::File => write!(f, "file"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::GhCli => write!(f, "gh-cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// CLI overrides for settings resolution.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub data_dir: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub demo: Option<bool>,
}

/// Fully resolved settings with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    /// Settings file that was consulted (it may not exist)
    pub settings_path: Option<PathBuf>,
    pub data_dir: Resolved<PathBuf>,
    pub github_org: Option<Resolved<String>>,
    pub github_api_url: Resolved<String>,
    pub host: Resolved<String>,
    pub port: Resolved<u16>,
    pub commit_interval_secs: Resolved<u64>,
    pub demo: Resolved<bool>,
    pub llm_enabled: Resolved<bool>,
    pub llm_endpoint: Resolved<String>,
    pub llm_model: Resolved<String>,
}

impl ResolvedSettings {
    pub fn data_dir(&self) -> &std::path::Path {
        &self.data_dir.value
    }

    pub fn github_org(&self) -> Option<&str> {
        self.github_org.as_ref().map(|r| r.value.as_str())
    }

    pub fn commit_interval(&self) -> Duration {
        Duration::from_secs(self.commit_interval_secs.value)
    }

    /// Render every setting with its source, for `logpilot config show`.
    pub fn to_json(&self) -> serde_json::Value {
        fn entry<T: serde::Serialize>(r: &Resolved<T>) -> serde_json::Value {
            serde_json::json!({ "value": r.value, "source": r.source.to_string() })
        }
        serde_json::json!({
            "settings_path": self.settings_path,
            "data_dir": entry(&self.data_dir),
            "github_org": self.github_org.as_ref().map(entry),
            "github_api_url": entry(&self.github_api_url),
            "host": entry(&self.host),
            "port": entry(&self.port),
            "commit_interval_secs": entry(&self.commit_interval_secs),
            "demo": entry(&self.demo),
            "llm_enabled": entry(&self.llm_enabled),
            "llm_endpoint": entry(&self.llm_endpoint),
            "llm_model": entry(&self.llm_model),
        })
    }
}

/// Environment lookup used during resolution. Tests pass a closure over a map.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Look up a variable in the process environment, treating empty as unset.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Location of the settings file.
pub fn settings_path(env: EnvLookup<'_>) -> Option<PathBuf> {
    if let Some(path) = env(CONFIG_ENV) {
        return Some(expand_home(&PathBuf::from(path)));
    }
    dirs::config_dir().map(|d| d.join("logpilot").join("config.toml"))
}

/// Load the settings file from its default location and resolve against the
/// process environment.
pub fn load_settings(overrides: &SettingsOverrides) -> Result<ResolvedSettings> {
    let path = settings_path(&process_env);
    let file = match &path {
        Some(p) => SettingsFile::load(p)?,
        None => SettingsFile::default(),
    };
    let mut resolved = resolve_settings(&file, overrides, &process_env)?;
    resolved.settings_path = path;
    Ok(resolved)
}

/// Resolve settings with the full precedence chain.
pub fn resolve_settings(
    file: &SettingsFile,
    overrides: &SettingsOverrides,
    env: EnvLookup<'_>,
) -> Result<ResolvedSettings> {
    let data_dir = if let Some(dir) = &overrides.data_dir {
        Resolved::new(expand_home(dir), ValueSource::CliFlag)
    } else if let Some(dir) = env(DATA_DIR_ENV) {
        Resolved::new(
            expand_home(&PathBuf::from(dir)),
            ValueSource::EnvVar(DATA_DIR_ENV.to_string()),
        )
    } else if let Some(dir) = &file.data_dir {
        Resolved::new(expand_home(dir), ValueSource::File)
    } else {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Resolved::new(cwd, ValueSource::Default)
    };

    let github_org = if let Some(org) = env(GITHUB_ORG_ENV) {
        Some(Resolved::new(org, ValueSource::EnvVar(GITHUB_ORG_ENV.to_string())))
    } else {
        file.github_org
            .clone()
            .filter(|o| !o.trim().is_empty())
            .map(|o| Resolved::new(o, ValueSource::File))
    };

    let github_api_url = string_setting(
        env,
        GITHUB_API_ENV,
        file.github_api_url.as_ref(),
        DEFAULT_GITHUB_API_URL,
    );
    let github_api_url = Resolved::new(
        github_api_url.value.trim_end_matches('/').to_string(),
        github_api_url.source,
    );

    let host = match &overrides.host {
        Some(host) => Resolved::new(host.clone(), ValueSource::CliFlag),
        None => match &file.host {
            Some(host) => Resolved::new(host.clone(), ValueSource::File),
            None => Resolved::new(DEFAULT_HOST.to_string(), ValueSource::Default),
        },
    };

    let port = if let Some(port) = overrides.port {
        Resolved::new(port, ValueSource::CliFlag)
    } else if let Some(raw) = env(PORT_ENV) {
        let port = raw
            .trim()
            .parse()
            .map_err(|_| Error::InvalidInput(format!("{} must be a port number, got '{}'", PORT_ENV, raw)))?;
        Resolved::new(port, ValueSource::EnvVar(PORT_ENV.to_string()))
    } else if let Some(port) = file.port {
        Resolved::new(port, ValueSource::File)
    } else {
        Resolved::new(DEFAULT_PORT, ValueSource::Default)
    };

    let commit_interval_secs = match file.commit_interval_secs {
        Some(0) => {
            return Err(Error::InvalidInput(
                "commit-interval-secs must be greater than zero".to_string(),
            ));
        }
        Some(secs) => Resolved::new(secs, ValueSource::File),
        None => Resolved::new(DEFAULT_COMMIT_INTERVAL_SECS, ValueSource::Default),
    };

    let demo = if let Some(demo) = overrides.demo {
        Resolved::new(demo, ValueSource::CliFlag)
    } else if let Some(raw) = env(DEMO_ENV) {
        Resolved::new(parse_bool(&raw), ValueSource::EnvVar(DEMO_ENV.to_string()))
    } else if let Some(demo) = file.demo {
        Resolved::new(demo, ValueSource::File)
    } else {
        Resolved::new(false, ValueSource::Default)
    };

    let llm_enabled = match file.llm.enabled {
        Some(enabled) => Resolved::new(enabled, ValueSource::File),
        None => Resolved::new(true, ValueSource::Default),
    };
    let llm_endpoint = string_setting(
        env,
        LLM_ENDPOINT_ENV,
        file.llm.endpoint.as_ref(),
        DEFAULT_LLM_ENDPOINT,
    );
    let llm_model = string_setting(env, LLM_MODEL_ENV, file.llm.model.as_ref(), DEFAULT_LLM_MODEL);

    Ok(ResolvedSettings {
        settings_path: None,
        data_dir,
        github_org,
        github_api_url,
        host,
        port,
        commit_interval_secs,
        demo,
        llm_enabled,
        llm_endpoint,
        llm_model,
    })
}

fn string_setting(
    env: EnvLookup<'_>,
    env_name: &str,
    file_value: Option<&String>,
    default: &str,
) -> Resolved<String> {
    if let Some(value) = env(env_name) {
        Resolved::new(value, ValueSource::EnvVar(env_name.to_string()))
    } else if let Some(value) = file_value.filter(|v| !v.trim().is_empty()) {
        Resolved::new(value.clone(), ValueSource::File)
    } else {
        Resolved::new(default.to_string(), ValueSource::Default)
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Resolve the GitHub token.
///
/// Environment variables are checked first; otherwise the token of an
/// authenticated `gh` CLI is used.
pub fn resolve_github_token(env: EnvLookup<'_>) -> std::result::Result<Resolved<String>, GitHubError> {
    for name in [GITHUB_READ_TOKEN_ENV, GH_TOKEN_ENV] {
        if let Some(token) = env(name) {
            return Ok(Resolved::new(
                token.trim().to_string(),
                ValueSource::EnvVar(name.to_string()),
            ));
        }
    }

    let output = run_with_timeout("gh", &["auth", "token"], None, GH_CLI_TIMEOUT).map_err(|e| {
        GitHubError::Token(format!(
            "Failed to retrieve GitHub token. Set {} or ensure `gh` CLI is installed and authenticated ({})",
            GITHUB_READ_TOKEN_ENV, e
        ))
    })?;
    if !output.success {
        return Err(GitHubError::Token(format!(
            "`gh auth token` failed: {}",
            output.stderr.trim()
        )));
    }
    let token = output.stdout.trim().to_string();
    if token.is_empty() {
        return Err(GitHubError::Token("GitHub token is empty".to_string()));
    }
    Ok(Resolved::new(token, ValueSource::GhCli))
}

/// Get a masked token for display purposes.
pub fn masked_token(token: &str) -> String {
    if token.len() <= 12 {
        format!("{}...", token.get(..4.min(token.len())).unwrap_or(""))
    } else {
        format!(
            "{}...{}",
            token.get(..4).unwrap_or(""),
            token.get(token.len() - 4..).unwrap_or("")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let env = env_from(&[]);
        let resolved =
            resolve_settings(&SettingsFile::default(), &SettingsOverrides::default(), &env).unwrap();
        assert_eq!(resolved.data_dir.source, ValueSource::Default);
        assert_eq!(resolved.host.value, DEFAULT_HOST);
        assert_eq!(resolved.port.value, DEFAULT_PORT);
        assert_eq!(resolved.commit_interval(), Duration::from_secs(3600));
        assert!(resolved.github_org.is_none());
        assert!(!resolved.demo.value);
        assert!(resolved.llm_enabled.value);
        assert_eq!(resolved.llm_model.value, DEFAULT_LLM_MODEL);
        assert_eq!(resolved.github_api_url.value, DEFAULT_GITHUB_API_URL);
    }

    #[test]
    fn test_cli_beats_env_beats_file() {
        let file = SettingsFile {
            data_dir: Some(PathBuf::from("/from/file")),
            port: Some(4000),
            ..Default::default()
        };
        let env = env_from(&[(DATA_DIR_ENV, "/from/env"), (PORT_ENV, "5000")]);

        let resolved = resolve_settings(&file, &SettingsOverrides::default(), &env).unwrap();
        assert_eq!(resolved.data_dir.value, PathBuf::from("/from/env"));
        assert_eq!(
            resolved.data_dir.source,
            ValueSource::EnvVar(DATA_DIR_ENV.to_string())
        );
        assert_eq!(resolved.port.value, 5000);

        let overrides = SettingsOverrides {
            data_dir: Some(PathBuf::from("/from/cli")),
            port: Some(6000),
            ..Default::default()
        };
        let resolved = resolve_settings(&file, &overrides, &env).unwrap();
        assert_eq!(resolved.data_dir.value, PathBuf::from("/from/cli"));
        assert_eq!(resolved.data_dir.source, ValueSource::CliFlag);
        assert_eq!(resolved.port.value, 6000);

        let resolved =
            resolve_settings(&file, &SettingsOverrides::default(), &env_from(&[])).unwrap();
        assert_eq!(resolved.data_dir.value, PathBuf::from("/from/file"));
        assert_eq!(resolved.port.source, ValueSource::File);
    }

    #[test]
    fn test_invalid_port_env_is_error() {
        let env = env_from(&[(PORT_ENV, "http")]);
        let result = resolve_settings(&SettingsFile::default(), &SettingsOverrides::default(), &env);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_zero_commit_interval_is_error() {
        let file = SettingsFile {
            commit_interval_secs: Some(0),
            ..Default::default()
        };
        let env = env_from(&[]);
        assert!(resolve_settings(&file, &SettingsOverrides::default(), &env).is_err());
    }

    #[test]
    fn test_github_api_url_trailing_slash_trimmed() {
        let env = env_from(&[(GITHUB_API_ENV, "http://127.0.0.1:9999/")]);
        let resolved =
            resolve_settings(&SettingsFile::default(), &SettingsOverrides::default(), &env).unwrap();
        assert_eq!(resolved.github_api_url.value, "http://127.0.0.1:9999");
    }

    #[test]
    fn test_demo_env_parsing() {
        for (raw, expected) in [("1", true), ("TRUE", true), ("no", false), ("0", false)] {
            let env = env_from(&[(DEMO_ENV, raw)]);
            let resolved =
                resolve_settings(&SettingsFile::default(), &SettingsOverrides::default(), &env)
                    .unwrap();
            assert_eq!(resolved.demo.value, expected, "input {:?}", raw);
        }
    }

    #[test]
    fn test_token_from_env_precedence() {
        let env = env_from(&[(GH_TOKEN_ENV, "gh-token"), (GITHUB_READ_TOKEN_ENV, " read-token\n")]);
        let token = resolve_github_token(&env).unwrap();
        assert_eq!(token.value, "read-token");
        assert_eq!(
            token.source,
            ValueSource::EnvVar(GITHUB_READ_TOKEN_ENV.to_string())
        );

        let env = env_from(&[(GH_TOKEN_ENV, "gh-token")]);
        assert_eq!(resolve_github_token(&env).unwrap().value, "gh-token");
    }

    #[test]
    fn test_masked_token() {
        assert_eq!(masked_token("ghp_abcdefghijklmnop"), "ghp_...mnop");
        assert_eq!(masked_token("short"), "shor...");
        assert_eq!(masked_token("ab"), "ab...");
    }

    #[test]
    fn test_value_source_display() {
        assert_eq!(ValueSource::EnvVar("X".into()).to_string(), "env:X");
        assert_eq!(ValueSource::GhCli.to_string(), "gh-cli");
    }
}
