//! Common test utilities for logpilot integration tests.
//!
//! Provides `TestEnv` for isolated test environments that never touch the
//! user's settings file, GitHub account or chat model.

#![allow(dead_code)]

pub mod fake_github;

use assert_cmd::Command;
use std::path::Path;
use std::process;
pub use tempfile::TempDir;

/// An address nothing listens on, so stray GitHub calls fail fast.
pub const UNREACHABLE_API: &str = "http://127.0.0.1:9";

/// A test environment with an isolated data root and settings file.
///
/// - `data_dir`: the data root (via `LOGPILOT_DATA_DIR`)
/// - `config_dir`: holds a `config.toml` disabling the chat model (via `LOGPILOT_CONFIG`)
///
/// The `logpilot()` method returns a `Command` with these set per-invocation,
/// making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        let config_dir = TempDir::new().unwrap();
        std::fs::write(
            config_dir.path().join("config.toml"),
            "commit-interval-secs = 3600\n\n[llm]\nenabled = false\n",
        )
        .unwrap();
        Self {
            data_dir: TempDir::new().unwrap(),
            config_dir,
        }
    }

    /// Create a new test environment and run `logpilot init`, with a local
    /// git identity so commits work on any machine.
    pub fn init() -> Self {
        let env = Self::new();
        env.logpilot().arg("init").assert().success();
        env.git(&["config", "user.email", "test@example.com"]);
        env.git(&["config", "user.name", "Test"]);
        env.git(&["config", "commit.gpgsign", "false"]);
        env
    }

    /// Get a Command for the logpilot binary with isolated data root.
    pub fn logpilot(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_logpilot"));
        cmd.current_dir(self.data_dir.path());
        cmd.env("LOGPILOT_DATA_DIR", self.data_dir.path());
        cmd.env("LOGPILOT_CONFIG", self.config_dir.path().join("config.toml"));
        cmd.env("LOGPILOT_GITHUB_API", UNREACHABLE_API);
        cmd.env("GITHUB_READ_TOKEN", "test-token");
        cmd.env_remove("LOGPILOT_GITHUB_ORG");
        cmd.env_remove("LOGPILOT_DEMO");
        cmd.env_remove("LOGPILOT_PORT");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// Get the path to the data root.
    pub fn data_path(&self) -> &Path {
        self.data_dir.path()
    }

    /// Run a git command in the data root and return its trimmed stdout.
    pub fn git(&self, args: &[&str]) -> String {
        let output = process::Command::new("git")
            .args(args)
            .current_dir(self.data_path())
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Write a raw log file directly.
    pub fn write_log(&self, date: &str, content: &str) {
        let logs = self.data_path().join("logs");
        std::fs::create_dir_all(&logs).unwrap();
        std::fs::write(logs.join(format!("{}.md", date)), content).unwrap();
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a command's stdout as JSON.
pub fn stdout_json(output: &process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(&output.stdout)
        )
    })
}
