//! Git operations on the data root.
//!
//! The data root is an ordinary git repository. Auto-commits stage the
//! tracked directories, commit whatever changed and push when a remote is
//! configured. Push failures never fail the commit.

use crate::models::CommitOutcome;
use crate::sys::run_with_timeout;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use super::TRACKED_DIRS;

/// How long a push may run before it is abandoned.
const PUSH_TIMEOUT: Duration = Duration::from_secs(60);

/// Thin wrapper around the `git` CLI for one working tree.
#[derive(Debug, Clone)]
pub struct GitRepo {
    path: PathBuf,
}

impl GitRepo {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the path is inside a git working tree.
    pub fn is_repo(&self) -> bool {
        Command::new("git")
            .args(["rev-parse", "--is-inside-work-tree"])
            .current_dir(&self.path)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Run a git command and return its stdout.
    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .map_err(|e| Error::Git(format!("Failed to run git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(Error::Git(format!(
                "git {} failed: {}",
                args.first().copied().unwrap_or_default(),
                detail
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub fn init(&self) -> Result<()> {
        self.run(&["init", "-q"])?;
        Ok(())
    }

    /// Stage the given paths (relative to the working tree).
    pub fn stage(&self, paths: &[&str]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add", "--"];
        args.extend_from_slice(paths);
        self.run(&args)?;
        Ok(())
    }

    /// Names of the files currently staged.
    pub fn staged_files(&self) -> Result<Vec<String>> {
        let out = self.run(&["diff", "--cached", "--name-only"])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    pub fn commit(&self, message: &str) -> Result<()> {
        self.run(&["commit", "-q", "-m", message])?;
        Ok(())
    }

    /// Returns true if at least one remote is configured.
    pub fn has_remote(&self) -> Result<bool> {
        Ok(!self.run(&["remote"])?.trim().is_empty())
    }

    /// Push the current branch, giving up after [`PUSH_TIMEOUT`].
    pub fn push(&self) -> Result<()> {
        let output = run_with_timeout("git", &["push", "-q"], Some(&self.path), PUSH_TIMEOUT)
            .map_err(|e| Error::Git(e.to_string()))?;
        if output.success {
            Ok(())
        } else {
            Err(Error::Git(format!("git push failed: {}", output.stderr.trim())))
        }
    }
}

/// The message used when no explicit one is given: `Update work log YYYY-MM-DD HH:MM` (UTC).
pub fn default_commit_message(now: DateTime<Utc>) -> String {
    format!("Update work log {}", now.format("%Y-%m-%d %H:%M"))
}

/// Stage the tracked directories of `root` and commit any changes.
///
/// Returns a "Nothing to commit" outcome when nothing is staged. When a
/// remote exists the commit is pushed; a failed push is logged and reported
/// through `pushed: false`.
pub fn commit_work_log(root: &Path, message: Option<&str>) -> Result<CommitOutcome> {
    let repo = GitRepo::new(root);
    if !repo.is_repo() {
        return Err(Error::Git(format!(
            "{} is not a git repository (run `logpilot init`)",
            root.display()
        )));
    }

    let existing: Vec<&str> = TRACKED_DIRS
        .iter()
        .copied()
        .filter(|d| root.join(d).exists())
        .collect();
    repo.stage(&existing)?;

    let files = repo.staged_files()?;
    if files.is_empty() {
        tracing::debug!("auto-commit: nothing to commit");
        return Ok(CommitOutcome::nothing_to_commit());
    }

    let message = match message.map(str::trim).filter(|m| !m.is_empty()) {
        Some(m) => m.to_string(),
        None => default_commit_message(Utc::now()),
    };
    repo.commit(&message)?;
    tracing::info!(files = files.len(), "committed: {}", message);

    let mut pushed = false;
    if repo.has_remote()? {
        match repo.push() {
            Ok(()) => pushed = true,
            Err(e) => tracing::warn!("push failed: {}", e),
        }
    }

    Ok(CommitOutcome {
        committed: true,
        message,
        pushed,
        files,
    })
}

/// Make sure `root` exists, holds the data layout and is a git repository.
///
/// Returns true if a new repository was created.
pub fn init_repository(root: &Path) -> Result<bool> {
    std::fs::create_dir_all(root)?;
    super::Store::new(root).init()?;

    let repo = GitRepo::new(root);
    if repo.is_repo() {
        return Ok(false);
    }
    repo.init()?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Store;
    use crate::test_utils::{TestEnv, git};
    use chrono::TimeZone;

    #[test]
    fn test_default_commit_message_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 7, 9, 0).unwrap();
        assert_eq!(default_commit_message(now), "Update work log 2024-03-05 07:09");
    }

    #[test]
    fn test_commit_nothing_to_commit() {
        let env = TestEnv::with_git();
        let outcome = commit_work_log(env.path(), None).unwrap();
        assert_eq!(outcome, CommitOutcome::nothing_to_commit());
    }

    #[test]
    fn test_commit_stages_existing_dirs_only() {
        let env = TestEnv::with_git();
        let store = env.store();
        store
            .write_log(&"2024-03-05".parse().unwrap(), "- did things\n")
            .unwrap();

        let outcome = commit_work_log(env.path(), Some("Close work log 2024-03-05")).unwrap();
        assert!(outcome.committed);
        assert!(!outcome.pushed);
        assert_eq!(outcome.message, "Close work log 2024-03-05");
        assert_eq!(outcome.files, vec!["logs/2024-03-05.md".to_string()]);

        let subject = git(env.path(), &["log", "-1", "--format=%s"]);
        assert_eq!(subject, "Close work log 2024-03-05");
    }

    #[test]
    fn test_commit_ignores_untracked_dirs() {
        let env = TestEnv::with_git();
        std::fs::write(env.path().join("scratch.txt"), "not tracked").unwrap();
        let outcome = commit_work_log(env.path(), None).unwrap();
        assert!(!outcome.committed);
    }

    #[test]
    fn test_commit_default_message() {
        let env = TestEnv::with_git();
        env.store()
            .add_todo("Ship", crate::models::TodoSource::Manual)
            .unwrap();
        let outcome = commit_work_log(env.path(), Some("   ")).unwrap();
        assert!(outcome.committed);
        assert!(outcome.message.starts_with("Update work log "));
        assert_eq!(outcome.files, vec!["data/todos.json".to_string()]);
    }

    #[test]
    fn test_commit_second_time_nothing_new() {
        let env = TestEnv::with_git();
        env.store()
            .write_summary("week.md", "# Week")
            .unwrap();
        assert!(commit_work_log(env.path(), None).unwrap().committed);
        assert!(!commit_work_log(env.path(), None).unwrap().committed);
    }

    #[test]
    fn test_commit_push_failure_still_commits() {
        let env = TestEnv::with_git();
        let missing_remote = env.path().join("no-such-remote.git");
        git(
            env.path(),
            &["remote", "add", "origin", missing_remote.to_str().unwrap()],
        );
        env.store()
            .write_log(&"2024-03-06".parse().unwrap(), "x")
            .unwrap();

        let outcome = commit_work_log(env.path(), None).unwrap();
        assert!(outcome.committed);
        assert!(!outcome.pushed);
    }

    #[test]
    fn test_commit_outside_repo_is_error() {
        let env = TestEnv::new();
        let result = commit_work_log(env.path(), None);
        assert!(matches!(result, Err(Error::Git(_))));
    }

    #[test]
    fn test_init_repository_creates_layout() {
        let env = TestEnv::new();
        let root = env.path().join("worklog");
        assert!(init_repository(&root).unwrap());
        assert!(root.join(".git").exists());
        let store = Store::new(&root);
        assert!(store.logs_dir().is_dir());
        assert!(store.data_dir().is_dir());
        assert!(store.summaries_dir().is_dir());

        assert!(!init_repository(&root).unwrap());
    }
}
