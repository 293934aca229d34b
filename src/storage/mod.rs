//! Storage layer for Logpilot data.
//!
//! Everything lives as plain files under a single data root so that the whole
//! directory can be versioned with git:
//!
//! - `logs/YYYY-MM-DD.md` - raw work log for a day
//! - `logs/YYYY-MM-DD.rich.md` - enriched log for a day
//! - `data/todos.json` - the TODO list
//! - `data/config.json` - app config (ignored repositories)
//! - `summaries/*.md` - saved multi-day summaries
//!
//! Writes go through a temp file in the target directory followed by a rename,
//! so a crash never leaves a half-written log behind.

pub mod git;

pub use git::{GitRepo, commit_work_log, init_repository};

use crate::config::AppConfig;
use crate::models::{LogDate, TodoItem, TodoPatch, TodoSource};
use crate::{Error, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Directories staged by the auto-commit, relative to the data root.
pub const TRACKED_DIRS: [&str; 3] = ["logs", "data", "summaries"];

/// File-backed store rooted at the data directory.
#[derive(Debug, Clone)]
pub struct Store {
    /// Root directory holding `logs/`, `data/` and `summaries/`
    root: PathBuf,
}

impl Store {
    /// Create a store for the given data root. Nothing is created on disk
    /// until the first write.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Create the directory layout.
    pub fn init(&self) -> Result<()> {
        for dir in TRACKED_DIRS {
            fs::create_dir_all(self.root.join(dir))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn summaries_dir(&self) -> PathBuf {
        self.root.join("summaries")
    }

    pub fn log_path(&self, date: &LogDate) -> PathBuf {
        self.logs_dir().join(format!("{}.md", date))
    }

    pub fn rich_log_path(&self, date: &LogDate) -> PathBuf {
        self.logs_dir().join(format!("{}.rich.md", date))
    }

    fn todos_path(&self) -> PathBuf {
        self.data_dir().join("todos.json")
    }

    fn config_path(&self) -> PathBuf {
        self.data_dir().join("config.json")
    }

    // --- Logs ---

    /// Read the raw log for a day. A missing file reads as empty.
    pub fn read_log(&self, date: &LogDate) -> Result<String> {
        read_or_empty(&self.log_path(date))
    }

    pub fn write_log(&self, date: &LogDate, content: &str) -> Result<()> {
        write_atomic(&self.log_path(date), content.as_bytes())
    }

    /// Read the enriched log for a day. A missing file reads as empty.
    pub fn read_rich_log(&self, date: &LogDate) -> Result<String> {
        read_or_empty(&self.rich_log_path(date))
    }

    pub fn write_rich_log(&self, date: &LogDate, content: &str) -> Result<()> {
        write_atomic(&self.rich_log_path(date), content.as_bytes())
    }

    /// List the days that have a raw log, oldest first.
    ///
    /// Only `YYYY-MM-DD.md` files count; enriched logs and anything else in
    /// the directory are ignored.
    pub fn list_log_dates(&self) -> Result<Vec<LogDate>> {
        let entries = match fs::read_dir(self.logs_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut dates = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(stem) = name.strip_suffix(".md") {
                if let Ok(date) = stem.parse::<LogDate>() {
                    dates.push(date);
                }
            }
        }
        dates.sort();
        Ok(dates)
    }

    /// Collect the logs of every day in `start..=end`, preferring the enriched
    /// log over the raw one. Days with only blank content are skipped.
    pub fn collect_logs(&self, start: &LogDate, end: &LogDate) -> Result<Vec<(LogDate, String)>> {
        let mut logs = Vec::new();
        let mut day = *start;
        while day <= *end {
            let mut content = self.read_rich_log(&day)?;
            if content.is_empty() {
                content = self.read_log(&day)?;
            }
            if !content.trim().is_empty() {
                logs.push((day, content));
            }
            match day.succ() {
                Some(next) => day = next,
                None => break,
            }
        }
        Ok(logs)
    }

    // --- Todos ---

    /// Read the TODO list. A missing file is an empty list; a file that does
    /// not parse is an error so it never gets overwritten by accident.
    pub fn read_todos(&self) -> Result<Vec<TodoItem>> {
        let raw = read_or_empty(&self.todos_path())?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            Error::Other(format!(
                "Failed to parse {}: {}",
                self.todos_path().display(),
                e
            ))
        })
    }

    pub fn write_todos(&self, todos: &[TodoItem]) -> Result<()> {
        let json = serde_json::to_string_pretty(todos)?;
        write_atomic(&self.todos_path(), json.as_bytes())
    }

    /// Append a new open item and return the updated list.
    pub fn add_todo(&self, title: &str, source: TodoSource) -> Result<Vec<TodoItem>> {
        let item = TodoItem::new(title, source)?;
        let mut todos = self.read_todos()?;
        todos.push(item);
        self.write_todos(&todos)?;
        Ok(todos)
    }

    /// Apply `patch` to the item with `id` and return the updated list.
    pub fn update_todo(&self, id: &str, patch: &TodoPatch) -> Result<Vec<TodoItem>> {
        let mut todos = self.read_todos()?;
        let item = todos
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(format!("Todo {}", id)))?;
        patch.apply(item)?;
        self.write_todos(&todos)?;
        Ok(todos)
    }

    /// Remove the item with `id` (if present) and return the remaining list.
    pub fn remove_todo(&self, id: &str) -> Result<Vec<TodoItem>> {
        let mut todos = self.read_todos()?;
        let before = todos.len();
        todos.retain(|t| t.id != id);
        if todos.len() != before {
            self.write_todos(&todos)?;
        }
        Ok(todos)
    }

    // --- App config ---

    /// Read the app config, filling missing fields with defaults. A missing
    /// or unreadable file yields the default config.
    pub fn read_config(&self) -> Result<AppConfig> {
        let raw = read_or_empty(&self.config_path())?;
        if raw.trim().is_empty() {
            return Ok(AppConfig::default());
        }
        match serde_json::from_str(&raw) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!("ignoring unreadable {}: {}", self.config_path().display(), e);
                Ok(AppConfig::default())
            }
        }
    }

    pub fn write_config(&self, config: &AppConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.config_path(), json.as_bytes())
    }

    // --- Summaries ---

    /// Save a summary under `summaries/` and return its path.
    pub fn write_summary(&self, filename: &str, content: &str) -> Result<PathBuf> {
        validate_summary_filename(filename)?;
        let path = self.summaries_dir().join(filename);
        write_atomic(&path, content.as_bytes())?;
        Ok(path)
    }
}

/// Summary file names must be plain `*.md` names without path components.
pub fn validate_summary_filename(filename: &str) -> Result<()> {
    let valid = filename.len() > ".md".len()
        && filename.ends_with(".md")
        && !filename.contains('/')
        && !filename.contains('\\')
        && !filename.contains("..")
        && !filename.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("Invalid filename: {}", filename)))
    }
}

fn read_or_empty(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

/// Write `contents` to `path` via a temp file in the same directory.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::Other(format!("No parent directory for {}", path.display())))?;
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    fn date(s: &str) -> LogDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_read_missing_log_is_empty() {
        let env = TestEnv::new();
        let store = env.store();
        assert_eq!(store.read_log(&date("2024-01-01")).unwrap(), "");
        assert_eq!(store.read_rich_log(&date("2024-01-01")).unwrap(), "");
    }

    #[test]
    fn test_write_log_creates_directories() {
        let env = TestEnv::new();
        let store = env.store();
        let day = date("2024-05-06");
        store.write_log(&day, "- shipped it\n").unwrap();
        assert_eq!(store.read_log(&day).unwrap(), "- shipped it\n");
        assert!(env.path().join("logs/2024-05-06.md").exists());
    }

    #[test]
    fn test_rich_log_is_separate_file() {
        let env = TestEnv::new();
        let store = env.store();
        let day = date("2024-05-06");
        store.write_log(&day, "raw").unwrap();
        store.write_rich_log(&day, "rich").unwrap();
        assert_eq!(store.read_log(&day).unwrap(), "raw");
        assert_eq!(store.read_rich_log(&day).unwrap(), "rich");
        assert!(env.path().join("logs/2024-05-06.rich.md").exists());
    }

    #[test]
    fn test_list_log_dates_only_raw_logs_sorted() {
        let env = TestEnv::new();
        let store = env.store();
        store.write_log(&date("2024-05-07"), "b").unwrap();
        store.write_log(&date("2024-05-01"), "a").unwrap();
        store.write_rich_log(&date("2024-05-09"), "rich only").unwrap();
        fs::write(store.logs_dir().join("notes.md"), "x").unwrap();
        fs::write(store.logs_dir().join("2024-05-02.txt"), "x").unwrap();

        let dates = store.list_log_dates().unwrap();
        let dates: Vec<String> = dates.iter().map(|d| d.to_string()).collect();
        assert_eq!(dates, vec!["2024-05-01", "2024-05-07"]);
    }

    #[test]
    fn test_list_log_dates_missing_dir() {
        let env = TestEnv::new();
        assert!(env.store().list_log_dates().unwrap().is_empty());
    }

    #[test]
    fn test_collect_logs_prefers_rich_and_skips_blank() {
        let env = TestEnv::new();
        let store = env.store();
        store.write_log(&date("2024-05-01"), "raw one").unwrap();
        store.write_rich_log(&date("2024-05-01"), "rich one").unwrap();
        store.write_log(&date("2024-05-02"), "   \n").unwrap();
        store.write_log(&date("2024-05-03"), "raw three").unwrap();

        let logs = store
            .collect_logs(&date("2024-04-30"), &date("2024-05-03"))
            .unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].0.to_string(), "2024-05-01");
        assert_eq!(logs[0].1, "rich one");
        assert_eq!(logs[1].1, "raw three");
    }

    #[test]
    fn test_todo_lifecycle() {
        let env = TestEnv::new();
        let store = env.store();
        assert!(store.read_todos().unwrap().is_empty());

        let todos = store.add_todo("Review PR", TodoSource::Manual).unwrap();
        assert_eq!(todos.len(), 1);
        let id = todos[0].id.clone();

        let todos = store
            .update_todo(
                &id,
                &TodoPatch {
                    done: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(todos[0].done);

        let reread = store.read_todos().unwrap();
        assert_eq!(reread, todos);

        let todos = store.remove_todo(&id).unwrap();
        assert!(todos.is_empty());
        assert!(store.read_todos().unwrap().is_empty());
    }

    #[test]
    fn test_update_unknown_todo_is_not_found() {
        let env = TestEnv::new();
        let store = env.store();
        let result = store.update_todo("missing", &TodoPatch::default());
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_remove_unknown_todo_keeps_list() {
        let env = TestEnv::new();
        let store = env.store();
        store.add_todo("Keep me", TodoSource::Manual).unwrap();
        let todos = store.remove_todo("missing").unwrap();
        assert_eq!(todos.len(), 1);
    }

    #[test]
    fn test_add_todo_rejects_blank_title() {
        let env = TestEnv::new();
        let store = env.store();
        assert!(matches!(
            store.add_todo("  ", TodoSource::Manual),
            Err(Error::InvalidInput(_))
        ));
        assert!(!store.data_dir().join("todos.json").exists());
    }

    #[test]
    fn test_corrupt_todos_is_error_and_untouched() {
        let env = TestEnv::new();
        let store = env.store();
        fs::create_dir_all(store.data_dir()).unwrap();
        fs::write(store.data_dir().join("todos.json"), "{not json").unwrap();

        assert!(store.read_todos().is_err());
        assert!(store.add_todo("New", TodoSource::Manual).is_err());
        let raw = fs::read_to_string(store.data_dir().join("todos.json")).unwrap();
        assert_eq!(raw, "{not json");
    }

    #[test]
    fn test_todos_written_as_pretty_json() {
        let env = TestEnv::new();
        let store = env.store();
        store.add_todo("Pretty", TodoSource::Suggested).unwrap();
        let raw = fs::read_to_string(store.data_dir().join("todos.json")).unwrap();
        assert!(raw.starts_with("[\n"));
        assert!(raw.contains("\"source\": \"suggested\""));
    }

    #[test]
    fn test_config_roundtrip_and_defaults() {
        let env = TestEnv::new();
        let store = env.store();
        assert_eq!(store.read_config().unwrap(), AppConfig::default());

        let config = AppConfig {
            ignored_repos: vec!["legacy".to_string()],
        };
        store.write_config(&config).unwrap();
        assert_eq!(store.read_config().unwrap(), config);
    }

    #[test]
    fn test_config_partial_document_uses_defaults() {
        let env = TestEnv::new();
        let store = env.store();
        fs::create_dir_all(store.data_dir()).unwrap();
        fs::write(store.data_dir().join("config.json"), "{\"theme\": \"dark\"}").unwrap();
        assert!(store.read_config().unwrap().ignored_repos.is_empty());
    }

    #[test]
    fn test_write_summary() {
        let env = TestEnv::new();
        let store = env.store();
        let path = store.write_summary("week-12.md", "# Week 12").unwrap();
        assert_eq!(path, env.path().join("summaries/week-12.md"));
        assert_eq!(fs::read_to_string(path).unwrap(), "# Week 12");
    }

    #[test]
    fn test_summary_filename_validation() {
        for bad in ["notes.txt", "../escape.md", "a/b.md", "a\\b.md", ".md", ".hidden.md"] {
            assert!(validate_summary_filename(bad).is_err(), "accepted {:?}", bad);
        }
        assert!(validate_summary_filename("q3-review.md").is_ok());
    }
}
