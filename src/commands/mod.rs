//! Command implementations for the Logpilot CLI.
//!
//! Each command returns a result type implementing [`Output`], printed as
//! JSON by default or as text with `-H`. Commands are grouped as:
//! - `init`, `commit` - data root and git
//! - `log_*` - daily logs
//! - `todo_*` - the TODO list
//! - `config_*` - settings and ignored repositories
//! - `prs`, `notifications` - GitHub
//! - `enrich`, `linkify`, `suggest`, `summary` - assist

use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assist::{Assistant, ChatClient, SuggestionSource, Suggestions};
use crate::config::schema::{MAX_IGNORED_REPO_LEN, MAX_IGNORED_REPOS};
use crate::config::resolver::EnvLookup;
use crate::config::{AppConfig, ResolvedSettings, masked_token, resolve_github_token};
use crate::github::{GitHubNotification, GitHubProvider, MyPullRequest};
use crate::models::{CommitOutcome, LogDate, TodoItem, TodoPatch, TodoSource};
use crate::storage::{Store, commit_work_log, init_repository};
use crate::{Error, Result, demo};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

/// Parse an optional date argument, defaulting to today.
pub fn date_or_today(date: Option<&str>) -> Result<LogDate> {
    match date {
        Some(d) => d.parse(),
        None => Ok(LogDate::today()),
    }
}

// === init ===

#[derive(Serialize)]
pub struct InitResult {
    pub data_dir: PathBuf,
    pub git_initialized: bool,
}

impl Output for InitResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("Initialized {}", self.data_dir.display());
        if self.git_initialized {
            out.push_str("\nCreated git repository");
        }
        out
    }
}

/// Create `logs/`, `data/` and `summaries/` and a git repository if needed.
pub fn init(root: &Path) -> Result<InitResult> {
    let git_initialized = init_repository(root)?;
    tracing::info!(root = %root.display(), git_initialized, "initialized data root");
    Ok(InitResult {
        data_dir: root.to_path_buf(),
        git_initialized,
    })
}

// === commit ===

impl Output for CommitOutcome {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        if !self.committed {
            return self.message.clone();
        }
        let mut out = format!("Committed: {}", self.message);
        for file in &self.files {
            let _ = write!(out, "\n  {}", file);
        }
        if self.pushed {
            out.push_str("\nPushed to remote");
        }
        out
    }
}

pub fn commit(root: &Path, message: Option<&str>) -> Result<CommitOutcome> {
    commit_work_log(root, message)
}

// === log ===

#[derive(Serialize)]
pub struct LogShow {
    pub date: LogDate,
    pub content: String,
}

impl Output for LogShow {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        if self.content.trim().is_empty() {
            format!("No log for {}", self.date)
        } else {
            self.content.trim_end().to_string()
        }
    }
}

pub fn log_show(root: &Path, date: Option<&str>) -> Result<LogShow> {
    let date = date_or_today(date)?;
    let content = Store::new(root).read_log(&date)?;
    Ok(LogShow { date, content })
}

pub fn log_rich(root: &Path, date: Option<&str>) -> Result<LogShow> {
    let date = date_or_today(date)?;
    let content = Store::new(root).read_rich_log(&date)?;
    Ok(LogShow { date, content })
}

#[derive(Serialize)]
pub struct LogWritten {
    pub date: LogDate,
    pub path: PathBuf,
    pub bytes: usize,
}

impl Output for LogWritten {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Wrote {} ({} bytes)", self.path.display(), self.bytes)
    }
}

/// Replace a day's log, or append `content` as a new line when `append`.
pub fn log_write(root: &Path, date: Option<&str>, content: &str, append: bool) -> Result<LogWritten> {
    let date = date_or_today(date)?;
    let store = Store::new(root);
    let content = if append {
        let mut existing = store.read_log(&date)?;
        if !existing.is_empty() && !existing.ends_with('\n') {
            existing.push('\n');
        }
        existing.push_str(content);
        existing
    } else {
        content.to_string()
    };
    store.write_log(&date, &content)?;
    Ok(LogWritten {
        date,
        path: store.log_path(&date),
        bytes: content.len(),
    })
}

#[derive(Serialize)]
pub struct LogDates {
    pub dates: Vec<LogDate>,
}

impl Output for LogDates {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        if self.dates.is_empty() {
            return "No logs yet".to_string();
        }
        self.dates
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn log_dates(root: &Path) -> Result<LogDates> {
    Ok(LogDates {
        dates: Store::new(root).list_log_dates()?,
    })
}

// === todo ===

/// Number of id characters shown in human output.
const SHORT_ID_LEN: usize = 8;

#[derive(Serialize)]
pub struct TodoList {
    pub todos: Vec<TodoItem>,
}

impl Output for TodoList {
    fn to_json(&self) -> String {
        json_string(&self.todos)
    }

    fn to_human(&self) -> String {
        if self.todos.is_empty() {
            return "No todos".to_string();
        }
        self.todos
            .iter()
            .map(|t| {
                let mark = if t.done { "x" } else { " " };
                let id: String = t.id.chars().take(SHORT_ID_LEN).collect();
                let suggested = if t.source == TodoSource::Suggested {
                    " (suggested)"
                } else {
                    ""
                };
                format!("[{}] {}  {}{}", mark, id, t.title, suggested)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Resolve a full id or a unique id prefix.
pub fn resolve_todo_id(todos: &[TodoItem], prefix: &str) -> Result<String> {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return Err(Error::InvalidInput("Todo id cannot be empty".to_string()));
    }
    if let Some(exact) = todos.iter().find(|t| t.id == prefix) {
        return Ok(exact.id.clone());
    }
    let matches: Vec<&TodoItem> = todos.iter().filter(|t| t.id.starts_with(prefix)).collect();
    match matches.as_slice() {
        [] => Err(Error::NotFound(format!("Todo {}", prefix))),
        [one] => Ok(one.id.clone()),
        _ => Err(Error::InvalidInput(format!(
            "Ambiguous todo id '{}': matches {} items",
            prefix,
            matches.len()
        ))),
    }
}

pub fn todo_list(root: &Path, open_only: bool) -> Result<TodoList> {
    let mut todos = Store::new(root).read_todos()?;
    if open_only {
        todos.retain(|t| !t.done);
    }
    Ok(TodoList { todos })
}

pub fn todo_add(root: &Path, title: &str, source: TodoSource) -> Result<TodoList> {
    let todos = Store::new(root).add_todo(title, source)?;
    Ok(TodoList { todos })
}

pub fn todo_set_done(root: &Path, id: &str, done: bool) -> Result<TodoList> {
    let store = Store::new(root);
    let id = resolve_todo_id(&store.read_todos()?, id)?;
    let patch = TodoPatch {
        done: Some(done),
        ..TodoPatch::default()
    };
    Ok(TodoList {
        todos: store.update_todo(&id, &patch)?,
    })
}

pub fn todo_remove(root: &Path, id: &str) -> Result<TodoList> {
    let store = Store::new(root);
    let id = resolve_todo_id(&store.read_todos()?, id)?;
    Ok(TodoList {
        todos: store.remove_todo(&id)?,
    })
}

// === config ===

#[derive(Serialize)]
pub struct ConfigShow {
    pub settings: serde_json::Value,
    pub github_token: TokenStatus,
    pub app: AppConfig,
}

/// The GitHub token as shown by `config show`: masked value and source, or
/// why none could be found.
#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum TokenStatus {
    Found { value: String, source: String },
    Missing { error: String },
}

impl TokenStatus {
    pub fn resolve(env: EnvLookup<'_>) -> Self {
        match resolve_github_token(env) {
            Ok(token) => TokenStatus::Found {
                value: masked_token(&token.value),
                source: token.source.to_string(),
            },
            Err(e) => TokenStatus::Missing {
                error: e.to_string(),
            },
        }
    }
}

impl Output for ConfigShow {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = String::new();
        if let Some(path) = self.settings.get("settings_path").and_then(|p| p.as_str()) {
            let _ = writeln!(out, "settings file: {}", path);
        }
        if let Some(entries) = self.settings.as_object() {
            for (key, entry) in entries {
                let (Some(value), Some(source)) = (entry.get("value"), entry.get("source")) else {
                    continue;
                };
                let value = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
                let _ = writeln!(out, "{} = {} ({})", key, value, source.as_str().unwrap_or("?"));
            }
        }
        match &self.github_token {
            TokenStatus::Found { value, source } => {
                let _ = writeln!(out, "github token = {} ({})", value, source);
            }
            TokenStatus::Missing { error } => {
                let _ = writeln!(out, "github token: unavailable ({})", error);
            }
        }
        if self.app.ignored_repos.is_empty() {
            out.push_str("ignored repos: none");
        } else {
            let _ = write!(out, "ignored repos: {}", self.app.ignored_repos.join(", "));
        }
        out
    }
}

pub fn config_show(settings: &ResolvedSettings, env: EnvLookup<'_>) -> Result<ConfigShow> {
    Ok(ConfigShow {
        settings: settings.to_json(),
        github_token: TokenStatus::resolve(env),
        app: Store::new(settings.data_dir()).read_config()?,
    })
}

impl Output for AppConfig {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        if self.ignored_repos.is_empty() {
            "No ignored repositories".to_string()
        } else {
            format!("Ignored repositories:\n  {}", self.ignored_repos.join("\n  "))
        }
    }
}

fn validate_repo_name(repo: &str) -> Result<()> {
    let valid = !repo.is_empty()
        && repo.chars().count() <= MAX_IGNORED_REPO_LEN
        && !repo.contains('/')
        && !repo.chars().any(char::is_whitespace);
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "Invalid repository '{}': expected a repository name without owner",
            repo
        )))
    }
}

pub fn config_ignore_add(root: &Path, repo: &str) -> Result<AppConfig> {
    let repo = repo.trim();
    validate_repo_name(repo)?;
    let store = Store::new(root);
    let mut config = store.read_config()?;
    if config.is_ignored(repo) {
        return Ok(config);
    }
    if config.ignored_repos.len() >= MAX_IGNORED_REPOS {
        return Err(Error::InvalidInput(format!(
            "Cannot ignore more than {} repositories",
            MAX_IGNORED_REPOS
        )));
    }
    let mut entries: Vec<serde_json::Value> = config
        .ignored_repos
        .iter()
        .map(|r| serde_json::Value::from(r.as_str()))
        .collect();
    entries.push(serde_json::Value::from(repo));
    config.set_ignored_repos(&entries);
    store.write_config(&config)?;
    Ok(config)
}

pub fn config_ignore_rm(root: &Path, repo: &str) -> Result<AppConfig> {
    let repo = repo.trim();
    let store = Store::new(root);
    let mut config = store.read_config()?;
    if !config.is_ignored(repo) {
        return Err(Error::NotFound(format!("Ignored repository {}", repo)));
    }
    config.ignored_repos.retain(|r| r != repo);
    store.write_config(&config)?;
    Ok(config)
}

// === GitHub ===

#[derive(Serialize)]
#[serde(transparent)]
pub struct PrList {
    pub prs: Vec<MyPullRequest>,
}

impl Output for PrList {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        if self.prs.is_empty() {
            return "No open pull requests".to_string();
        }
        self.prs
            .iter()
            .map(|pr| {
                let mut line = format!("{}#{} {}", pr.repo_full_name, pr.number, pr.title);
                if pr.draft {
                    line.push_str(" [draft]");
                }
                let mut details = vec![format!("+{} -{}", pr.additions, pr.deletions)];
                if let Some(ci) = pr.ci_status {
                    details.push(format!("ci {:?}", ci).to_lowercase());
                }
                if let Some(review) = &pr.review_decision {
                    details.push(review.to_lowercase().replace('_', " "));
                }
                if pr.unresolved_threads > 0 {
                    details.push(format!("{} unresolved", pr.unresolved_threads));
                }
                if let Some(queue) = pr.merge_queue_state {
                    details.push(format!("{:?}", queue).to_lowercase());
                }
                format!("{}\n    {}\n    {}", line, details.join(", "), pr.url)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Serialize)]
#[serde(transparent)]
pub struct NotificationList {
    pub notifications: Vec<GitHubNotification>,
}

impl Output for NotificationList {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        if self.notifications.is_empty() {
            return "No notifications".to_string();
        }
        self.notifications
            .iter()
            .map(|n| {
                let unread = if n.unread { "*" } else { " " };
                format!(
                    "{} {} [{}] {}\n    {}",
                    unread,
                    n.repo_full_name,
                    n.reason.replace('_', " "),
                    n.title,
                    n.url
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn provider(settings: &ResolvedSettings) -> GitHubProvider {
    GitHubProvider::new(&settings.github_api_url.value)
}

pub async fn prs(settings: &ResolvedSettings) -> Result<PrList> {
    if settings.demo.value {
        return Ok(PrList {
            prs: demo::demo_pull_requests(chrono::Utc::now()),
        });
    }
    let config = Store::new(settings.data_dir()).read_config()?;
    let github = provider(settings);
    let client = github.client().await?;
    let prs = client.fetch_my_prs(settings.github_org(), &config).await?;
    Ok(PrList { prs })
}

pub async fn notifications(settings: &ResolvedSettings) -> Result<NotificationList> {
    if settings.demo.value {
        return Ok(NotificationList {
            notifications: demo::demo_notifications(chrono::Utc::now()),
        });
    }
    let config = Store::new(settings.data_dir()).read_config()?;
    let github = provider(settings);
    let client = github.client().await?;
    let notifications = client
        .fetch_notifications(true, settings.github_org(), &config)
        .await?;
    Ok(NotificationList { notifications })
}

// === assist ===

/// Build the assistant, resolving the chat model token off the async runtime.
async fn assistant(settings: &ResolvedSettings) -> Result<Assistant> {
    let model = {
        let settings = settings.clone();
        tokio::task::spawn_blocking(move || ChatClient::from_settings(&settings))
            .await
            .map_err(|e| Error::Other(e.to_string()))?
    };
    let org = settings.github_org().map(str::to_string);
    Ok(Assistant::new(model, Arc::new(provider(settings)), org))
}

#[derive(Serialize)]
pub struct Rewritten {
    pub date: LogDate,
    pub path: PathBuf,
    pub content: String,
}

impl Output for Rewritten {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!("{}\n\nWrote {}", self.content.trim_end(), self.path.display())
    }
}

pub async fn enrich(settings: &ResolvedSettings, date: Option<&str>) -> Result<Rewritten> {
    let date = date_or_today(date)?;
    let store = Store::new(settings.data_dir());
    let content = assistant(settings).await?.enrich_log(&store, &date).await?;
    Ok(Rewritten {
        path: store.rich_log_path(&date),
        date,
        content,
    })
}

pub async fn linkify(settings: &ResolvedSettings, date: Option<&str>) -> Result<Rewritten> {
    let date = date_or_today(date)?;
    let store = Store::new(settings.data_dir());
    let content = assistant(settings).await?.linkify_log(&store, &date).await?;
    Ok(Rewritten {
        path: store.log_path(&date),
        date,
        content,
    })
}

impl Output for Suggestions {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        if self.suggestions.is_empty() {
            return "No suggestions".to_string();
        }
        let source = match self.source {
            SuggestionSource::Model => "model",
            SuggestionSource::Fallback => "open checklist items",
        };
        let mut out = format!("Suggestions (from {}):", source);
        for s in &self.suggestions {
            let _ = write!(out, "\n  - {}", s);
        }
        out
    }
}

pub async fn suggest(settings: &ResolvedSettings, date: Option<&str>) -> Result<Suggestions> {
    let date = date_or_today(date)?;
    let store = Store::new(settings.data_dir());
    assistant(settings).await?.suggest_for_date(&store, &date).await
}

#[derive(Serialize)]
pub struct SummaryResult {
    pub start: LogDate,
    pub end: LogDate,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved: Option<PathBuf>,
}

impl Output for SummaryResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        match &self.saved {
            Some(path) => format!("{}\n\nSaved {}", self.summary.trim_end(), path.display()),
            None => self.summary.trim_end().to_string(),
        }
    }
}

pub async fn summary(
    settings: &ResolvedSettings,
    from: &str,
    to: &str,
    prompt: Option<&str>,
    save: Option<&str>,
) -> Result<SummaryResult> {
    let start: LogDate = from.parse()?;
    let end: LogDate = to.parse()?;
    if let Some(name) = save {
        crate::storage::validate_summary_filename(name)?;
    }
    let store = Store::new(settings.data_dir());
    let summary = assistant(settings)
        .await?
        .summarize_range(&store, &start, &end, prompt)
        .await?;
    let saved = match save {
        Some(name) => Some(store.write_summary(name, &summary)?),
        None => None,
    };
    Ok(SummaryResult {
        start,
        end,
        summary,
        saved,
    })
}
