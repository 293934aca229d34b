//! Data models for Logpilot.
//!
//! This module contains the core data structures persisted in the data root:
//! - `LogDate` - a validated `YYYY-MM-DD` day, the key of every work log
//! - `TodoItem` - an entry of the TODO list
//! - `CommitOutcome` - what an auto-commit did

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A calendar day in strict `YYYY-MM-DD` form.
///
/// Dates are used to build file names under `logs/`, so anything that is not
/// exactly four digits, two digits and two digits separated by dashes (and a
/// real calendar day) is rejected before a path is ever constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogDate(NaiveDate);

impl LogDate {
    /// Today's date in the local time zone.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// The following day, if representable.
    pub fn succ(&self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }

    /// Number of days from `self` to `other` (negative when `other` is earlier).
    pub fn days_until(&self, other: &LogDate) -> i64 {
        (other.0 - self.0).num_days()
    }

    /// Returns true if `s` has the shape `DDDD-DD-DD`.
    fn has_strict_shape(s: &str) -> bool {
        let bytes = s.as_bytes();
        bytes.len() == 10
            && bytes.iter().enumerate().all(|(i, b)| match i {
                4 | 7 => *b == b'-',
                _ => b.is_ascii_digit(),
            })
    }
}

impl FromStr for LogDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Self::has_strict_shape(s) {
            return Err(Error::InvalidInput(format!(
                "Invalid date '{}': expected YYYY-MM-DD",
                s
            )));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| Error::InvalidInput(format!("Invalid date '{}': not a calendar day", s)))
    }
}

impl TryFrom<String> for LogDate {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LogDate> for String {
    fn from(value: LogDate) -> Self {
        value.to_string()
    }
}

impl fmt::Display for LogDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Where a TODO item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TodoSource {
    /// Typed in by the user
    #[default]
    Manual,
    /// Accepted from an AI or fallback suggestion
    Suggested,
}

impl fmt::Display for TodoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TodoSource::Manual => write!(f, "manual"),
            TodoSource::Suggested => write!(f, "suggested"),
        }
    }
}

impl FromStr for TodoSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(TodoSource::Manual),
            "suggested" => Ok(TodoSource::Suggested),
            other => Err(Error::InvalidInput(format!(
                "Invalid todo source '{}': expected manual or suggested",
                other
            ))),
        }
    }
}

/// Maximum length of a TODO title, in characters.
pub const MAX_TODO_TITLE_LEN: usize = 500;

/// A single entry of the TODO list (`data/todos.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: String,
    pub title: String,
    pub done: bool,
    #[serde(default)]
    pub source: TodoSource,
    pub created_at: DateTime<Utc>,
}

impl TodoItem {
    /// Create a new open item with a fresh id.
    ///
    /// The title is validated but stored as given.
    pub fn new(title: &str, source: TodoSource) -> crate::Result<Self> {
        validate_todo_title(title)?;
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            done: false,
            source,
            created_at: Utc::now(),
        })
    }
}

/// Validate a TODO title: non-blank and at most [`MAX_TODO_TITLE_LEN`] characters.
pub fn validate_todo_title(title: &str) -> crate::Result<()> {
    if title.trim().is_empty() {
        return Err(Error::InvalidInput("Invalid title: must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TODO_TITLE_LEN {
        return Err(Error::InvalidInput(format!(
            "Invalid title: longer than {} characters",
            MAX_TODO_TITLE_LEN
        )));
    }
    Ok(())
}

/// Partial update of a TODO item. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoPatch {
    pub done: Option<bool>,
    pub title: Option<String>,
    pub source: Option<TodoSource>,
}

impl TodoPatch {
    /// Apply this patch to `item`.
    pub fn apply(&self, item: &mut TodoItem) -> crate::Result<()> {
        if let Some(title) = &self.title {
            validate_todo_title(title)?;
            item.title = title.clone();
        }
        if let Some(done) = self.done {
            item.done = done;
        }
        if let Some(source) = self.source {
            item.source = source;
        }
        Ok(())
    }
}

/// Result of an auto-commit attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitOutcome {
    /// Whether a commit was created
    pub committed: bool,
    /// Commit message, or the reason nothing was committed
    pub message: String,
    /// Whether the commit was pushed to a remote
    #[serde(default)]
    pub pushed: bool,
    /// Files included in the commit
    #[serde(default)]
    pub files: Vec<String>,
}

impl CommitOutcome {
    pub fn nothing_to_commit() -> Self {
        Self {
            committed: false,
            message: "Nothing to commit".to_string(),
            pushed: false,
            files: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_date_parses_strict_format() {
        let date: LogDate = "2024-03-09".parse().unwrap();
        assert_eq!(date.to_string(), "2024-03-09");
    }

    #[test]
    fn test_log_date_rejects_loose_formats() {
        for input in ["2024-3-9", "2024/03/09", "20240309", " 2024-03-09", "2024-03-09\n"] {
            assert!(input.parse::<LogDate>().is_err(), "accepted {:?}", input);
        }
    }

    #[test]
    fn test_log_date_rejects_path_traversal() {
        assert!("../../etc/pw".parse::<LogDate>().is_err());
        assert!("2024-01-01/../x".parse::<LogDate>().is_err());
    }

    #[test]
    fn test_log_date_rejects_impossible_day() {
        assert!("2023-02-29".parse::<LogDate>().is_err());
        assert!("2024-13-01".parse::<LogDate>().is_err());
        assert!("2024-02-29".parse::<LogDate>().is_ok());
    }

    #[test]
    fn test_log_date_serde_as_string() {
        let date: LogDate = "2024-12-31".parse().unwrap();
        let json = serde_json::to_string(&date).unwrap();
        assert_eq!(json, "\"2024-12-31\"");
        let back: LogDate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, date);
        assert!(serde_json::from_str::<LogDate>("\"nope\"").is_err());
    }

    #[test]
    fn test_log_date_succ_and_distance() {
        let start: LogDate = "2024-02-28".parse().unwrap();
        let next = start.succ().unwrap();
        assert_eq!(next.to_string(), "2024-02-29");
        let end: LogDate = "2024-03-02".parse().unwrap();
        assert_eq!(start.days_until(&end), 3);
        assert_eq!(end.days_until(&start), -3);
    }

    #[test]
    fn test_todo_item_json_shape() {
        let item = TodoItem::new("Write tests", TodoSource::Suggested).unwrap();
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["title"], "Write tests");
        assert_eq!(value["done"], false);
        assert_eq!(value["source"], "suggested");
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn test_todo_title_validation() {
        assert!(validate_todo_title("   ").is_err());
        assert!(validate_todo_title(&"x".repeat(MAX_TODO_TITLE_LEN)).is_ok());
        assert!(validate_todo_title(&"x".repeat(MAX_TODO_TITLE_LEN + 1)).is_err());
    }

    #[test]
    fn test_todo_patch_applies_only_present_fields() {
        let mut item = TodoItem::new("Original", TodoSource::Manual).unwrap();
        let patch = TodoPatch {
            done: Some(true),
            ..Default::default()
        };
        patch.apply(&mut item).unwrap();
        assert!(item.done);
        assert_eq!(item.title, "Original");
        assert_eq!(item.source, TodoSource::Manual);
    }

    #[test]
    fn test_todo_patch_rejects_blank_title() {
        let mut item = TodoItem::new("Original", TodoSource::Manual).unwrap();
        let patch = TodoPatch {
            title: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(patch.apply(&mut item).is_err());
        assert_eq!(item.title, "Original");
    }

    #[test]
    fn test_todo_source_parse() {
        assert_eq!("manual".parse::<TodoSource>().unwrap(), TodoSource::Manual);
        assert!("robot".parse::<TodoSource>().is_err());
    }
}
