//! Follow-up TODO suggestions from a day's log.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::llm::extract_json;

pub(crate) const SUGGEST_SYSTEM_PROMPT: &str = "You are a productivity assistant. Given a developer's work log, suggest 1-3 actionable TODO items for follow-up work. Return ONLY a JSON array of strings, e.g. [\"Review PR feedback\",\"Write tests for auth module\"]. It's ok to return an empty array. No extra text.";

/// Maximum suggestions taken from a free-text answer.
const MAX_LINE_SUGGESTIONS: usize = 5;

/// Maximum suggestions taken from open checklist items.
const MAX_FALLBACK_SUGGESTIONS: usize = 3;

static LIST_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*\d.)\s]+").expect("Invalid regex"));

static OPEN_CHECKBOX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[-*+]\s+\[ \]\s+(.+?)\s*$").expect("Invalid regex"));

/// Where a batch of suggestions came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    /// The chat model
    Model,
    /// Unchecked checklist items of the log
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestions {
    pub suggestions: Vec<String>,
    pub source: SuggestionSource,
}

impl Suggestions {
    pub fn empty() -> Self {
        Self {
            suggestions: Vec::new(),
            source: SuggestionSource::Fallback,
        }
    }
}

/// Read a model answer: a JSON array of strings when possible, otherwise one
/// suggestion per non-empty line with list markers stripped.
pub fn parse_suggestions(answer: &str) -> Vec<String> {
    match serde_json::from_str::<serde_json::Value>(extract_json(answer)) {
        Ok(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Ok(_) => Vec::new(),
        Err(_) => {
            tracing::debug!("suggestion answer is not JSON, parsing lines");
            answer
                .lines()
                .map(|l| LIST_MARKER_RE.replace(l, "").trim().to_string())
                .filter(|l| !l.is_empty())
                .take(MAX_LINE_SUGGESTIONS)
                .collect()
        }
    }
}

/// Open `- [ ]` items of the log, in order.
pub fn fallback_suggestions(log: &str) -> Vec<String> {
    OPEN_CHECKBOX_RE
        .captures_iter(log)
        .map(|c| c[1].to_string())
        .take(MAX_FALLBACK_SUGGESTIONS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_array() {
        assert_eq!(
            parse_suggestions(r#"["Review PR feedback", " Write tests ", ""]"#),
            vec!["Review PR feedback", "Write tests"]
        );
    }

    #[test]
    fn test_parse_fenced_json() {
        assert_eq!(
            parse_suggestions("```json\n[\"Ping Sam\"]\n```"),
            vec!["Ping Sam"]
        );
    }

    #[test]
    fn test_parse_json_non_array_is_empty() {
        assert!(parse_suggestions(r#"{"todo": "x"}"#).is_empty());
    }

    #[test]
    fn test_parse_lines_fallback() {
        let answer = "1. Follow up with design\n- Fix flaky test\n\n* Update docs\n2) Ship\n3. Five\n4. Six";
        assert_eq!(
            parse_suggestions(answer),
            vec!["Follow up with design", "Fix flaky test", "Update docs", "Ship", "Five"]
        );
    }

    #[test]
    fn test_fallback_takes_open_items() {
        let log = "\
- [x] Done thing
- [ ] Add unit tests
  - [ ] Nested follow-up
* [ ] Star item
- [ ] Fourth";
        assert_eq!(
            fallback_suggestions(log),
            vec!["Add unit tests", "Nested follow-up", "Star item"]
        );
    }

    #[test]
    fn test_fallback_none() {
        assert!(fallback_suggestions("- plain bullet\n- [x] closed").is_empty());
    }

    #[test]
    fn test_suggestions_json_shape() {
        let s = Suggestions {
            suggestions: vec!["a".to_string()],
            source: SuggestionSource::Model,
        };
        assert_eq!(
            serde_json::to_value(&s).unwrap(),
            serde_json::json!({ "suggestions": ["a"], "source": "model" })
        );
    }
}
