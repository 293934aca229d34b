//! GitHub issue and pull request links found in work logs.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use super::{GitHubClient, GitHubError};
use crate::config::AppConfig;

static GITHUB_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://github\.com/([^/\s]+)/([^/\s]+)/(issues|pull)/(\d+)").expect("Invalid regex")
});

/// Whether a link points at an issue or a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Issue,
    Pull,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkKind::Issue => write!(f, "issue"),
            LinkKind::Pull => write!(f, "pull"),
        }
    }
}

/// Components of an issue or pull request URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub kind: LinkKind,
}

/// Details of a linked issue or pull request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub url: String,
    pub owner: String,
    pub repo: String,
    pub number: u64,
    #[serde(rename = "type")]
    pub kind: LinkKind,
    pub title: String,
    pub state: String,
    pub labels: Vec<String>,
}

/// Parse the first `https://github.com/<owner>/<repo>/(issues|pull)/<n>` in `url`.
pub fn parse_github_url(url: &str) -> Option<ParsedUrl> {
    let caps = GITHUB_URL_RE.captures(url)?;
    Some(ParsedUrl {
        owner: caps[1].to_string(),
        repo: caps[2].to_string(),
        kind: if &caps[3] == "pull" {
            LinkKind::Pull
        } else {
            LinkKind::Issue
        },
        number: caps[4].parse().ok()?,
    })
}

/// Every distinct issue/PR URL in `markdown`, in first-seen order.
///
/// When `org` is set only URLs owned by it are kept. URLs in ignored
/// repositories are dropped.
pub fn extract_github_urls(markdown: &str, org: Option<&str>, config: &AppConfig) -> Vec<String> {
    let mut seen = HashSet::new();
    GITHUB_URL_RE
        .find_iter(markdown)
        .map(|m| m.as_str())
        .filter(|url| seen.insert(*url))
        .filter(|url| match parse_github_url(url) {
            Some(parsed) => {
                org.is_none_or(|o| parsed.owner == o) && !config.is_ignored(&parsed.repo)
            }
            None => false,
        })
        .map(String::from)
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Label {
    Name(String),
    Object { name: Option<String> },
}

impl Label {
    fn into_name(self) -> String {
        match self {
            Label::Name(name) => name,
            Label::Object { name } => name.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IssueOrPull {
    title: String,
    state: String,
    #[serde(default)]
    labels: Vec<Label>,
}

impl GitHubClient {
    /// Look up the title, state and labels behind an issue or PR URL.
    pub async fn link_info(&self, url: &str) -> Result<LinkInfo, GitHubError> {
        let parsed = parse_github_url(url)
            .ok_or_else(|| GitHubError::Parse(format!("Not a GitHub issue or PR URL: {}", url)))?;
        let path = match parsed.kind {
            LinkKind::Pull => format!("/repos/{}/{}/pulls/{}", parsed.owner, parsed.repo, parsed.number),
            LinkKind::Issue => format!("/repos/{}/{}/issues/{}", parsed.owner, parsed.repo, parsed.number),
        };
        let data: IssueOrPull = self.get_json(&path, &[]).await?;

        Ok(LinkInfo {
            url: url.to_string(),
            owner: parsed.owner,
            repo: parsed.repo,
            number: parsed.number,
            kind: parsed.kind,
            title: data.title,
            state: data.state,
            labels: data.labels.into_iter().map(Label::into_name).collect(),
        })
    }

    /// Like [`link_info`](Self::link_info) but any failure yields `None`.
    pub async fn fetch_link_info(&self, url: &str) -> Option<LinkInfo> {
        match self.link_info(url).await {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::debug!("link lookup failed for {}: {}", url, e);
                None
            }
        }
    }

    /// Fetch details for every URL concurrently, keeping the ones that resolved.
    pub async fn fetch_link_infos(&self, urls: &[String]) -> Vec<LinkInfo> {
        futures::future::join_all(urls.iter().map(|u| self.fetch_link_info(u)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pull_url() {
        let parsed = parse_github_url("https://github.com/acme/api/pull/42").unwrap();
        assert_eq!(parsed.owner, "acme");
        assert_eq!(parsed.repo, "api");
        assert_eq!(parsed.number, 42);
        assert_eq!(parsed.kind, LinkKind::Pull);
    }

    #[test]
    fn test_parse_issue_url_with_suffix() {
        let parsed = parse_github_url("https://github.com/acme/web/issues/7#issuecomment-1").unwrap();
        assert_eq!(parsed.kind, LinkKind::Issue);
        assert_eq!(parsed.number, 7);
    }

    #[test]
    fn test_parse_rejects_other_urls() {
        assert!(parse_github_url("https://github.com/acme/web").is_none());
        assert!(parse_github_url("https://github.com/acme/web/commits/abc").is_none());
        assert!(parse_github_url("http://github.com/acme/web/pull/1").is_none());
    }

    #[test]
    fn test_extract_unique_first_seen_order() {
        let md = "\
- https://github.com/acme/b/pull/2
- https://github.com/acme/a/issues/1 and again https://github.com/acme/b/pull/2
- [done](https://github.com/acme/c/pull/3)";
        let urls = extract_github_urls(md, None, &AppConfig::default());
        assert_eq!(
            urls,
            vec![
                "https://github.com/acme/b/pull/2",
                "https://github.com/acme/a/issues/1",
                "https://github.com/acme/c/pull/3",
            ]
        );
    }

    #[test]
    fn test_extract_filters_org_and_ignored() {
        let md = "https://github.com/acme/keep/pull/1 https://github.com/other/x/pull/2 https://github.com/acme/legacy/issues/3";
        let config = AppConfig {
            ignored_repos: vec!["legacy".to_string()],
        };
        let urls = extract_github_urls(md, Some("acme"), &config);
        assert_eq!(urls, vec!["https://github.com/acme/keep/pull/1"]);

        let urls = extract_github_urls(md, None, &config);
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn test_label_shapes() {
        let data: IssueOrPull = serde_json::from_str(
            r#"{"title":"T","state":"open","labels":["plain",{"name":"bug"},{"name":null}]}"#,
        )
        .unwrap();
        let names: Vec<String> = data.labels.into_iter().map(Label::into_name).collect();
        assert_eq!(names, vec!["plain", "bug", ""]);
    }

    #[test]
    fn test_link_info_json_uses_type_key() {
        let info = LinkInfo {
            url: "https://github.com/acme/a/pull/1".to_string(),
            owner: "acme".to_string(),
            repo: "a".to_string(),
            number: 1,
            kind: LinkKind::Pull,
            title: "Fix".to_string(),
            state: "open".to_string(),
            labels: vec![],
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["type"], "pull");
    }
}
