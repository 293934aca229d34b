//! Participating notifications, limited to open issues and pull requests.

use serde::{Deserialize, Serialize};

use super::{GitHubClient, GitHubError};
use crate::config::AppConfig;

/// Notification reasons worth surfacing on the dashboard.
pub const RELEVANT_REASONS: [&str; 5] = ["review_requested", "mention", "assign", "author", "comment"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubNotification {
    pub id: String,
    pub reason: String,
    pub title: String,
    /// API URL of the subject
    pub url: String,
    pub repo_full_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub updated_at: String,
    pub unread: bool,
}

#[derive(Debug, Deserialize)]
struct RawNotification {
    id: String,
    reason: String,
    unread: bool,
    updated_at: String,
    subject: Subject,
    repository: Repository,
}

#[derive(Debug, Deserialize)]
struct Subject {
    title: String,
    url: Option<String>,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct Repository {
    name: String,
    full_name: String,
    owner: Owner,
}

#[derive(Debug, Deserialize)]
struct Owner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct SubjectState {
    state: Option<String>,
}

impl RawNotification {
    fn is_relevant(&self, org: Option<&str>, config: &AppConfig) -> bool {
        org.is_none_or(|o| self.repository.owner.login == o)
            && !config.is_ignored(&self.repository.name)
            && matches!(self.subject.kind.as_str(), "Issue" | "PullRequest")
            && RELEVANT_REASONS.contains(&self.reason.as_str())
    }
}

impl GitHubClient {
    /// Notifications on open issues and PRs, filtered by org, ignored repos,
    /// subject type and reason.
    pub async fn fetch_notifications(
        &self,
        participating: bool,
        org: Option<&str>,
        config: &AppConfig,
    ) -> Result<Vec<GitHubNotification>, GitHubError> {
        let participating = participating.to_string();
        let raw: Vec<RawNotification> = self
            .get_json("/notifications", &[("participating", participating.as_str())])
            .await?;

        let candidates: Vec<RawNotification> = raw
            .into_iter()
            .filter(|n| n.is_relevant(org, config))
            .collect();
        tracing::debug!(count = candidates.len(), "checking notification subjects");

        let kept = futures::future::join_all(candidates.into_iter().map(|n| self.keep_if_open(n))).await;
        Ok(kept.into_iter().flatten().collect())
    }

    /// Drop notifications whose subject is closed. A subject that cannot be
    /// fetched is kept; one without a URL is dropped.
    async fn keep_if_open(&self, n: RawNotification) -> Option<GitHubNotification> {
        let url = n.subject.url.clone()?;
        match self.get_json::<SubjectState>(&url, &[]).await {
            Ok(SubjectState { state: Some(state) }) if state != "open" => return None,
            Ok(_) => {}
            Err(e) => tracing::debug!("could not fetch state of {}: {}", url, e),
        }

        Some(GitHubNotification {
            id: n.id,
            reason: n.reason,
            title: n.subject.title,
            url,
            repo_full_name: n.repository.full_name,
            kind: n.subject.kind,
            updated_at: n.updated_at,
            unread: n.unread,
        })
    }
}
