//! The authenticated user's open pull requests.
//!
//! PRs come from the search API, get their size from the pulls API and are
//! then enriched through one aliased GraphQL query with merge-queue, review
//! and CI state. The enrichment is best effort: when the GraphQL step fails
//! the PRs are returned with their defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{GitHubClient, GitHubError};
use crate::config::AppConfig;

/// Combined CI result of a PR's head commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CiStatus {
    Success,
    Failure,
    Pending,
}

/// Position of a PR relative to the merge queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeQueueState {
    Queued,
    Merging,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyPullRequest {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub repo_full_name: String,
    pub state: String,
    pub draft: bool,
    pub created_at: String,
    pub updated_at: String,
    pub additions: u64,
    pub deletions: u64,
    pub review_decision: Option<String>,
    pub ci_status: Option<CiStatus>,
    pub unresolved_threads: u32,
    pub merge_queue_state: Option<MergeQueueState>,
}

// --- REST payloads ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: u64,
    number: u64,
    title: String,
    html_url: String,
    repository_url: String,
    state: String,
    created_at: String,
    updated_at: String,
}

impl SearchItem {
    /// `(owner, repo)` from `.../repos/<owner>/<repo>`.
    fn owner_repo(&self) -> (String, String) {
        let mut parts = self.repository_url.rsplit('/');
        let repo = parts.next().unwrap_or_default().to_string();
        let owner = parts.next().unwrap_or_default().to_string();
        (owner, repo)
    }
}

#[derive(Debug, Deserialize)]
struct PullDetails {
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
    #[serde(default)]
    draft: Option<bool>,
}

// --- GraphQL payloads ---

#[derive(Debug, Clone, Deserialize)]
struct Nodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

impl<T> Default for Nodes<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlRepository {
    pull_request: Option<GqlPullRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlPullRequest {
    merge_queue_entry: Option<MergeQueueEntry>,
    review_decision: Option<String>,
    #[serde(default)]
    commits: Nodes<GqlCommitNode>,
    #[serde(default)]
    review_threads: Nodes<ReviewThread>,
}

#[derive(Debug, Deserialize)]
struct MergeQueueEntry {
    state: String,
}

#[derive(Debug, Deserialize)]
struct GqlCommitNode {
    commit: GqlCommit,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlCommit {
    status_check_rollup: Option<StatusCheckRollup>,
}

#[derive(Debug, Deserialize)]
struct StatusCheckRollup {
    #[serde(default)]
    contexts: Nodes<CheckContext>,
}

/// One entry of a status-check rollup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "__typename")]
pub enum CheckContext {
    CheckRun {
        conclusion: Option<String>,
        #[serde(rename = "isRequired", default)]
        is_required: bool,
    },
    StatusContext {
        state: String,
        #[serde(rename = "isRequired", default)]
        is_required: bool,
    },
}

impl CheckContext {
    fn is_required(&self) -> bool {
        match self {
            CheckContext::CheckRun { is_required, .. } => *is_required,
            CheckContext::StatusContext { is_required, .. } => *is_required,
        }
    }

    fn is_failing(&self) -> bool {
        match self {
            CheckContext::CheckRun { conclusion, .. } => matches!(
                conclusion.as_deref(),
                Some("FAILURE" | "TIMED_OUT" | "STARTUP_FAILURE")
            ),
            CheckContext::StatusContext { state, .. } => matches!(state.as_str(), "FAILURE" | "ERROR"),
        }
    }

    fn is_pending(&self) -> bool {
        match self {
            CheckContext::CheckRun { conclusion, .. } => conclusion.is_none(),
            CheckContext::StatusContext { state, .. } => matches!(state.as_str(), "PENDING" | "EXPECTED"),
        }
    }
}

/// A review thread with the author of each comment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewThread {
    pub is_resolved: bool,
    pub is_outdated: bool,
    #[serde(default)]
    comments: Nodes<ThreadComment>,
}

#[derive(Debug, Clone, Deserialize)]
struct ThreadComment {
    author: Option<CommentAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
struct CommentAuthor {
    login: String,
}

impl ThreadComment {
    fn login(&self) -> &str {
        self.author.as_ref().map(|a| a.login.as_str()).unwrap_or("")
    }
}

impl ReviewThread {
    #[cfg(test)]
    fn new(is_resolved: bool, is_outdated: bool, authors: &[&str]) -> Self {
        Self {
            is_resolved,
            is_outdated,
            comments: Nodes {
                nodes: authors
                    .iter()
                    .map(|a| ThreadComment {
                        author: if a.is_empty() {
                            None
                        } else {
                            Some(CommentAuthor {
                                login: a.to_string(),
                            })
                        },
                    })
                    .collect(),
            },
        }
    }

    /// True if a human reviewer is waiting on `author` in this thread.
    fn awaits_author(&self, author: &str) -> bool {
        if self.is_resolved || self.is_outdated {
            return false;
        }
        let comments = &self.comments.nodes;
        if comments.is_empty() {
            return false;
        }
        let reviewer_commented = comments.iter().any(|c| {
            let login = c.login();
            !is_bot(login) && login != author
        });
        if !reviewer_commented {
            return false;
        }
        comments
            .iter()
            .rev()
            .find(|c| !is_bot(c.login()))
            .is_some_and(|c| c.login() != author)
    }
}

// --- Classification ---

/// Logins treated as automation rather than reviewers.
pub fn is_bot(login: &str) -> bool {
    login.is_empty() || login.ends_with("[bot]") || login == "copilot" || login == "github-copilot"
}

/// Map a merge-queue entry state to `merging` or `queued`.
pub fn merge_queue_state(entry_state: &str) -> MergeQueueState {
    match entry_state {
        "LOCKED" | "MERGEABLE" => MergeQueueState::Merging,
        _ => MergeQueueState::Queued,
    }
}

/// Reduce a status-check rollup to one CI status.
///
/// Only required checks count unless none are required. Failure wins over
/// pending, pending over success. No contexts at all means no status.
pub fn ci_status(contexts: &[CheckContext]) -> Option<CiStatus> {
    if contexts.is_empty() {
        return None;
    }
    let required: Vec<&CheckContext> = contexts.iter().filter(|c| c.is_required()).collect();
    let checks: Vec<&CheckContext> = if required.is_empty() {
        contexts.iter().collect()
    } else {
        required
    };

    if checks.iter().any(|c| c.is_failing()) {
        Some(CiStatus::Failure)
    } else if checks.iter().any(|c| c.is_pending()) {
        Some(CiStatus::Pending)
    } else {
        Some(CiStatus::Success)
    }
}

/// Number of threads where a human reviewer is waiting on `author`.
pub fn count_unresolved_threads(threads: &[ReviewThread], author: &str) -> u32 {
    threads.iter().filter(|t| t.awaits_author(author)).count() as u32
}

/// Build one query with an aliased `repository` field (`pr0`, `pr1`, ...)
/// per pull request.
fn enrichment_query(prs: &[MyPullRequest]) -> String {
    let fragments: Vec<String> = prs
        .iter()
        .enumerate()
        .map(|(i, pr)| {
            let (owner, repo) = pr.repo_full_name.split_once('/').unwrap_or(("", ""));
            let owner = serde_json::to_string(owner).unwrap_or_default();
            let repo = serde_json::to_string(repo).unwrap_or_default();
            let n = pr.number;
            format!(
                "pr{i}: repository(owner: {owner}, name: {repo}) {{ pullRequest(number: {n}) {{ \
                 number mergeQueueEntry {{ position state }} reviewDecision \
                 commits(last: 1) {{ nodes {{ commit {{ statusCheckRollup {{ contexts(first: 100) {{ nodes {{ \
                 __typename \
                 ... on CheckRun {{ conclusion isRequired(pullRequestNumber: {n}) }} \
                 ... on StatusContext {{ state isRequired(pullRequestNumber: {n}) }} \
                 }} }} }} }} }} }} \
                 reviewThreads(first: 100) {{ nodes {{ isResolved isOutdated comments(first: 100) {{ nodes {{ author {{ login }} }} }} }} }} \
                 }} }}"
            )
        })
        .collect();
    format!("query {{ {} }}", fragments.join("\n"))
}

fn apply_enrichment(pr: &mut MyPullRequest, gql: GqlPullRequest, author: &str) {
    pr.merge_queue_state = gql
        .merge_queue_entry
        .as_ref()
        .map(|e| merge_queue_state(&e.state));
    pr.review_decision = gql.review_decision;

    let contexts = gql
        .commits
        .nodes
        .into_iter()
        .next()
        .and_then(|n| n.commit.status_check_rollup)
        .map(|r| r.contexts.nodes)
        .unwrap_or_default();
    pr.ci_status = ci_status(&contexts);
    pr.unresolved_threads = count_unresolved_threads(&gql.review_threads.nodes, author);
}

impl GitHubClient {
    /// Open PRs authored by the token's user, newest activity first.
    pub async fn fetch_my_prs(
        &self,
        org: Option<&str>,
        config: &AppConfig,
    ) -> Result<Vec<MyPullRequest>, GitHubError> {
        let login = self.authenticated_user().await?.login;

        let mut query = format!("is:pr is:open author:{}", login);
        if let Some(org) = org {
            query.push_str(&format!(" org:{}", org));
        }
        let search: SearchResponse = self
            .get_json(
                "/search/issues",
                &[
                    ("q", query.as_str()),
                    ("sort", "updated"),
                    ("order", "desc"),
                    ("per_page", "30"),
                ],
            )
            .await?;

        let items: Vec<SearchItem> = search
            .items
            .into_iter()
            .filter(|item| !config.is_ignored(&item.owner_repo().1))
            .collect();

        let mut prs = futures::future::join_all(items.iter().map(|item| self.base_pull_request(item))).await;

        if !prs.is_empty() {
            if let Err(e) = self.enrich_pull_requests(&mut prs, &login).await {
                tracing::warn!("PR enrichment unavailable: {}", e);
            }
        }
        Ok(prs)
    }

    async fn base_pull_request(&self, item: &SearchItem) -> MyPullRequest {
        let (owner, repo) = item.owner_repo();
        let details: Option<PullDetails> = self
            .get_json(&format!("/repos/{}/{}/pulls/{}", owner, repo, item.number), &[])
            .await
            .ok();

        MyPullRequest {
            id: item.id,
            number: item.number,
            title: item.title.clone(),
            url: item.html_url.clone(),
            repo_full_name: format!("{}/{}", owner, repo),
            state: item.state.clone(),
            draft: details.as_ref().and_then(|d| d.draft).unwrap_or(false),
            created_at: item.created_at.clone(),
            updated_at: item.updated_at.clone(),
            additions: details.as_ref().map(|d| d.additions).unwrap_or(0),
            deletions: details.as_ref().map(|d| d.deletions).unwrap_or(0),
            review_decision: None,
            ci_status: None,
            unresolved_threads: 0,
            merge_queue_state: None,
        }
    }

    async fn enrich_pull_requests(
        &self,
        prs: &mut [MyPullRequest],
        author: &str,
    ) -> Result<(), GitHubError> {
        let query = enrichment_query(prs);
        let mut data: HashMap<String, Option<GqlRepository>> = self.graphql(&query).await?;

        for (i, pr) in prs.iter_mut().enumerate() {
            let gql = data
                .remove(&format!("pr{}", i))
                .flatten()
                .and_then(|r| r.pull_request);
            if let Some(gql) = gql {
                apply_enrichment(pr, gql, author);
            }
        }
        Ok(())
    }
}
