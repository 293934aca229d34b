//! Canned GitHub data for demo mode.
//!
//! Timestamps are relative to `now` so the dashboard always shows fresh
//! looking activity.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::github::{CiStatus, GitHubNotification, MergeQueueState, MyPullRequest};

fn ago(now: DateTime<Utc>, delta: Duration) -> String {
    (now - delta).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Open pull requests shown in demo mode.
pub fn demo_pull_requests(now: DateTime<Utc>) -> Vec<MyPullRequest> {
    vec![
        MyPullRequest {
            id: 101,
            number: 52,
            title: "feat: Add user settings page".to_string(),
            url: "https://github.com/acme/frontend/pull/52".to_string(),
            repo_full_name: "acme/frontend".to_string(),
            state: "open".to_string(),
            draft: false,
            created_at: ago(now, Duration::days(2)),
            updated_at: ago(now, Duration::hours(1)),
            additions: 450,
            deletions: 120,
            review_decision: Some("APPROVED".to_string()),
            ci_status: Some(CiStatus::Success),
            unresolved_threads: 0,
            merge_queue_state: Some(MergeQueueState::Queued),
        },
        MyPullRequest {
            id: 102,
            number: 53,
            title: "fix: Login redirect loop".to_string(),
            url: "https://github.com/acme/frontend/pull/53".to_string(),
            repo_full_name: "acme/frontend".to_string(),
            state: "open".to_string(),
            draft: true,
            created_at: ago(now, Duration::days(1)),
            updated_at: ago(now, Duration::hours(2)),
            additions: 15,
            deletions: 5,
            review_decision: None,
            ci_status: Some(CiStatus::Pending),
            unresolved_threads: 0,
            merge_queue_state: None,
        },
        MyPullRequest {
            id: 103,
            number: 48,
            title: "fix: API timeout handling".to_string(),
            url: "https://github.com/acme/backend/pull/48".to_string(),
            repo_full_name: "acme/backend".to_string(),
            state: "open".to_string(),
            draft: false,
            created_at: ago(now, Duration::days(4)),
            updated_at: ago(now, Duration::hours(5)),
            additions: 88,
            deletions: 31,
            review_decision: Some("CHANGES_REQUESTED".to_string()),
            ci_status: Some(CiStatus::Failure),
            unresolved_threads: 2,
            merge_queue_state: None,
        },
    ]
}

/// Notifications shown in demo mode.
pub fn demo_notifications(now: DateTime<Utc>) -> Vec<GitHubNotification> {
    vec![
        GitHubNotification {
            id: "n1".to_string(),
            reason: "review_requested".to_string(),
            title: "refactor: Migrate to Tailwind v4".to_string(),
            url: "https://api.github.com/repos/acme/frontend/pulls/101".to_string(),
            repo_full_name: "acme/frontend".to_string(),
            kind: "PullRequest".to_string(),
            updated_at: ago(now, Duration::minutes(30)),
            unread: true,
        },
        GitHubNotification {
            id: "n2".to_string(),
            reason: "mention".to_string(),
            title: "bug: Chart crashes on mobile".to_string(),
            url: "https://api.github.com/repos/acme/frontend/issues/105".to_string(),
            repo_full_name: "acme/frontend".to_string(),
            kind: "Issue".to_string(),
            updated_at: ago(now, Duration::hours(4)),
            unread: true,
        },
        GitHubNotification {
            id: "n3".to_string(),
            reason: "assign".to_string(),
            title: "docs: Update contributing guide".to_string(),
            url: "https://api.github.com/repos/acme/docs/issues/12".to_string(),
            repo_full_name: "acme/docs".to_string(),
            kind: "Issue".to_string(),
            updated_at: ago(now, Duration::days(1)),
            unread: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_demo_timestamps_are_relative() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let prs = demo_pull_requests(now);
        assert_eq!(prs[0].updated_at, "2024-06-01T11:00:00Z");
        assert_eq!(prs[0].created_at, "2024-05-30T12:00:00Z");

        let notifications = demo_notifications(now);
        assert_eq!(notifications[0].updated_at, "2024-06-01T11:30:00Z");
    }

    #[test]
    fn test_demo_data_covers_states() {
        let prs = demo_pull_requests(Utc::now());
        assert!(prs.iter().any(|p| p.draft));
        assert!(prs.iter().any(|p| p.ci_status == Some(CiStatus::Failure)));
        assert!(prs.iter().any(|p| p.merge_queue_state.is_some()));
        assert!(demo_notifications(Utc::now()).iter().any(|n| !n.unread));
    }
}
