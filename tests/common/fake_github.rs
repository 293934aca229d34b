//! In-process stand-in for the GitHub REST and GraphQL APIs.
//!
//! Serves one authenticated user (`me`) with:
//! - two open PRs in `acme/api` (#7) and `acme/legacy` (#3)
//! - issue `acme/api#9`, closed
//! - three notifications: a review request on #7, a mention on closed #9 and
//!   a release notification
//!
//! [`Faults`] makes selected endpoints fail.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};

/// How the GraphQL endpoint misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphqlFault {
    /// 200 with an `errors` array and no data
    Errors,
    /// 502 Bad Gateway
    ServerError,
}

/// Endpoints to break.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    pub graphql: Option<GraphqlFault>,
    /// `/repos/*/pulls/*` answer 500
    pub pull_details: bool,
    /// `/repos/acme/api/issues/9` answers 500
    pub issue_state: bool,
}

#[derive(Clone)]
struct FakeState {
    base: String,
    faults: Faults,
}

fn server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Server Error" })),
    )
        .into_response()
}

/// Start the fake API on an ephemeral port and return its base URL.
pub async fn start() -> String {
    start_with(Faults::default()).await
}

/// Start the fake API with the given endpoints broken.
pub async fn start_with(faults: Faults) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let app = Router::new()
        .route("/user", get(|| async { Json(json!({ "login": "me" })) }))
        .route("/search/issues", get(search))
        .route("/repos/acme/api/pulls/7", get(pull_7))
        .route("/repos/acme/legacy/pulls/3", get(pull_3))
        .route("/repos/acme/api/issues/9", get(issue_9))
        .route("/notifications", get(notifications))
        .route("/graphql", post(graphql))
        .with_state(FakeState {
            base: base.clone(),
            faults,
        });

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    base
}

fn search_item(base: &str, repo: &str, number: u64, title: &str) -> Value {
    json!({
        "id": 1000 + number,
        "number": number,
        "title": title,
        "html_url": format!("https://github.com/acme/{}/pull/{}", repo, number),
        "repository_url": format!("{}/repos/acme/{}", base, repo),
        "state": "open",
        "created_at": "2024-05-01T09:00:00Z",
        "updated_at": "2024-05-02T09:00:00Z",
    })
}

async fn search(State(FakeState { base, .. }): State<FakeState>) -> Json<Value> {
    Json(json!({
        "total_count": 2,
        "items": [
            search_item(&base, "api", 7, "Add rate limiting"),
            search_item(&base, "legacy", 3, "Remove dead code"),
        ],
    }))
}

async fn pull_7(State(state): State<FakeState>) -> Response {
    if state.faults.pull_details {
        return server_error();
    }
    Json(json!({
        "title": "Add rate limiting",
        "state": "open",
        "draft": false,
        "additions": 120,
        "deletions": 8,
        "labels": [{ "name": "feature" }],
    }))
    .into_response()
}

async fn pull_3(State(state): State<FakeState>) -> Response {
    if state.faults.pull_details {
        return server_error();
    }
    Json(json!({
        "title": "Remove dead code",
        "state": "open",
        "draft": true,
        "additions": 0,
        "deletions": 500,
        "labels": [],
    }))
    .into_response()
}

async fn issue_9(State(state): State<FakeState>) -> Response {
    if state.faults.issue_state {
        return server_error();
    }
    Json(json!({
        "title": "Flaky login test",
        "state": "closed",
        "labels": ["bug"],
    }))
    .into_response()
}

fn notification(base: &str, id: &str, reason: &str, kind: &str, title: &str, subject: Option<String>) -> Value {
    json!({
        "id": id,
        "reason": reason,
        "unread": true,
        "updated_at": "2024-05-02T10:00:00Z",
        "subject": { "title": title, "url": subject, "type": kind },
        "repository": {
            "name": "api",
            "full_name": "acme/api",
            "owner": { "login": "acme" },
            "url": format!("{}/repos/acme/api", base),
        },
    })
}

async fn notifications(State(FakeState { base, .. }): State<FakeState>) -> Json<Value> {
    Json(json!([
        notification(
            &base,
            "n1",
            "review_requested",
            "PullRequest",
            "Add rate limiting",
            Some(format!("{}/repos/acme/api/pulls/7", base)),
        ),
        notification(
            &base,
            "n2",
            "mention",
            "Issue",
            "Flaky login test",
            Some(format!("{}/repos/acme/api/issues/9", base)),
        ),
        notification(&base, "n3", "subscribed", "Release", "v1.2.0", None),
    ]))
}

async fn graphql(State(state): State<FakeState>, Json(body): Json<Value>) -> Response {
    match state.faults.graphql {
        Some(GraphqlFault::Errors) => {
            return Json(json!({
                "data": null,
                "errors": [{ "message": "Something went wrong while executing your query." }],
            }))
            .into_response();
        }
        Some(GraphqlFault::ServerError) => {
            return (StatusCode::BAD_GATEWAY, "upstream unavailable").into_response();
        }
        None => {}
    }
    let query = body["query"].as_str().unwrap_or_default();
    let mut data = serde_json::Map::new();
    if query.contains("pr0:") {
        data.insert(
            "pr0".to_string(),
            json!({
                "pullRequest": {
                    "number": 7,
                    "mergeQueueEntry": { "position": 1, "state": "QUEUED" },
                    "reviewDecision": "APPROVED",
                    "commits": { "nodes": [{ "commit": { "statusCheckRollup": { "contexts": { "nodes": [
                        { "__typename": "CheckRun", "conclusion": "SUCCESS", "isRequired": true },
                        { "__typename": "StatusContext", "state": "FAILURE", "isRequired": false }
                    ] } } } }] },
                    "reviewThreads": { "nodes": [
                        { "isResolved": false, "isOutdated": false, "comments": { "nodes": [
                            { "author": { "login": "me" } },
                            { "author": { "login": "reviewer" } }
                        ] } },
                        { "isResolved": true, "isOutdated": false, "comments": { "nodes": [
                            { "author": { "login": "reviewer" } }
                        ] } }
                    ] }
                }
            }),
        );
    }
    Json(json!({ "data": data })).into_response()
}
