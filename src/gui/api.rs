//! JSON API handlers for the dashboard.
//!
//! Request bodies are parsed by hand so that malformed JSON gets the same
//! `{"error": ...}` shape as every other failure. An empty body reads as `{}`.
//! Every body-carrying request must be sent as `application/json`; browsers
//! preflight that content type, so the CORS policy also covers writes.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::server::AppState;
use crate::config::AppConfig;
use crate::github::{GitHubNotification, MyPullRequest};
use crate::models::{CommitOutcome, LogDate, TodoItem, TodoPatch, TodoSource};
use crate::storage::commit_work_log;
use crate::{Error, demo};

/// Error response: status plus `{"error": message}`.
pub type ApiError = (StatusCode, Json<Value>);

fn error_message(e: &Error) -> String {
    match e {
        Error::InvalidInput(m) | Error::NotFound(m) => m.clone(),
        other => other.to_string(),
    }
}

fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn api_error(e: Error) -> ApiError {
    let status = status_for(&e);
    if status.is_server_error() {
        tracing::error!("request failed: {}", e);
    }
    (status, Json(json!({ "error": error_message(&e) })))
}

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn is_json_request(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

fn parse_body<T: DeserializeOwned>(headers: &HeaderMap, body: &Bytes) -> Result<T, ApiError> {
    if !is_json_request(headers) {
        return Err((
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(json!({ "error": "Expected Content-Type: application/json" })),
        ));
    }
    let raw: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        body
    };
    serde_json::from_slice(raw).map_err(|e| bad_request(&format!("Invalid request body: {}", e)))
}

/// Parse an optional date, defaulting to today when absent or empty.
fn date_or_today(raw: Option<&str>) -> Result<LogDate, ApiError> {
    match raw.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => d.parse().map_err(api_error),
        None => Ok(LogDate::today()),
    }
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DateBody {
    date: Option<String>,
}

// --- Logs ---

pub async fn get_log(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Value>, ApiError> {
    let date = date_or_today(query.date.as_deref())?;
    let store = state.store.lock().await;
    let content = store.read_log(&date).map_err(api_error)?;
    tracing::debug!(date = %date, len = content.len(), "read log");
    Ok(Json(json!({ "content": content, "date": date })))
}

#[derive(Debug, Deserialize)]
struct LogWrite {
    date: String,
    content: String,
}

pub async fn put_log(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: LogWrite = parse_body(&headers, &body)?;
    let date: LogDate = request.date.parse().map_err(api_error)?;
    let store = state.store.lock().await;
    store.write_log(&date, &request.content).map_err(api_error)?;
    tracing::debug!(date = %date, len = request.content.len(), "wrote log");
    Ok(Json(json!({ "success": true })))
}

pub async fn get_log_dates(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let store = state.store.lock().await;
    let dates = store.list_log_dates().map_err(api_error)?;
    Ok(Json(json!({ "dates": dates })))
}

pub async fn get_rich_log(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Value>, ApiError> {
    let date = date_or_today(query.date.as_deref())?;
    let store = state.store.lock().await;
    let content = store.read_rich_log(&date).map_err(api_error)?;
    Ok(Json(json!({ "content": content, "date": date })))
}

// --- Todos ---

pub async fn get_todos(State(state): State<AppState>) -> Result<Json<Vec<TodoItem>>, ApiError> {
    let store = state.store.lock().await;
    Ok(Json(store.read_todos().map_err(api_error)?))
}

#[derive(Debug, Deserialize)]
struct AddTodo {
    #[serde(default)]
    title: String,
    #[serde(default)]
    source: Option<TodoSource>,
}

pub async fn add_todo(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Vec<TodoItem>>, ApiError> {
    let request: AddTodo = parse_body(&headers, &body)?;
    let store = state.store.lock().await;
    let todos = store
        .add_todo(&request.title, request.source.unwrap_or_default())
        .map_err(api_error)?;
    tracing::info!(count = todos.len(), "added todo");
    Ok(Json(todos))
}

#[derive(Debug, Deserialize)]
struct UpdateTodo {
    id: String,
    #[serde(flatten)]
    patch: TodoPatch,
}

pub async fn update_todo(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Vec<TodoItem>>, ApiError> {
    let request: UpdateTodo = parse_body(&headers, &body)?;
    let store = state.store.lock().await;
    let todos = store
        .update_todo(&request.id, &request.patch)
        .map_err(api_error)?;
    tracing::info!(id = %request.id, "updated todo");
    Ok(Json(todos))
}

#[derive(Debug, Deserialize)]
struct DeleteTodo {
    id: String,
}

pub async fn delete_todo(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Vec<TodoItem>>, ApiError> {
    let request: DeleteTodo = parse_body(&headers, &body)?;
    let store = state.store.lock().await;
    let todos = store.remove_todo(&request.id).map_err(api_error)?;
    tracing::info!(id = %request.id, "removed todo");
    Ok(Json(todos))
}

pub async fn suggest_todos(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: DateBody = parse_body(&headers, &body)?;
    let Some(raw) = request.date.as_deref().filter(|d| !d.trim().is_empty()) else {
        return Ok(Json(json!(crate::assist::Suggestions::empty())));
    };
    let date: LogDate = raw.parse().map_err(api_error)?;

    let store = state.store.lock().await.clone();
    let suggestions = state
        .assistant
        .suggest_for_date(&store, &date)
        .await
        .map_err(api_error)?;
    tracing::info!(
        date = %date,
        count = suggestions.suggestions.len(),
        source = ?suggestions.source,
        "suggested todos"
    );
    Ok(Json(json!(suggestions)))
}

// --- GitHub ---

async fn app_config(state: &AppState) -> AppConfig {
    let store = state.store.lock().await;
    store.read_config().unwrap_or_else(|e| {
        tracing::warn!("using default config: {}", e);
        AppConfig::default()
    })
}

pub async fn get_prs(State(state): State<AppState>) -> Json<Vec<MyPullRequest>> {
    if state.demo {
        return Json(demo::demo_pull_requests(chrono::Utc::now()));
    }
    let config = app_config(&state).await;
    let result = match state.github.client().await {
        Ok(client) => client.fetch_my_prs(state.org.as_deref(), &config).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(prs) => {
            tracing::debug!(count = prs.len(), "fetched pull requests");
            Json(prs)
        }
        Err(e) => {
            tracing::warn!("failed to fetch pull requests: {}", e);
            Json(Vec::new())
        }
    }
}

pub async fn get_notifications(State(state): State<AppState>) -> Json<Vec<GitHubNotification>> {
    if state.demo {
        return Json(demo::demo_notifications(chrono::Utc::now()));
    }
    let config = app_config(&state).await;
    let result = match state.github.client().await {
        Ok(client) => {
            client
                .fetch_notifications(true, state.org.as_deref(), &config)
                .await
        }
        Err(e) => Err(e),
    };
    match result {
        Ok(notifications) => Json(notifications),
        Err(e) => {
            tracing::warn!("failed to fetch notifications: {}", e);
            Json(Vec::new())
        }
    }
}

// --- Config ---

pub async fn get_config(State(state): State<AppState>) -> Result<Json<AppConfig>, ApiError> {
    let store = state.store.lock().await;
    Ok(Json(store.read_config().map_err(api_error)?))
}

pub async fn put_config(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AppConfig>, ApiError> {
    let request: Value = parse_body(&headers, &body)?;
    let store = state.store.lock().await;
    let mut config = store.read_config().map_err(api_error)?;
    if let Some(repos) = request.get("ignoredRepos").and_then(Value::as_array) {
        config.set_ignored_repos(repos);
    }
    store.write_config(&config).map_err(api_error)?;
    tracing::info!(ignored = config.ignored_repos.len(), "updated config");
    Ok(Json(config))
}

// --- Git ---

#[derive(Debug, Default, Deserialize)]
struct CommitRequest {
    message: Option<String>,
}

pub async fn commit(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CommitOutcome>, ApiError> {
    let request: CommitRequest = parse_body(&headers, &body)?;
    let root = state.data_root.clone();
    let result = tokio::task::spawn_blocking(move || commit_work_log(&root, request.message.as_deref()))
        .await
        .map_err(|e| Error::Other(e.to_string()))
        .and_then(|r| r);

    match result {
        Ok(outcome) => {
            let event = json!({
                "type": "commit",
                "committed": outcome.committed,
                "message": outcome.message,
                "pushed": outcome.pushed,
            });
            let _ = state.update_tx.send(event.to_string());
            Ok(Json(outcome))
        }
        Err(e) => {
            tracing::error!("commit failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "committed": false, "message": e.to_string() })),
            ))
        }
    }
}

// --- Assist ---

/// Map an enrich/linkify result to `{success, content}` / `{success: false, message}`.
fn rewrite_response(result: crate::Result<String>) -> Result<Json<Value>, ApiError> {
    match result {
        Ok(content) => Ok(Json(json!({ "success": true, "content": content }))),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                tracing::error!("log rewrite failed: {}", e);
            }
            Err((
                status,
                Json(json!({ "success": false, "message": error_message(&e) })),
            ))
        }
    }
}

pub async fn linkify(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: DateBody = parse_body(&headers, &body)?;
    let date = date_or_today(request.date.as_deref())?;
    let store = state.store.lock().await.clone();
    rewrite_response(state.assistant.linkify_log(&store, &date).await)
}

pub async fn enrich(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: DateBody = parse_body(&headers, &body)?;
    let date = date_or_today(request.date.as_deref())?;
    let store = state.store.lock().await.clone();
    rewrite_response(state.assistant.enrich_log(&store, &date).await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryRequest {
    start_date: Option<String>,
    end_date: Option<String>,
    prompt: Option<String>,
}

pub async fn summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: SummaryRequest = parse_body(&headers, &body)?;
    let (Some(start), Some(end)) = (request.start_date.as_deref(), request.end_date.as_deref()) else {
        return Err(bad_request("Missing start or end date"));
    };
    let start: LogDate = start.parse().map_err(api_error)?;
    let end: LogDate = end.parse().map_err(api_error)?;

    let store = state.store.lock().await.clone();
    let summary = state
        .assistant
        .summarize_range(&store, &start, &end, request.prompt.as_deref())
        .await
        .map_err(api_error)?;
    tracing::info!(start = %start, end = %end, len = summary.len(), "generated summary");
    Ok(Json(json!({ "summary": summary })))
}

#[derive(Debug, Deserialize)]
struct SaveSummary {
    filename: Option<String>,
    content: Option<String>,
}

pub async fn save_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: SaveSummary = parse_body(&headers, &body)?;
    let (Some(filename), Some(content)) = (
        request.filename.filter(|f| !f.is_empty()),
        request.content.filter(|c| !c.is_empty()),
    ) else {
        return Err(bad_request("Missing filename or content"));
    };

    let store = state.store.lock().await;
    store.write_summary(&filename, &content).map_err(api_error)?;
    tracing::info!(filename = %filename, "saved summary");
    Ok(Json(json!({ "success": true, "path": filename })))
}

// --- Status ---

pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let scheduler = state.scheduler.as_ref().map(|s| {
        json!({
            "running": s.is_running(),
            "periodSecs": s.period().as_secs(),
        })
    });
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "commit": env!("LOGPILOT_GIT_COMMIT"),
        "builtAt": env!("LOGPILOT_BUILD_TIMESTAMP"),
        "dataDir": state.data_root,
        "org": state.org,
        "demo": state.demo,
        "model": state.assistant.has_model(),
        "scheduler": scheduler,
        "today": LogDate::today(),
    }))
}
