//! File system watcher for work log changes.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::models::LogDate;

/// Debounce duration - wait this long after last event before sending updates
const DEBOUNCE_MS: u64 = 200;

/// Which log a changed file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogKind {
    Raw,
    Rich,
}

impl LogKind {
    fn as_str(self) -> &'static str {
        match self {
            LogKind::Raw => "raw",
            LogKind::Rich => "rich",
        }
    }
}

/// Classify a path under `logs/` as a raw or rich log of some day.
pub fn classify_log_path(path: &Path) -> Option<(LogDate, LogKind)> {
    let name = path.file_name()?.to_str()?;
    if let Some(stem) = name.strip_suffix(".rich.md") {
        return stem.parse().ok().map(|d| (d, LogKind::Rich));
    }
    let stem = name.strip_suffix(".md")?;
    stem.parse().ok().map(|d| (d, LogKind::Raw))
}

/// The `log-changed` event sent to WebSocket clients.
pub fn log_changed_event(date: &LogDate, kind: LogKind) -> String {
    serde_json::json!({
        "type": "log-changed",
        "date": date,
        "kind": kind.as_str(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
    .to_string()
}

/// Watch the logs directory and broadcast a `log-changed` event per changed
/// log file once writes settle.
pub async fn watch_logs(
    logs_dir: PathBuf,
    update_tx: broadcast::Sender<String>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all(&logs_dir)?;
    let (tx, mut rx) = tokio::sync::mpsc::channel(100);

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.blocking_send(event);
            }
        },
        Config::default(),
    )?;
    watcher.watch(&logs_dir, RecursiveMode::NonRecursive)?;
    tracing::debug!("watching {}", logs_dir.display());

    let mut pending: BTreeSet<(LogDate, LogKind)> = BTreeSet::new();
    let mut last_event_time = Instant::now();
    let debounce = Duration::from_millis(DEBOUNCE_MS);

    loop {
        let timeout = debounce.saturating_sub(last_event_time.elapsed());

        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                match event.kind {
                    notify::EventKind::Create(_)
                    | notify::EventKind::Modify(_)
                    | notify::EventKind::Remove(_) => {
                        let before = pending.len();
                        pending.extend(event.paths.iter().filter_map(|p| classify_log_path(p)));
                        if pending.len() != before {
                            last_event_time = Instant::now();
                        }
                    }
                    _ => {}
                }
            }
            _ = tokio::time::sleep(timeout), if !pending.is_empty() => {
                for (date, kind) in std::mem::take(&mut pending) {
                    let _ = update_tx.send(log_changed_event(&date, kind));
                }
            }
        }
    }

    Ok(())
}
