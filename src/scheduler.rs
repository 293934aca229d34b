//! Periodic auto-commit of the data root.
//!
//! Once started, the scheduler ticks every period (the first tick comes one
//! full period after `start`). On each tick it commits the tracked
//! directories. When the local date changed since the previous tick, the
//! commit is labelled `Close work log <previous date>` instead of the default
//! message. Tick failures are logged and never stop the timer.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::models::{CommitOutcome, LogDate};
use crate::storage::commit_work_log;

/// Remembers the last date seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayTracker {
    last: LogDate,
}

impl DayTracker {
    pub fn new(today: LogDate) -> Self {
        Self { last: today }
    }

    pub fn last(&self) -> LogDate {
        self.last
    }

    /// Record `today`. Returns the previous date when the day rolled over.
    pub fn observe(&mut self, today: LogDate) -> Option<LogDate> {
        if today == self.last {
            return None;
        }
        let previous = self.last;
        self.last = today;
        Some(previous)
    }
}

/// Commit message for a tick: the closing message after a rollover,
/// otherwise `None` for the default message.
pub fn tick_message(rolled_over_from: Option<LogDate>) -> Option<String> {
    rolled_over_from.map(|d| format!("Close work log {}", d))
}

/// Run one scheduler tick against `root`.
///
/// Returns the commit outcome, or `None` when the commit failed.
pub async fn run_tick(
    root: &Path,
    tracker: &mut DayTracker,
    today: LogDate,
    notifier: Option<&broadcast::Sender<String>>,
) -> Option<CommitOutcome> {
    let rolled_over = tracker.observe(today);
    if let Some(previous) = rolled_over {
        tracing::info!(previous = %previous, today = %today, "day rollover");
    }
    let message = tick_message(rolled_over);

    let root = root.to_path_buf();
    let result = tokio::task::spawn_blocking(move || commit_work_log(&root, message.as_deref())).await;

    let event = match result {
        Ok(Ok(outcome)) => {
            let event = serde_json::json!({
                "type": "commit",
                "committed": outcome.committed,
                "message": outcome.message,
                "pushed": outcome.pushed,
            });
            notify(notifier, event);
            return Some(outcome);
        }
        Ok(Err(e)) => {
            tracing::warn!("scheduled commit failed: {}", e);
            e.to_string()
        }
        Err(e) => {
            tracing::warn!("scheduled commit task failed: {}", e);
            e.to_string()
        }
    };
    notify(
        notifier,
        serde_json::json!({ "type": "commit", "committed": false, "message": event }),
    );
    None
}

fn notify(notifier: Option<&broadcast::Sender<String>>, event: serde_json::Value) {
    if let Some(tx) = notifier {
        // No subscribers is fine.
        let _ = tx.send(event.to_string());
    }
}

/// Process-wide periodic committer.
#[derive(Debug)]
pub struct Scheduler {
    root: PathBuf,
    period: Duration,
    notifier: Option<broadcast::Sender<String>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(root: &Path, period: Duration) -> Self {
        Self {
            root: root.to_path_buf(),
            period,
            notifier: None,
            handle: Mutex::new(None),
        }
    }

    /// Publish a `commit` event on `tx` after every tick.
    pub fn with_notifier(mut self, tx: broadcast::Sender<String>) -> Self {
        self.notifier = Some(tx);
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start the timer. Returns false if it was already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let Ok(mut handle) = self.handle.lock() else {
            return false;
        };
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            tracing::debug!("scheduler already running");
            return false;
        }

        let root = self.root.clone();
        let period = self.period;
        let notifier = self.notifier.clone();
        *handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut tracker = DayTracker::new(LogDate::today());
            loop {
                interval.tick().await;
                run_tick(&root, &mut tracker, LogDate::today(), notifier.as_ref()).await;
            }
        }));
        tracing::info!(period_secs = period.as_secs(), "auto-commit scheduler started");
        true
    }

    /// Stop the timer. Returns false if it was not running.
    pub fn stop(&self) -> bool {
        let Ok(mut handle) = self.handle.lock() else {
            return false;
        };
        match handle.take() {
            Some(h) => {
                h.abort();
                tracing::info!("auto-commit scheduler stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .map(|h| h.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
