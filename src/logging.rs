//! Tracing setup.
//!
//! Human-readable events go to stderr, filtered by `RUST_LOG` (or a default
//! directive). The server additionally writes JSON lines to a daily-rolling
//! file under the platform data directory.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Default filter for long-running `serve`.
pub const SERVE_FILTER: &str = "logpilot=info";

/// Default filter for one-shot commands.
pub const CLI_FILTER: &str = "logpilot=warn";

const LOG_FILE_PREFIX: &str = "logpilot";
const MAX_LOG_FILES: usize = 7;

/// Directory for rolling log files (`<data dir>/logpilot/logs`).
pub fn default_log_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("logpilot").join("logs"))
}

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install the global subscriber.
///
/// With `file_dir` set, JSON events are also appended to a daily file in that
/// directory; keep the returned guard alive until shutdown so buffered lines
/// are flushed. Failing to open the file directory only disables the file
/// layer.
pub fn init(default_directive: &str, file_dir: Option<&Path>) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter(default_directive));

    let (file_layer, guard) = match file_dir.map(open_appender) {
        Some(Ok(appender)) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(env_filter(default_directive));
            (Some(layer), Some(guard))
        }
        Some(Err(e)) => {
            eprintln!("Warning: file logging disabled: {}", e);
            (None, None)
        }
        None => (None, None),
    };

    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    guard
}

fn open_appender(dir: &Path) -> Result<tracing_appender::rolling::RollingFileAppender, String> {
    std::fs::create_dir_all(dir).map_err(|e| format!("{}: {}", dir.display(), e))?;
    Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(dir)
        .map_err(|e| e.to_string())
}
