//! System utilities for subprocesses, process liveness and paths.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use wait_timeout::ChildExt;

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Errors from [`run_with_timeout`].
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The program could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// The program did not exit in time and was killed
    #[error("{program} timed out after {secs}s")]
    TimedOut { program: String, secs: u64 },

    #[error("IO error while waiting for {program}: {source}")]
    Io {
        program: String,
        source: std::io::Error,
    },
}

/// Run `program args...` in `cwd`, killing it if it runs longer than `timeout`.
///
/// Output pipes are drained on helper threads so a chatty child cannot block
/// on a full pipe while we wait for it.
pub fn run_with_timeout(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<CommandOutput, CommandError> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().map_err(|source| CommandError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let stdout_handle = std::thread::spawn(move || drain(stdout_pipe));
    let stderr_handle = std::thread::spawn(move || drain(stderr_pipe));

    let status = child.wait_timeout(timeout).map_err(|source| CommandError::Io {
        program: program.to_string(),
        source,
    })?;

    match status {
        Some(status) => Ok(CommandOutput {
            success: status.success(),
            stdout: stdout_handle.join().unwrap_or_default(),
            stderr: stderr_handle.join().unwrap_or_default(),
        }),
        None => {
            let _ = child.kill();
            let _ = child.wait();
            Err(CommandError::TimedOut {
                program: program.to_string(),
                secs: timeout.as_secs(),
            })
        }
    }
}

fn drain<R: Read>(pipe: Option<R>) -> String {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut buf);
    }
    buf
}

/// Check whether a process with the given PID is alive.
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    // 0 and negative values address process groups, not one process.
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // SAFETY: kill with signal 0 performs only the existence/permission check.
    let result = unsafe { libc::kill(pid, 0) };
    if result == 0 {
        return true;
    }
    // EPERM means the process exists but belongs to someone else.
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
pub fn process_alive(_pid: u32) -> bool {
    false
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
