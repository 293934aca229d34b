//! PID file for the dashboard server.
//!
//! The file lives at `<data root>/.logpilot/server.pid` and records the
//! running server so a second `logpilot serve` on the same data root can
//! refuse to start and `logpilot status` style commands can find it.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::sys::process_alive;

/// Directory (relative to the data root) holding runtime state.
pub const RUNTIME_DIR: &str = ".logpilot";

/// Information stored in the PID file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPidInfo {
    /// Process ID of the running server
    pub pid: u32,
    /// Port the server is listening on
    pub port: u16,
    /// Host/address the server is bound to
    pub host: String,
}

/// Manages the server PID file.
///
/// Contents use a simple line format:
/// ```text
/// PID=12345
/// PORT=3000
/// HOST=127.0.0.1
/// ```
#[derive(Debug)]
pub struct ServerPidFile {
    path: PathBuf,
}

impl ServerPidFile {
    /// PID file for the given data root.
    pub fn new(data_root: &Path) -> Self {
        Self {
            path: data_root.join(RUNTIME_DIR).join("server.pid"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the PID file, creating its directory if needed.
    pub fn write(&self, info: &ServerPidInfo) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = format!("PID={}\nPORT={}\nHOST={}\n", info.pid, info.port, info.host);

        let mut file = fs::File::create(&self.path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;

        Ok(())
    }

    /// Read and parse the PID file. `Ok(None)` if it does not exist.
    pub fn read(&self) -> io::Result<Option<ServerPidInfo>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(Self::parse_contents(&contents)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Delete the PID file if it exists.
    pub fn delete(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Return the recorded server if its process is still alive.
    ///
    /// Stale or unreadable PID files are removed.
    pub fn check_running(&self) -> io::Result<Option<ServerPidInfo>> {
        let info = match self.read() {
            Ok(Some(info)) => info,
            Ok(None) => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                self.delete()?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if info.pid != std::process::id() && process_alive(info.pid) {
            Ok(Some(info))
        } else {
            self.delete()?;
            Ok(None)
        }
    }

    fn parse_contents(contents: &str) -> io::Result<ServerPidInfo> {
        let mut pid: Option<u32> = None;
        let mut port: Option<u16> = None;
        let mut host: Option<String> = None;

        for line in contents.lines() {
            let line = line.trim();
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key {
                "PID" => {
                    let parsed: u32 = value
                        .parse()
                        .ok()
                        .filter(|&p| p > 0 && p <= i32::MAX as u32)
                        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Invalid PID value"))?;
                    pid = Some(parsed);
                }
                "PORT" => {
                    port = Some(value.parse().map_err(|_| {
                        io::Error::new(io::ErrorKind::InvalidData, "Invalid PORT value")
                    })?);
                }
                "HOST" => host = Some(value.to_string()),
                _ => {}
            }
        }

        let missing = |field: &str| io::Error::new(io::ErrorKind::InvalidData, format!("Missing {} field", field));
        Ok(ServerPidInfo {
            pid: pid.ok_or_else(|| missing("PID"))?,
            port: port.ok_or_else(|| missing("PORT"))?,
            host: host.ok_or_else(|| missing("HOST"))?,
        })
    }
}
