use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current operational state of the daemon.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "lowercase")]
pub enum DaemonState {
    /// No watched process is running; HDR was last commanded off.
    Idle,
    /// At least one watched process is running; HDR was last commanded on.
    Active,
}

/// Runtime status written by the daemon to %APPDATA%\AutoHdr\status.toml.
/// A tray or GUI front-end reads this file (read-only) to show what the
/// daemon is doing; the daemon itself never reads it back.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DaemonStatus {
    /// Daemon binary version (set from Cargo.toml at compile time).
    pub version: String,
    pub state: DaemonState,
    /// Display names of the watched processes currently running.
    pub active_games: Vec<String>,
    /// Direction of the most recent toggle dispatch ("on" or "off").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_toggle: Option<String>,
    /// RFC 3339 timestamp of the most recent toggle dispatch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_toggle_timestamp: Option<String>,
    /// Human-readable message for the most recent non-fatal error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DaemonStatus {
    /// Constructs the initial idle status on daemon startup.
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: DaemonState::Idle,
            active_games: Vec::new(),
            last_toggle: None,
            last_toggle_timestamp: None,
            error: None,
        }
    }
}

/// Serializes `status` to TOML and writes it to `path`, creating the parent
/// directory if needed. Failures are logged to stderr; a status write must
/// never take the daemon down.
pub fn write_status(path: &Path, status: &DaemonStatus) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("[status] Failed to create directory {}: {e}", parent.display());
            return;
        }
    }
    match toml::to_string_pretty(status) {
        Ok(content) => {
            if let Err(e) = std::fs::write(path, content) {
                eprintln!("[status] Failed to write status file: {e}");
            }
        }
        Err(e) => eprintln!("[status] Failed to serialize status: {e}"),
    }
}
