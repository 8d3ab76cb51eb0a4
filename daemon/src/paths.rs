/// Canonical file locations for AutoHdr data on Windows.
///
/// Everything lives under %APPDATA%\AutoHdr\:
///   - config.toml  Watch-list and toggle-executable settings, read at startup.
///   - status.toml  Runtime status written by the daemon for an external GUI.
use std::path::PathBuf;

const APP_DIR_NAME: &str = "AutoHdr";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const STATUS_FILE_NAME: &str = "status.toml";

/// Returns the AutoHdr application data directory: %APPDATA%\AutoHdr\
pub fn app_data_dir() -> PathBuf {
    let appdata = std::env::var("APPDATA").expect("APPDATA environment variable not set");
    PathBuf::from(appdata).join(APP_DIR_NAME)
}

/// Returns the full path to the config file: %APPDATA%\AutoHdr\config.toml
pub fn config_file_path() -> PathBuf {
    app_data_dir().join(CONFIG_FILE_NAME)
}

/// Returns the full path to the status file: %APPDATA%\AutoHdr\status.toml
pub fn status_file_path() -> PathBuf {
    app_data_dir().join(STATUS_FILE_NAME)
}
