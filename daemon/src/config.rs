use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default HDR controller executable, resolved relative to the daemon binary
/// when the config gives no absolute path.
pub const DEFAULT_TOGGLE_EXE: &str = "hdr_controller.exe";

/// Root configuration structure. Deserialized from %APPDATA%\AutoHdr\config.toml.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    /// Ordered watch-list; earlier entries win when a process matches several.
    #[serde(default)]
    pub games: Vec<WatchRule>,
}

#[derive(Debug, Deserialize)]
pub struct GlobalConfig {
    /// Path to the single-shot HDR toggle executable (`<exe> on` / `<exe> off`).
    /// %VAR%-style environment references are expanded; a relative path is
    /// resolved against the directory containing the daemon binary.
    #[serde(default = "default_toggle_exe")]
    pub toggle_exe: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            toggle_exe: DEFAULT_TOGGLE_EXE.to_string(),
        }
    }
}

impl GlobalConfig {
    /// Resolves `toggle_exe` to a concrete path: expands embedded environment
    /// variables, then anchors a relative result at `exe_dir`.
    pub fn toggle_exe_path(&self, exe_dir: &Path) -> PathBuf {
        let expanded = PathBuf::from(expand_env(&self.toggle_exe));
        if expanded.is_absolute() {
            expanded
        } else {
            exe_dir.join(expanded)
        }
    }
}

/// One entry of the watch-list. A running process is "watched" when its
/// executable name equals `executable_name` and its full executable path
/// contains `folder`, both compared case-insensitively.
#[derive(Debug, Deserialize, Clone)]
pub struct WatchRule {
    /// Human-readable name used in log lines and the status file.
    pub display_name: String,
    /// Executable filename (e.g. "Cyberpunk2077.exe").
    pub executable_name: String,
    /// Substring that must appear in the executable's full path. Scopes the
    /// rule to an install location so same-named binaries elsewhere don't match.
    pub folder: String,
}

impl WatchRule {
    /// Returns true when `name` and `path` satisfy this rule.
    pub fn matches(&self, name: &str, path: &Path) -> bool {
        if self.executable_name.to_lowercase() != name.to_lowercase() {
            return false;
        }
        path.to_string_lossy()
            .to_lowercase()
            .contains(&self.folder.to_lowercase())
    }
}

fn default_toggle_exe() -> String {
    DEFAULT_TOGGLE_EXE.to_string()
}

/// Expands common `%VAR%`-style environment variables embedded in Windows paths.
fn expand_env(s: &str) -> String {
    let mut result = s.to_string();
    for var in &["USERPROFILE", "APPDATA", "LOCALAPPDATA", "PROGRAMFILES"] {
        if let Ok(val) = std::env::var(var) {
            result = result.replace(&format!("%{var}%"), &val);
        }
    }
    result
}

/// Loads the config file at `path`.
///
/// Unlike a defaulting loader, a missing file is an error: without a
/// watch-list the daemon has nothing to do, and starting with an empty one
/// would silently never toggle anything.
pub fn load(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("Config file not found: {}", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
