mod config;
mod matcher;
mod monitor;
mod paths;
mod snapshot;
mod startup;
mod status;
mod toggle;
mod tracker;

use std::path::{Path, PathBuf};

use tokio::sync::watch;

use crate::monitor::Monitor;
use crate::snapshot::SystemQuery;
use crate::toggle::ToggleController;

#[tokio::main]
async fn main() {
    // ── Startup-registration flags (handle and exit) ──────────────────────────
    match std::env::args().nth(1).as_deref() {
        Some("--register-startup") => {
            if let Err(e) = startup::register_startup() {
                eprintln!("[startup] {e:#}");
                std::process::exit(1);
            }
            return;
        }
        Some("--unregister-startup") => {
            if let Err(e) = startup::unregister_startup() {
                eprintln!("[startup] {e:#}");
                std::process::exit(1);
            }
            return;
        }
        Some(other) => {
            eprintln!("Unknown argument: {other}");
            eprintln!("Usage: autohdr-daemon [--register-startup | --unregister-startup]");
            std::process::exit(2);
        }
        None => {}
    }

    // ── App data directory ────────────────────────────────────────────────────
    let app_dir = paths::app_data_dir();
    if let Err(e) = std::fs::create_dir_all(&app_dir) {
        eprintln!("Failed to create app data directory {}: {e}", app_dir.display());
        std::process::exit(1);
    }

    // ── Configuration (fatal if missing or unparsable) ────────────────────────
    let config_path = paths::config_file_path();
    let config = match config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[config] {e:#}");
            std::process::exit(1);
        }
    };
    if config.games.is_empty() {
        eprintln!("[config] Watch-list is empty; HDR will never be toggled");
    }

    // ── HDR controller executable (fatal if missing) ──────────────────────────
    let toggle_path = config.global.toggle_exe_path(&exe_dir());
    let toggle = match ToggleController::new(toggle_path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("[toggle] {e:#}");
            std::process::exit(1);
        }
    };

    // ── Initial status ────────────────────────────────────────────────────────
    let status_path = paths::status_file_path();
    status::write_status(&status_path, &status::DaemonStatus::new());

    // ── Cancellation signal (Ctrl+C, or an embedding UI holding the sender) ──
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("[main] Ctrl+C received, stopping");
            let _ = cancel_tx.send(true);
        }
    });

    println!("autohdr-daemon v{} started", env!("CARGO_PKG_VERSION"));

    let monitor = Monitor::new(
        SystemQuery::new(),
        config.games,
        toggle,
        status_path.clone(),
    );
    monitor.run(cancel_rx).await;

    // Leave a clean idle status behind for any front-end still watching.
    status::write_status(&status_path, &status::DaemonStatus::new());
}

/// Directory containing the daemon binary, used to anchor relative paths from
/// the config. Falls back to the working directory if the exe path is opaque.
fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
