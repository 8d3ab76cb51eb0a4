use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::time::timeout;

use crate::tracker::Edge;

/// How long one toggle invocation may run before it is killed. The HDR
/// controller normally returns in well under a second; anything longer means
/// it is wedged and must not stall the poll loop indefinitely.
const DISPATCH_TIMEOUT_SECS: u64 = 10;

/// Invokes the external HDR controller executable as `<exe> on` / `<exe> off`.
///
/// The executable's exit code is its entire contract: the display state is
/// never read back, so correctness rests on the caller only dispatching on
/// empty/non-empty edges of the watched set.
pub struct ToggleController {
    exe: PathBuf,
}

impl ToggleController {
    /// Wraps the controller at `exe`, verifying up front that it exists.
    /// A missing controller makes the whole daemon pointless, so this is a
    /// startup-fatal check rather than a per-dispatch one.
    pub fn new(exe: PathBuf) -> Result<Self> {
        if !exe.is_file() {
            anyhow::bail!("HDR controller executable not found: {}", exe.display());
        }
        Ok(Self { exe })
    }

    /// Runs the controller with the argument for `edge`, waiting for it to
    /// exit. Spawn failures, non-zero exits, and timeouts are returned as
    /// errors; the caller logs them and carries on, because the tracked
    /// state must not be rolled back for a fire-and-forget side effect.
    pub async fn dispatch(&self, edge: Edge) -> Result<()> {
        let arg = edge.as_arg();
        eprintln!("[toggle] Dispatching HDR {arg}");

        let mut child = Command::new(&self.exe)
            .arg(arg)
            .spawn()
            .with_context(|| format!("Failed to run {}", self.exe.display()))?;

        match timeout(Duration::from_secs(DISPATCH_TIMEOUT_SECS), child.wait()).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => anyhow::bail!("HDR controller exited with {status}"),
            Ok(Err(e)) => Err(e).context("Failed waiting for HDR controller"),
            Err(_) => {
                let _ = child.kill().await;
                anyhow::bail!("HDR controller timed out after {DISPATCH_TIMEOUT_SECS}s");
            }
        }
    }
}
