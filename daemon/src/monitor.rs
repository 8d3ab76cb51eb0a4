use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use sysinfo::Pid;
use tokio::sync::watch;

use crate::config::WatchRule;
use crate::matcher;
use crate::snapshot::ProcessQuery;
use crate::status::{write_status, DaemonState, DaemonStatus};
use crate::toggle::ToggleController;
use crate::tracker::{ActiveSet, Edge};

pub const POLL_INTERVAL_SECS: u64 = 2;
/// Shortened delay after a failed snapshot so a transient enumeration error
/// doesn't cost a full poll period on top of the failure.
const RETRY_DELAY_SECS: u64 = 1;

/// The poll loop and everything it owns: the process query, the watch-list,
/// the tracked active set, the toggle controller, and the status file.
///
/// There is exactly one `Monitor` per daemon and it is the sole mutator of
/// the active set. The only way in from outside is the cancellation signal
/// passed to [`Monitor::run`].
pub struct Monitor<Q> {
    query: Q,
    rules: Vec<WatchRule>,
    active: ActiveSet,
    toggle: ToggleController,
    /// Display names of currently active pids, for log lines and the status
    /// file. Presentation only; membership is decided by `active`.
    names: HashMap<Pid, String>,
    status: DaemonStatus,
    status_path: PathBuf,
    poll_interval: Duration,
    retry_delay: Duration,
}

impl<Q: ProcessQuery> Monitor<Q> {
    pub fn new(
        query: Q,
        rules: Vec<WatchRule>,
        toggle: ToggleController,
        status_path: PathBuf,
    ) -> Self {
        Self {
            query,
            rules,
            active: ActiveSet::new(),
            toggle,
            names: HashMap::new(),
            status: DaemonStatus::new(),
            status_path,
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
            retry_delay: Duration::from_secs(RETRY_DELAY_SECS),
        }
    }

    /// Runs cycles until `cancel` is set.
    ///
    /// Cancellation is cooperative: the flag is observed once before each
    /// cycle and again while sleeping, never mid-cycle. No error escapes
    /// this loop; every per-cycle failure is logged and skipped.
    pub async fn run(mut self, mut cancel: watch::Receiver<bool>) {
        eprintln!(
            "[monitor] Watching {} configured game(s) every {POLL_INTERVAL_SECS}s",
            self.rules.len()
        );

        loop {
            if *cancel.borrow() {
                break;
            }
            let delay = self.cycle().await;
            tokio::select! {
                _ = cancel.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        eprintln!("[monitor] Stopped");
    }

    /// One poll cycle: snapshot → match → diff → dispatch → status.
    /// Returns how long to sleep before the next cycle.
    async fn cycle(&mut self) -> Duration {
        let snapshot = match self.query.snapshot() {
            Ok(s) => s,
            // Skip the cycle outright: the active set keeps last cycle's
            // view rather than guessing from a failed enumeration.
            Err(e) => {
                eprintln!("[monitor] Process snapshot failed, skipping cycle: {e:#}");
                return self.retry_delay;
            }
        };

        let matches = matcher::watched(&snapshot, &self.rules);
        let matched_ids: HashSet<Pid> = matches.keys().copied().collect();
        let delta = self.active.observe(&matched_ids, &snapshot);

        for pid in &delta.entered {
            let name = matches
                .get(pid)
                .map(|rule| rule.display_name.clone())
                .unwrap_or_default();
            eprintln!("[monitor] Detected: {name} (pid {pid})");
            self.names.insert(*pid, name);
        }
        for pid in &delta.exited {
            match self.names.remove(pid) {
                Some(name) => eprintln!("[monitor] Exited: {name} (pid {pid})"),
                None => eprintln!("[monitor] Exited: pid {pid}"),
            }
        }

        if let Some(edge) = delta.edge {
            self.apply_edge(edge).await;
        } else if !delta.is_quiet() {
            // Membership changed without crossing the empty/non-empty
            // boundary; keep the status file's game list current.
            self.refresh_active_games();
            write_status(&self.status_path, &self.status);
        }

        self.poll_interval
    }

    /// Dispatches the toggle for `edge` and records the outcome in the
    /// status file. A failed dispatch is logged and remembered in
    /// `status.error`, nothing more: the active set is never rolled back,
    /// and the next edge will naturally retry in the other direction.
    async fn apply_edge(&mut self, edge: Edge) {
        match self.toggle.dispatch(edge).await {
            Ok(()) => self.status.error = None,
            Err(e) => {
                eprintln!("[monitor] HDR {} dispatch failed: {e:#}", edge.as_arg());
                self.status.error = Some(format!("HDR {} failed: {e:#}", edge.as_arg()));
            }
        }

        self.status.state = match edge {
            Edge::On => DaemonState::Active,
            Edge::Off => DaemonState::Idle,
        };
        self.status.last_toggle = Some(edge.as_arg().to_string());
        self.status.last_toggle_timestamp = Some(chrono::Local::now().to_rfc3339());
        self.refresh_active_games();
        write_status(&self.status_path, &self.status);
    }

    fn refresh_active_games(&mut self) {
        let mut games: Vec<String> = self.names.values().cloned().collect();
        games.sort();
        games.dedup();
        self.status.active_games = games;
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use crate::snapshot::tests::snapshot_of;
    use crate::snapshot::ProcessSnapshot;
    use anyhow::Result;
    use std::collections::VecDeque;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    type Row = (u32, &'static str, Option<&'static str>);

    const GAME_A: Row = (100, "game.exe", Some(r"C:\Games\A\game.exe"));
    const GAME_B: Row = (101, "other.exe", Some(r"C:\Games\B\other.exe"));
    const BYSTANDER: Row = (200, "explorer.exe", Some(r"C:\Windows\explorer.exe"));

    /// Replays a fixed sequence of snapshots (or failures), then flips the
    /// cancellation signal so the monitor winds down on its own.
    struct ScriptedQuery {
        script: VecDeque<Result<Vec<Row>, &'static str>>,
        done: watch::Sender<bool>,
    }

    impl ProcessQuery for ScriptedQuery {
        fn snapshot(&mut self) -> Result<ProcessSnapshot> {
            match self.script.pop_front() {
                Some(Ok(rows)) => Ok(snapshot_of(&rows)),
                Some(Err(msg)) => anyhow::bail!("{msg}"),
                None => {
                    let _ = self.done.send(true);
                    anyhow::bail!("script exhausted")
                }
            }
        }
    }

    fn rules() -> Vec<WatchRule> {
        vec![
            WatchRule {
                display_name: "Game A".to_string(),
                executable_name: "game.exe".to_string(),
                folder: r"C:\Games\A".to_string(),
            },
            WatchRule {
                display_name: "Game B".to_string(),
                executable_name: "other.exe".to_string(),
                folder: r"C:\Games\B".to_string(),
            },
        ]
    }

    /// Shell stand-in for the HDR controller that appends its argument to a
    /// log file, so tests can assert on the exact dispatch sequence.
    fn recording_toggle(dir: &Path) -> (ToggleController, PathBuf) {
        let log = dir.join("calls.log");
        let exe = dir.join("hdr_controller");
        std::fs::write(&exe, format!("#!/bin/sh\necho \"$1\" >> {}\n", log.display())).unwrap();
        let mut perms = std::fs::metadata(&exe).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&exe, perms).unwrap();
        (ToggleController::new(exe).unwrap(), log)
    }

    fn dispatches(log: &Path) -> Vec<String> {
        std::fs::read_to_string(log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Runs a full monitor over `script` and returns the dispatch log.
    async fn run_script(script: Vec<Result<Vec<Row>, &'static str>>) -> Vec<String> {
        let dir = tempfile::tempdir().unwrap();
        let (toggle, log) = recording_toggle(dir.path());
        let (tx, rx) = watch::channel(false);

        let query = ScriptedQuery {
            script: script.into(),
            done: tx,
        };
        let mut monitor = Monitor::new(query, rules(), toggle, dir.path().join("status.toml"));
        monitor.poll_interval = Duration::from_millis(1);
        monitor.retry_delay = Duration::from_millis(1);
        monitor.run(rx).await;

        dispatches(&log)
    }

    #[tokio::test]
    async fn game_lifecycle_dispatches_on_then_off() {
        let calls = run_script(vec![
            Ok(vec![BYSTANDER]),
            Ok(vec![GAME_A, BYSTANDER]),
            Ok(vec![GAME_A, BYSTANDER]),
            Ok(vec![BYSTANDER]),
        ])
        .await;
        assert_eq!(calls, vec!["on", "off"]);
    }

    #[tokio::test]
    async fn overlapping_games_toggle_once_in_each_direction() {
        let calls = run_script(vec![
            Ok(vec![GAME_A]),
            Ok(vec![GAME_A, GAME_B]),
            Ok(vec![GAME_B]),
            Ok(vec![BYSTANDER]),
        ])
        .await;
        assert_eq!(calls, vec!["on", "off"]);
    }

    #[tokio::test]
    async fn snapshot_failure_neither_dispatches_nor_forgets() {
        // The failing cycle sits between the game being present and its
        // exit; the failure itself must not produce an "off".
        let calls = run_script(vec![
            Ok(vec![GAME_A]),
            Err("enumeration failed"),
            Ok(vec![GAME_A]),
            Ok(vec![BYSTANDER]),
        ])
        .await;
        assert_eq!(calls, vec!["on", "off"]);
    }

    #[tokio::test]
    async fn no_watched_process_never_dispatches() {
        let calls = run_script(vec![Ok(vec![BYSTANDER]), Ok(vec![BYSTANDER])]).await;
        assert!(calls.is_empty());
    }

    #[tokio::test]
    async fn cancellation_before_first_cycle_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (toggle, log) = recording_toggle(dir.path());
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let query = ScriptedQuery {
            script: VecDeque::from([Ok(vec![GAME_A])]),
            done: tx,
        };
        let monitor = Monitor::new(query, rules(), toggle, dir.path().join("status.toml"));
        monitor.run(rx).await;

        assert!(dispatches(&log).is_empty());
    }

    #[tokio::test]
    async fn status_file_reflects_active_game() {
        let dir = tempfile::tempdir().unwrap();
        let (toggle, _log) = recording_toggle(dir.path());
        let (tx, rx) = watch::channel(false);
        let status_path = dir.path().join("status.toml");

        let query = ScriptedQuery {
            script: VecDeque::from([Ok(vec![GAME_A])]),
            done: tx,
        };
        let mut monitor = Monitor::new(query, rules(), toggle, status_path.clone());
        monitor.poll_interval = Duration::from_millis(1);
        monitor.retry_delay = Duration::from_millis(1);
        monitor.run(rx).await;

        let status: DaemonStatus =
            toml::from_str(&std::fs::read_to_string(&status_path).unwrap()).unwrap();
        assert_eq!(status.state, DaemonState::Active);
        assert_eq!(status.active_games, vec!["Game A".to_string()]);
        assert_eq!(status.last_toggle.as_deref(), Some("on"));
        assert!(status.last_toggle_timestamp.is_some());
    }
}
