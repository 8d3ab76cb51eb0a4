use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// One process row from a snapshot.
#[derive(Debug, Clone)]
pub struct ProcessInfo {
    /// Executable filename as reported by the OS (e.g. "game.exe").
    pub name: String,
    /// Full path to the executable. `None` for processes whose path the OS
    /// refuses to expose (typically privileged system processes); such
    /// processes are never matched against the watch-list.
    pub exe: Option<PathBuf>,
}

/// One atomic read of the process table: pid → {name, path}.
///
/// Produced fresh every poll cycle and never mutated; each snapshot fully
/// supersedes the previous one.
#[derive(Debug, Default)]
pub struct ProcessSnapshot {
    processes: HashMap<Pid, ProcessInfo>,
}

impl ProcessSnapshot {
    pub fn new(processes: HashMap<Pid, ProcessInfo>) -> Self {
        Self { processes }
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.processes.contains_key(&pid)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pid, &ProcessInfo)> {
        self.processes.iter().map(|(pid, info)| (*pid, info))
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

/// The process-enumeration boundary.
///
/// The poll loop only ever sees this trait, so tests can feed it scripted
/// snapshots and transient failures without touching the real process table.
pub trait ProcessQuery {
    /// Returns a complete snapshot of the current process table, or an error
    /// for this cycle. Any error means "skip the cycle"; the caller retries
    /// on the next one.
    fn snapshot(&mut self) -> Result<ProcessSnapshot>;
}

/// Production [`ProcessQuery`] backed by sysinfo's process table.
pub struct SystemQuery {
    sys: System,
}

impl SystemQuery {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl ProcessQuery for SystemQuery {
    fn snapshot(&mut self) -> Result<ProcessSnapshot> {
        // The second argument removes processes that died since the previous
        // refresh; exits are detected by absence, so stale entries must go.
        self.sys.refresh_processes(ProcessesToUpdate::All, true);

        let processes: HashMap<Pid, ProcessInfo> = self
            .sys
            .processes()
            .iter()
            .map(|(pid, p)| {
                (
                    *pid,
                    ProcessInfo {
                        name: p.name().to_string_lossy().into_owned(),
                        exe: p.exe().map(Path::to_path_buf),
                    },
                )
            })
            .collect();

        // A real process table always contains at least this daemon. An empty
        // result is a failed enumeration, and treating it as truth would
        // expire every tracked process at once.
        if processes.is_empty() {
            anyhow::bail!("Process enumeration returned an empty table");
        }

        Ok(ProcessSnapshot::new(processes))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a snapshot from (pid, name, exe path) rows. Shared by the
    /// matcher, tracker, and monitor tests.
    pub(crate) fn snapshot_of(entries: &[(u32, &str, Option<&str>)]) -> ProcessSnapshot {
        let processes = entries
            .iter()
            .map(|(pid, name, exe)| {
                (
                    Pid::from_u32(*pid),
                    ProcessInfo {
                        name: name.to_string(),
                        exe: exe.map(PathBuf::from),
                    },
                )
            })
            .collect();
        ProcessSnapshot::new(processes)
    }

    #[test]
    fn contains_and_len_reflect_entries() {
        let snap = snapshot_of(&[
            (100, "game.exe", Some(r"C:\Games\game.exe")),
            (4, "System", None),
        ]);
        assert_eq!(snap.len(), 2);
        assert!(snap.contains(Pid::from_u32(100)));
        assert!(snap.contains(Pid::from_u32(4)));
        assert!(!snap.contains(Pid::from_u32(101)));
    }

    #[test]
    fn system_query_sees_a_nonempty_table() {
        // The test process itself is running, so a live enumeration can
        // never legitimately come back empty.
        let mut query = SystemQuery::new();
        let snap = query.snapshot().unwrap();
        assert!(!snap.is_empty());
    }
}
