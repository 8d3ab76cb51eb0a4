use std::collections::HashSet;

use sysinfo::Pid;

use crate::snapshot::ProcessSnapshot;

/// Transition of the watched set between empty and non-empty, the only two
/// occasions on which the HDR toggle is ever invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// The first watched process appeared.
    On,
    /// The last watched process disappeared.
    Off,
}

impl Edge {
    /// The literal command argument this edge translates to.
    pub fn as_arg(self) -> &'static str {
        match self {
            Edge::On => "on",
            Edge::Off => "off",
        }
    }
}

/// What one poll cycle changed, as computed by [`ActiveSet::observe`].
#[derive(Debug)]
pub struct CycleDelta {
    /// Pids newly recognized as watched this cycle, ascending.
    pub entered: Vec<Pid>,
    /// Previously watched pids that vanished from the process table, ascending.
    pub exited: Vec<Pid>,
    /// Set iff the watched set crossed the empty/non-empty boundary.
    pub edge: Option<Edge>,
}

impl CycleDelta {
    pub fn is_quiet(&self) -> bool {
        self.entered.is_empty() && self.exited.is_empty()
    }
}

/// The set of pids currently recognized as "a watched process is running
/// under this id", diffed against each new poll cycle.
///
/// Membership rules:
///   - a pid enters the moment a snapshot shows it matching a watch rule;
///   - a pid leaves only when a snapshot no longer contains it at all.
///
/// The asymmetry is deliberate. A live process cannot silently stop matching
/// its rule, so "enumerated but unmatched" is a query hiccup, not an exit;
/// acting on it would flap HDR off and back on under a still-running game.
#[derive(Debug, Default)]
pub struct ActiveSet {
    active: HashSet<Pid>,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.active.contains(&pid)
    }

    /// Folds one cycle's observations into the set and reports the delta.
    ///
    /// `matched` is the set of pids the matcher recognized in this cycle's
    /// snapshot; `snapshot` is the full snapshot the match came from. Both
    /// must describe the same cycle, otherwise entries and exits computed
    /// here would disagree about which processes exist.
    pub fn observe(&mut self, matched: &HashSet<Pid>, snapshot: &ProcessSnapshot) -> CycleDelta {
        let was_empty = self.active.is_empty();

        let mut entered: Vec<Pid> = matched
            .iter()
            .filter(|pid| !self.active.contains(*pid))
            .copied()
            .collect();
        entered.sort_unstable();
        self.active.extend(&entered);

        let mut exited: Vec<Pid> = self
            .active
            .iter()
            .filter(|pid| !snapshot.contains(**pid))
            .copied()
            .collect();
        exited.sort_unstable();
        for pid in &exited {
            self.active.remove(pid);
        }

        let edge = match (was_empty, self.active.is_empty()) {
            (true, false) => Some(Edge::On),
            (false, true) => Some(Edge::Off),
            _ => None,
        };

        CycleDelta {
            entered,
            exited,
            edge,
        }
    }
}
