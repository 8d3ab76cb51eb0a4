use std::collections::HashMap;

use sysinfo::Pid;

use crate::config::WatchRule;
use crate::snapshot::ProcessSnapshot;

/// Returns every process in `snapshot` that the watch-list recognizes,
/// keyed by pid with the rule that claimed it.
///
/// A process is claimed by the first rule (in config order) whose executable
/// name equals the process name and whose folder substring appears in the
/// executable path, both case-insensitively. Processes without a resolvable
/// path are skipped.
pub fn watched<'r>(
    snapshot: &ProcessSnapshot,
    rules: &'r [WatchRule],
) -> HashMap<Pid, &'r WatchRule> {
    let mut matched = HashMap::new();
    for (pid, info) in snapshot.iter() {
        let Some(exe) = info.exe.as_deref() else {
            continue;
        };
        if let Some(rule) = rules.iter().find(|r| r.matches(&info.name, exe)) {
            matched.insert(pid, rule);
        }
    }
    matched
}
