use std::fmt;

/// Dev loop controller state.
///
/// ```text
/// Idle ─→ Building ─┬─ ok ──→ Running ─ change ─→ Restarting ─→ Idle
///                   └─ err ─→ Idle (watcher armed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevState {
    Idle,
    Building,
    Running,
    Restarting,
}

impl fmt::Display for DevState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DevState::Idle => "idle",
            DevState::Building => "building",
            DevState::Running => "running",
            DevState::Restarting => "restarting",
        };
        f.write_str(name)
    }
}
