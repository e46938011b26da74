//! The handle-local lifecycle state machine.

/// A plugin handle's in-memory lifecycle state. Distinct from
/// `portunix_registry::Status`, which is the persisted view the
/// supervisor writes after observing a transition here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

impl State {
    /// `true` for any state reachable only by a successful `start`.
    pub fn is_running(self) -> bool {
        matches!(self, State::Running)
    }
}
