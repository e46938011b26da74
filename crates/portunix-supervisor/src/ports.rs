//! Port allocation: a pure function of the current active-plugin port set.
//! Must be called under the same lock that guards the active-plugin map
//! (see `supervisor.rs`), so allocation is race-free within one
//! supervisor instance. External conflicts (another OS process already
//! bound the port) are not detected here; they surface at `start` time as
//! `StartFailed`.

use std::collections::BTreeSet;

use crate::config::{PortRange, SupervisorConfig};

/// Pick the lowest free port starting from `default_port` (or
/// `range.start` when `default_port` is zero), wrapping once around the
/// range. Returns `None` when every port in the range is already held by
/// `active_ports`.
pub fn allocate(active_ports: &BTreeSet<u16>, config: &SupervisorConfig) -> Option<u16> {
    let range = config.port_range;
    let start = if config.default_port != 0 {
        config.default_port.clamp(range.start, range.end)
    } else {
        range.start
    };

    candidates(range, start).find(|port| !active_ports.contains(port))
}

fn candidates(range: PortRange, start: u16) -> impl Iterator<Item = u16> {
    (start..=range.end).chain(range.start..start)
}
