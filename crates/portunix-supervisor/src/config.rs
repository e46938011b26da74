//! Supervisor construction parameters.

use std::path::PathBuf;
use std::time::Duration;

/// Inclusive port range the allocator draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> Self {
        PortRange { start, end }
    }
}

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub plugins_dir: PathBuf,
    pub registry_file: PathBuf,
    /// `0` disables the background health loop entirely.
    pub health_interval: Duration,
    /// `0` means "start allocation at `port_range.start`".
    pub default_port: u16,
    pub port_range: PortRange,
    pub startup_deadline: Duration,
    pub shutdown_grace_period: Duration,
}

impl SupervisorConfig {
    pub fn new(plugins_dir: impl Into<PathBuf>, registry_file: impl Into<PathBuf>) -> Self {
        SupervisorConfig {
            plugins_dir: plugins_dir.into(),
            registry_file: registry_file.into(),
            health_interval: Duration::from_secs(30),
            default_port: 0,
            port_range: PortRange::new(9000, 9999),
            startup_deadline: Duration::from_secs(30),
            shutdown_grace_period: Duration::from_secs(10),
        }
    }
}
