//! `portunix.toml` configuration loading, with a small whitelist of
//! environment variable overrides layered on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use portunix_supervisor::{PortRange, SupervisorConfig};

fn default_plugins_dir() -> PathBuf {
    PathBuf::from("plugins")
}

fn default_registry_file() -> PathBuf {
    PathBuf::from("registry.json")
}

fn default_port_start() -> u16 {
    9000
}

fn default_port_end() -> u16 {
    9999
}

fn default_health_interval_secs() -> u64 {
    30
}

fn default_startup_deadline_secs() -> u64 {
    30
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

/// Raw `[supervisor]` table as it appears in `portunix.toml`. Every field
/// has a default so an empty or missing config file is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct SupervisorSection {
    plugins_dir: PathBuf,
    registry_file: PathBuf,
    port_range_start: u16,
    port_range_end: u16,
    health_interval_secs: u64,
    startup_deadline_secs: u64,
    shutdown_grace_secs: u64,
}

impl Default for SupervisorSection {
    fn default() -> Self {
        SupervisorSection {
            plugins_dir: default_plugins_dir(),
            registry_file: default_registry_file(),
            port_range_start: default_port_start(),
            port_range_end: default_port_end(),
            health_interval_secs: default_health_interval_secs(),
            startup_deadline_secs: default_startup_deadline_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    supervisor: SupervisorSection,
}

/// Fully resolved CLI configuration: `portunix.toml` merged with
/// environment overrides, ready to build a `SupervisorConfig` from.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub plugins_dir: PathBuf,
    pub registry_file: PathBuf,
    pub port_range: PortRange,
    pub health_interval: Duration,
    pub startup_deadline: Duration,
    pub shutdown_grace_period: Duration,
}

impl CliConfig {
    /// Load `path` (or, if `None`, `./portunix.toml` if it exists), then
    /// apply the `PORTUNIX_*` environment overrides. A missing config file
    /// is not an error: the defaults apply.
    pub fn load(path: Option<PathBuf>) -> Result<CliConfig> {
        let path = path.unwrap_or_else(|| PathBuf::from("portunix.toml"));
        let raw = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))?
        } else {
            RawConfig::default()
        };

        let mut config = CliConfig {
            plugins_dir: raw.supervisor.plugins_dir,
            registry_file: raw.supervisor.registry_file,
            port_range: PortRange::new(raw.supervisor.port_range_start, raw.supervisor.port_range_end),
            health_interval: Duration::from_secs(raw.supervisor.health_interval_secs),
            startup_deadline: Duration::from_secs(raw.supervisor.startup_deadline_secs),
            shutdown_grace_period: Duration::from_secs(raw.supervisor.shutdown_grace_secs),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Only these variables are honored; anything else in the process
    /// environment is ignored, the same way `daemon_manager` only forwards
    /// a fixed allowlist to a spawned child.
    fn apply_env_overrides(&mut self) {
        if let Some(value) = std::env::var_os("PORTUNIX_PLUGINS_DIR") {
            self.plugins_dir = PathBuf::from(value);
        }
        if let Some(value) = std::env::var_os("PORTUNIX_REGISTRY_FILE") {
            self.registry_file = PathBuf::from(value);
        }
        if let Ok(value) = std::env::var("PORTUNIX_PORT_RANGE_START") {
            if let Ok(port) = value.parse() {
                self.port_range.start = port;
            }
        }
        if let Ok(value) = std::env::var("PORTUNIX_PORT_RANGE_END") {
            if let Ok(port) = value.parse() {
                self.port_range.end = port;
            }
        }
        if let Ok(value) = std::env::var("PORTUNIX_HEALTH_INTERVAL_SECS") {
            if let Ok(secs) = value.parse() {
                self.health_interval = Duration::from_secs(secs);
            }
        }
    }

    pub fn to_supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            plugins_dir: self.plugins_dir.clone(),
            registry_file: self.registry_file.clone(),
            health_interval: self.health_interval,
            default_port: self.port_range.start,
            port_range: self.port_range,
            startup_deadline: self.startup_deadline,
            shutdown_grace_period: self.shutdown_grace_period,
        }
    }

    pub fn default_path() -> PathBuf {
        Path::new("portunix.toml").to_path_buf()
    }
}
