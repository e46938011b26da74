//! Resolved runtime parameters for one plugin instance, derived from a
//! registry record plus an allocated port. Distinct from `Manifest`,
//! which is the plugin's static on-disk declaration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use portunix_manifest::{Manifest, PluginType};

#[derive(Debug, Clone)]
pub struct PluginConfig {
    pub name: String,
    pub version: String,
    pub plugin_type: PluginType,
    pub binary_path: PathBuf,
    pub port: u16,
    pub working_dir: PathBuf,
    pub environment: HashMap<String, String>,
    pub permissions: Vec<String>,
    pub health_interval: Duration,
    pub startup_deadline: Duration,
    pub shutdown_grace_period: Duration,
}

impl PluginConfig {
    pub fn from_manifest(
        manifest: &Manifest,
        install_dir: &std::path::Path,
        port: u16,
        startup_deadline: Duration,
        shutdown_grace_period: Duration,
    ) -> Self {
        let permissions = [
            &manifest.permissions.filesystem,
            &manifest.permissions.network,
            &manifest.permissions.database,
            &manifest.permissions.system,
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect();

        PluginConfig {
            name: manifest.name.clone(),
            version: manifest.version.to_string(),
            plugin_type: manifest.plugin_type,
            binary_path: install_dir.join(&manifest.binary),
            port,
            working_dir: install_dir.to_path_buf(),
            environment: HashMap::new(),
            permissions,
            health_interval: manifest.health_check_interval,
            startup_deadline,
            shutdown_grace_period,
        }
    }
}
