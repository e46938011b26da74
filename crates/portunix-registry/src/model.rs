//! Registry record and status types.

use chrono::{DateTime, Utc};
use portunix_version::Version;
use serde::{Deserialize, Serialize};

/// Runtime lifecycle status of a registered plugin, as last observed by the
/// supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Unknown,
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

impl Status {
    /// Canonical string form, matching the serde rename used on disk.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unknown => "unknown",
            Status::Stopped => "stopped",
            Status::Starting => "starting",
            Status::Running => "running",
            Status::Stopping => "stopping",
            Status::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Unknown
    }
}

/// Per-installed-plugin catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub name: String,
    pub version: Version,
    pub install_path: String,
    pub binary_name: String,
    #[serde(default)]
    pub required_permissions: Vec<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default = "Utc::now")]
    pub last_seen: DateTime<Utc>,
}

/// On-disk shape of the registry file: `{"plugins": {<name>: Record}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryFile {
    #[serde(default)]
    pub plugins: std::collections::BTreeMap<String, Record>,
}
