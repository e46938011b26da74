//! Manifest data model.

use std::collections::HashMap;
use std::time::Duration;

use portunix_version::Version;
use serde::{Deserialize, Serialize};

pub(crate) fn default_health_check_interval() -> Duration {
    Duration::from_secs(30)
}

/// A plugin's declarative identity, loaded from a manifest file alongside
/// its binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Manifest {
    pub name: String,
    pub version: Version,
    pub description: String,
    pub author: String,
    pub license: String,
    pub binary: String,
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
    #[serde(default)]
    pub runtime: Runtime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(
        default = "default_health_check_interval",
        with = "duration_as_nanos"
    )]
    pub health_check_interval: Duration,
    pub dependencies: Dependencies,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_integration: Option<AiIntegration>,
}

/// Deserializes permissively: any string that isn't one of the known
/// variants lands in `Unknown` rather than failing the whole manifest
/// parse, so [`crate::validate::validate`] can reject it with a
/// field-qualified [`crate::error::ManifestError::Validation`] instead of
/// the caller seeing a generic serde error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    Grpc,
    Helper,
    Executable,
    #[serde(other)]
    Unknown,
}

impl PluginType {
    pub fn allowed_values() -> &'static [&'static str] {
        &["grpc", "helper", "executable"]
    }
}

/// See [`PluginType`]'s doc comment: `Unknown` absorbs any unrecognized
/// string at parse time so validation, not serde, rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    #[default]
    Native,
    Java,
    Python,
    #[serde(other)]
    Unknown,
}

impl Runtime {
    pub fn allowed_values() -> &'static [&'static str] {
        &["native", "java", "python"]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsKind {
    Linux,
    Windows,
    Darwin,
}

impl OsKind {
    pub fn allowed_values() -> &'static [&'static str] {
        &["linux", "windows", "darwin"]
    }

    /// The `OsKind` of the host this binary was compiled for.
    pub fn current() -> OsKind {
        if cfg!(target_os = "windows") {
            OsKind::Windows
        } else if cfg!(target_os = "macos") {
            OsKind::Darwin
        } else {
            OsKind::Linux
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Dependencies {
    pub min_host_version: Version,
    pub os_support: Vec<OsKind>,
}

/// See [`PluginType`]'s doc comment: `Unknown` absorbs any unrecognized
/// string at parse time so validation, not serde, rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    #[default]
    Limited,
    Standard,
    Full,
    #[serde(other)]
    Unknown,
}

impl PermissionLevel {
    pub fn allowed_values() -> &'static [&'static str] {
        &["limited", "standard", "full"]
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Permissions {
    #[serde(default)]
    pub filesystem: Vec<String>,
    #[serde(default)]
    pub network: Vec<String>,
    #[serde(default)]
    pub database: Vec<String>,
    #[serde(default)]
    pub system: Vec<String>,
    #[serde(default)]
    pub level: PermissionLevel,
}

/// See [`PluginType`]'s doc comment: `Unknown` absorbs any unrecognized
/// string at parse time so validation, not serde, rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Int,
    Bool,
    Array,
    #[serde(other)]
    Unknown,
}

impl ParameterType {
    pub fn allowed_values() -> &'static [&'static str] {
        &["string", "int", "bool", "array"]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub parameter_type: ParameterType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CommandSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subcommands: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default)]
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct AiIntegration {
    #[serde(default)]
    pub mcp_tools: Vec<McpTool>,
}

/// Arbitrary string-keyed environment/config maps used when resolving a
/// runtime [`crate::Manifest`] into a plugin config. Kept here so
/// downstream crates share one alias.
pub type StringMap = HashMap<String, String>;

mod duration_as_nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_nanos() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}
