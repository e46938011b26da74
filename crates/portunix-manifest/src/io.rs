//! Manifest load/save/scaffold operations.

use std::path::Path;

use portunix_version::Version;

use crate::error::ManifestError;
use crate::model::{Dependencies, Manifest, OsKind, PluginType};
use crate::validate;

/// Read a manifest file, apply defaults, and validate it.
pub fn load(path: impl AsRef<Path>) -> Result<Manifest, ManifestError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ManifestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let manifest: Manifest = serde_json::from_slice(&bytes).map_err(|source| ManifestError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    validate::validate(&manifest)?;
    Ok(manifest)
}

/// Serialize a manifest as deterministic, pretty-printed JSON.
pub fn save(manifest: &Manifest, path: impl AsRef<Path>) -> Result<(), ManifestError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(manifest).map_err(|source| ManifestError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| ManifestError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Produce a template manifest suitable for scaffolding a new plugin.
pub fn default(name: &str, description: &str, author: &str) -> Manifest {
    Manifest {
        name: name.to_string(),
        version: Version::parse("0.1.0").expect("0.1.0 is a valid version literal"),
        description: description.to_string(),
        author: author.to_string(),
        license: "MIT".to_string(),
        binary: format!("./{name}"),
        plugin_type: PluginType::Executable,
        runtime: Default::default(),
        port: None,
        health_check_interval: crate::model::default_health_check_interval(),
        dependencies: Dependencies {
            min_host_version: Version::parse("0.1.0").expect("0.1.0 is a valid version literal"),
            os_support: vec![OsKind::Linux, OsKind::Windows, OsKind::Darwin],
        },
        permissions: Default::default(),
        commands: vec![],
        ai_integration: None,
    }
}
