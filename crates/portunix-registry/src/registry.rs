//! Persistent plugin catalog.
//!
//! The on-disk file is rewritten atomically: a temp sibling is written,
//! fsynced, then renamed over the target. All mutations take the writer
//! half of the lock; reads (including the brief flush during a mutation)
//! take the reader half, so status reads never block on each other.

use std::path::{Path, PathBuf};

use portunix_manifest::Manifest;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::RegistryError;
use crate::model::{Record, RegistryFile, Status};

pub struct Registry {
    path: PathBuf,
    state: RwLock<RegistryFile>,
}

impl Registry {
    /// Load the registry from `path`. A missing file yields an empty
    /// registry; a present-but-unparseable file is reported as
    /// [`RegistryError::CorruptRegistry`] rather than silently discarded.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| {
                RegistryError::CorruptRegistry {
                    path: path.display().to_string(),
                    reason: source.to_string(),
                }
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => RegistryFile::default(),
            Err(source) => {
                return Err(RegistryError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        Ok(Registry {
            path,
            state: RwLock::new(state),
        })
    }

    /// Register a newly installed plugin. Fails with
    /// [`RegistryError::AlreadyExists`] if the name is already present.
    pub async fn register(
        &self,
        manifest: &Manifest,
        install_path: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.write().await;
        if state.plugins.contains_key(&manifest.name) {
            return Err(RegistryError::AlreadyExists(manifest.name.clone()));
        }

        let record = Record {
            name: manifest.name.clone(),
            version: manifest.version.clone(),
            install_path: install_path.into(),
            binary_name: manifest.binary.clone(),
            required_permissions: required_permissions(manifest),
            status: Status::Stopped,
            last_seen: chrono::Utc::now(),
        };
        state.plugins.insert(manifest.name.clone(), record);
        self.persist_locked(&state).await?;
        info!(plugin = %manifest.name, "registered plugin");
        Ok(())
    }

    /// Remove a plugin's catalog entry. Fails with
    /// [`RegistryError::NotFound`] if absent.
    pub async fn unregister(&self, name: &str) -> Result<(), RegistryError> {
        let mut state = self.state.write().await;
        if state.plugins.remove(name).is_none() {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        self.persist_locked(&state).await?;
        info!(plugin = %name, "unregistered plugin");
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Result<Record, RegistryError> {
        let state = self.state.read().await;
        state
            .plugins
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub async fn get_install_path(&self, name: &str) -> Result<String, RegistryError> {
        Ok(self.get(name).await?.install_path)
    }

    /// All registered plugins, in deterministic (name-sorted) order.
    pub async fn list(&self) -> Vec<Record> {
        let state = self.state.read().await;
        state.plugins.values().cloned().collect()
    }

    /// Persist a new status for `name`, bumping `lastSeen`. Fails with
    /// [`RegistryError::NotFound`] if absent.
    pub async fn update_status(&self, name: &str, status: Status) -> Result<(), RegistryError> {
        let mut state = self.state.write().await;
        let record = state
            .plugins
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        record.status = status;
        record.last_seen = chrono::Utc::now();
        self.persist_locked(&state).await?;
        debug!(plugin = %name, %status, "updated plugin status");
        Ok(())
    }

    async fn persist_locked(&self, state: &RegistryFile) -> Result<(), RegistryError> {
        let json = serde_json::to_string_pretty(state).expect("RegistryFile always serializes");
        write_atomic(&self.path, json.as_bytes())
            .await
            .map_err(|source| RegistryError::Io {
                path: self.path.display().to_string(),
                source,
            })
    }
}

/// Write `bytes` to `path` atomically: write a temp sibling, fsync, rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let path = path.to_path_buf();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let tmp_path = dir.join(format!(
            ".{}.tmp-{}",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("registry"),
            std::process::id()
        ));

        {
            let file = std::fs::File::create(&tmp_path)?;
            use std::io::Write;
            let mut file = file;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }

        match std::fs::rename(&tmp_path, &path) {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = std::fs::remove_file(&tmp_path);
                Err(err)
            }
        }
    })
    .await
    .unwrap_or_else(|join_err| {
        warn!("registry write task panicked: {join_err}");
        Err(std::io::Error::other("registry write task panicked"))
    })
}

fn required_permissions(manifest: &Manifest) -> Vec<String> {
    let p = &manifest.permissions;
    p.filesystem
        .iter()
        .chain(p.network.iter())
        .chain(p.database.iter())
        .chain(p.system.iter())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use portunix_manifest::{Dependencies, OsKind, PluginType};
    use portunix_version::Version;

    fn manifest(name: &str) -> Manifest {
        Manifest {
            name: name.to_string(),
            version: Version::parse("1.0.0").unwrap(),
            description: "d".into(),
            author: "a".into(),
            license: "MIT".into(),
            binary: "./bin".into(),
            plugin_type: PluginType::Executable,
            runtime: Default::default(),
            port: None,
            health_check_interval: std::time::Duration::from_secs(30),
            dependencies: Dependencies {
                min_host_version: Version::parse("0.1.0").unwrap(),
                os_support: vec![OsKind::Linux],
            },
            permissions: Default::default(),
            commands: vec![],
            ai_integration: None,
        }
    }

    #[tokio::test]
    async fn missing_file_yields_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::load(dir.path().join("registry.json")).await.unwrap();
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn register_then_get_then_unregister() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        let registry = Registry::load(&path).await.unwrap();

        registry.register(&manifest("demo"), "/plugins/demo").await.unwrap();
        let record = registry.get("demo").await.unwrap();
        assert_eq!(record.status, Status::Stopped);
        assert_eq!(record.install_path, "/plugins/demo");

        // Re-reading the file confirms the write was actually persisted.
        let reloaded = Registry::load(&path).await.unwrap();
        assert_eq!(reloaded.list().await.len(), 1);

        registry.unregister("demo").await.unwrap();
        assert!(matches!(
            registry.get("demo").await,
            Err(RegistryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_register_fails() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::load(dir.path().join("registry.json")).await.unwrap();
        registry.register(&manifest("demo"), "/plugins/demo").await.unwrap();
        let err = registry.register(&manifest("demo"), "/plugins/demo").await.unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn unregister_missing_fails() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::load(dir.path().join("registry.json")).await.unwrap();
        let err = registry.unregister("ghost").await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_status_bumps_last_seen() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::load(dir.path().join("registry.json")).await.unwrap();
        registry.register(&manifest("demo"), "/plugins/demo").await.unwrap();

        let before = registry.get("demo").await.unwrap().last_seen;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        registry.update_status("demo", Status::Running).await.unwrap();
        let after = registry.get("demo").await.unwrap();

        assert_eq!(after.status, Status::Running);
        assert!(after.last_seen >= before);
    }

    #[tokio::test]
    async fn corrupt_file_is_reported_not_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = Registry::load(&path).await.unwrap_err();
        assert!(matches!(err, RegistryError::CorruptRegistry { .. }));
    }

    #[tokio::test]
    async fn list_is_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::load(dir.path().join("registry.json")).await.unwrap();
        registry.register(&manifest("zeta"), "/plugins/zeta").await.unwrap();
        registry.register(&manifest("alpha"), "/plugins/alpha").await.unwrap();

        let names: Vec<_> = registry.list().await.iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["alpha".to_string(), "zeta".to_string()]);
    }
}
