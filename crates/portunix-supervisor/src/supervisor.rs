//! The supervisor: the one object through which all plugin lifecycle
//! operations flow. Owns the active-plugin map and the registry handle,
//! and runs a single background health-loop task.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use portunix_manifest::OsKind;
use portunix_plugin_client::PluginHandle;
use portunix_protocol::{ExecuteRequest, ExecuteResponse, PluginInfo};
use portunix_registry::{Record, Registry, Status};
use portunix_version::Version;

use crate::config::SupervisorConfig;
use crate::error::SupervisorError;
use crate::ports;

const MANIFEST_FILE_NAME: &str = "plugin.json";
const DEFAULT_EXECUTE_DEADLINE: Duration = Duration::from_secs(30);

/// The host's own version, used for the `dependencies.minHostVersion`
/// compatibility check at install time.
fn host_version() -> Version {
    Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or(Version {
        major: 0,
        minor: 1,
        patch: 0,
        pre: None,
        build: None,
    })
}

pub struct Supervisor {
    config: SupervisorConfig,
    registry: Registry,
    active: Mutex<HashMap<String, Arc<PluginHandle>>>,
    cancel: CancellationToken,
    health_task: Mutex<Option<JoinHandle<()>>>,
}

impl Supervisor {
    /// Load the registry and, if `config.health_interval` is nonzero,
    /// start the background health loop.
    pub async fn new(config: SupervisorConfig) -> Result<Arc<Supervisor>, SupervisorError> {
        let registry = Registry::load(&config.registry_file).await?;
        let supervisor = Arc::new(Supervisor {
            config,
            registry,
            active: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
            health_task: Mutex::new(None),
        });

        if !supervisor.config.health_interval.is_zero() {
            let task_supervisor = Arc::clone(&supervisor);
            let handle = tokio::spawn(async move { health_loop(task_supervisor).await });
            *supervisor.health_task.lock().await = Some(handle);
        }

        Ok(supervisor)
    }

    /// Load, validate, and re-check host/OS compatibility for the manifest
    /// at `manifest_path`, copy its containing directory into
    /// `pluginsDir/<name>`, and register it. On partial copy failure the
    /// partial destination is cleaned up before the error is returned.
    pub async fn install(&self, manifest_path: impl AsRef<Path>) -> Result<(), SupervisorError> {
        let manifest_path = manifest_path.as_ref();
        let manifest = portunix_manifest::load(manifest_path)?;

        if !host_version().compatible(&manifest.dependencies.min_host_version) {
            return Err(SupervisorError::IncompatibleVersion {
                required: manifest.dependencies.min_host_version.clone(),
                host: host_version(),
            });
        }
        let current_os = OsKind::current();
        if !manifest.dependencies.os_support.contains(&current_os) {
            return Err(SupervisorError::UnsupportedOs {
                current: current_os,
                supported: manifest.dependencies.os_support.clone(),
            });
        }

        let source_dir = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let dest_dir = self.config.plugins_dir.join(&manifest.name);

        if let Err(err) = copy_dir_recursive(&source_dir, &dest_dir).await {
            let _ = tokio::fs::remove_dir_all(&dest_dir).await;
            return Err(SupervisorError::Io(err));
        }

        match self.registry.register(&manifest, dest_dir.display().to_string()).await {
            Ok(()) => {
                info!(plugin = %manifest.name, "installed plugin");
                Ok(())
            }
            Err(portunix_registry::RegistryError::AlreadyExists(name)) => {
                let _ = tokio::fs::remove_dir_all(&dest_dir).await;
                Err(SupervisorError::AlreadyExists(name))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Stop an active handle if present, remove the plugin's directory,
    /// and unregister it. Failures while stopping propagate.
    pub async fn uninstall(&self, name: &str) -> Result<(), SupervisorError> {
        if let Some(handle) = self.take_active(name).await {
            handle.stop(&CancellationToken::new()).await?;
        }

        let install_path = self.registry.get_install_path(name).await?;
        self.registry.unregister(name).await?;
        tokio::fs::remove_dir_all(&install_path).await?;
        info!(plugin = %name, "uninstalled plugin");
        Ok(())
    }

    /// Build a handle from the registry record and an allocated port, but
    /// do not start it.
    pub async fn enable(&self, name: &str) -> Result<(), SupervisorError> {
        let mut active = self.active.lock().await;
        if active.contains_key(name) {
            return Err(SupervisorError::AlreadyExists(name.to_string()));
        }

        let record = self.registry.get(name).await?;
        let manifest = portunix_manifest::load(Path::new(&record.install_path).join(MANIFEST_FILE_NAME))?;

        let active_ports: BTreeSet<u16> = active.values().map(|h| h.config().port).collect();
        let port = ports::allocate(&active_ports, &self.config)
            .ok_or_else(|| SupervisorError::InvalidConfig("no port available in configured range".into()))?;

        let plugin_config = portunix_plugin_client::PluginConfig::from_manifest(
            &manifest,
            Path::new(&record.install_path),
            port,
            self.config.startup_deadline,
            self.config.shutdown_grace_period,
        );
        let handle = Arc::new(PluginHandle::initialize(plugin_config)?);
        active.insert(name.to_string(), handle);
        drop(active);

        self.registry.update_status(name, Status::Stopped).await?;
        debug!(plugin = %name, port, "enabled plugin");
        Ok(())
    }

    /// Stop (if running) and drop the active handle.
    pub async fn disable(&self, name: &str) -> Result<(), SupervisorError> {
        let handle = self
            .take_active(name)
            .await
            .ok_or_else(|| SupervisorError::NotFound(name.to_string()))?;
        if handle.is_running().await {
            handle.stop(&CancellationToken::new()).await?;
        }
        self.registry.update_status(name, Status::Stopped).await?;
        Ok(())
    }

    pub async fn start(&self, name: &str) -> Result<(), SupervisorError> {
        let handle = self.get_active(name).await?;
        self.registry.update_status(name, Status::Starting).await?;
        match handle.start(&CancellationToken::new()).await {
            Ok(()) => {
                self.registry.update_status(name, Status::Running).await?;
                Ok(())
            }
            Err(err) => {
                self.registry.update_status(name, Status::Failed).await?;
                Err(err.into())
            }
        }
    }

    pub async fn stop(&self, name: &str) -> Result<(), SupervisorError> {
        let handle = self.get_active(name).await?;
        if !handle.is_running().await {
            return Err(SupervisorError::NotRunning(name.to_string()));
        }
        self.registry.update_status(name, Status::Stopping).await?;
        match handle.stop(&CancellationToken::new()).await {
            Ok(()) => {
                self.registry.update_status(name, Status::Stopped).await?;
                Ok(())
            }
            Err(err) => {
                self.registry.update_status(name, Status::Failed).await?;
                Err(err.into())
            }
        }
    }

    pub async fn execute(
        &self,
        name: &str,
        command: &str,
        args: Vec<String>,
        options: HashMap<String, String>,
    ) -> Result<ExecuteResponse, SupervisorError> {
        let handle = self.get_active(name).await?;
        if !handle.is_running().await {
            return Err(SupervisorError::NotRunning(name.to_string()));
        }
        let request = ExecuteRequest {
            command: command.to_string(),
            args,
            options,
            environment: HashMap::new(),
            working_directory: String::new(),
        };
        Ok(handle
            .execute(request, DEFAULT_EXECUTE_DEADLINE, &CancellationToken::new())
            .await?)
    }

    /// Registry-backed catalog view: every installed plugin, active or not.
    pub async fn list(&self) -> Vec<Record> {
        self.registry.list().await
    }

    pub async fn get(&self, name: &str) -> Result<Record, SupervisorError> {
        Ok(self.registry.get(name).await?)
    }

    /// Live identity/capabilities of an active plugin. Only available
    /// while the plugin has been enabled (and typically started).
    pub async fn plugin_info(&self, name: &str) -> Result<PluginInfo, SupervisorError> {
        let handle = self.get_active(name).await?;
        Ok(handle
            .get_info(DEFAULT_EXECUTE_DEADLINE, &CancellationToken::new())
            .await?)
    }

    pub async fn health(&self, name: &str) -> Result<portunix_plugin_client::HealthReport, SupervisorError> {
        let handle = self.get_active(name).await?;
        Ok(handle
            .health(DEFAULT_EXECUTE_DEADLINE, &CancellationToken::new())
            .await?)
    }

    /// The plugin's advertised command surface, for `ptx plugin commands`
    /// and for the host API's `getCapabilities` convenience wrapper.
    pub async fn list_commands(&self, name: &str) -> Result<portunix_protocol::ListCommandsResponse, SupervisorError> {
        let handle = self.get_active(name).await?;
        Ok(handle
            .list_commands(DEFAULT_EXECUTE_DEADLINE, &CancellationToken::new())
            .await?)
    }

    /// Stop the health loop and every running plugin. Per-plugin stop
    /// failures are logged but never prevent shutdown from completing.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(task) = self.health_task.lock().await.take() {
            task.abort();
        }

        let handles: Vec<Arc<PluginHandle>> = self.active.lock().await.values().cloned().collect();
        for handle in handles {
            let name = handle.name().to_string();
            if let Err(err) = handle.stop(&CancellationToken::new()).await {
                warn!(plugin = %name, "error stopping plugin during shutdown: {err}");
            }
        }
        self.active.lock().await.clear();
        info!("supervisor shutdown complete");
    }

    async fn get_active(&self, name: &str) -> Result<Arc<PluginHandle>, SupervisorError> {
        self.active
            .lock()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| SupervisorError::NotFound(name.to_string()))
    }

    async fn take_active(&self, name: &str) -> Option<Arc<PluginHandle>> {
        self.active.lock().await.remove(name)
    }
}

async fn health_loop(supervisor: Arc<Supervisor>) {
    let mut interval = tokio::time::interval(supervisor.config.health_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = supervisor.cancel.cancelled() => {
                debug!("health loop stopping");
                return;
            }
            _ = interval.tick() => {
                health_tick(&supervisor).await;
            }
        }
    }
}

async fn health_tick(supervisor: &Supervisor) {
    let snapshot: Vec<(String, Arc<PluginHandle>)> = supervisor
        .active
        .lock()
        .await
        .iter()
        .map(|(name, handle)| (name.clone(), Arc::clone(handle)))
        .collect();

    for (name, handle) in snapshot {
        // A concurrent `stop` may have already moved the handle out of
        // `Running`; skip it rather than racing the transition.
        if !handle.is_running().await {
            continue;
        }
        let cancel = CancellationToken::new();
        match handle.health(DEFAULT_EXECUTE_DEADLINE, &cancel).await {
            Ok(report) if report.healthy => {}
            Ok(_) => {
                warn!(plugin = %name, "health check reported unhealthy");
                let _ = supervisor.registry.update_status(&name, Status::Failed).await;
            }
            Err(err) => {
                warn!(plugin = %name, "health check failed: {err}");
                let _ = supervisor.registry.update_status(&name, Status::Failed).await;
            }
        }
    }
}

/// Recursively copy `source` into `dest`. Used for install's plugin
/// payload copy; async fn + recursion needs boxing to keep a finite-size
/// future.
fn copy_dir_recursive<'a>(
    source: &'a Path,
    dest: &'a Path,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + 'a>> {
    Box::pin(async move {
        tokio::fs::create_dir_all(dest).await?;
        let mut entries = tokio::fs::read_dir(source).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            let target = dest.join(entry.file_name());
            if file_type.is_dir() {
                copy_dir_recursive(&entry.path(), &target).await?;
            } else {
                tokio::fs::copy(entry.path(), &target).await?;
            }
        }
        Ok(())
    })
}

