//! Thin host-facing facade over [`portunix_supervisor::Supervisor`].
//!
//! Nothing in here adds logic of its own: every method is a direct
//! delegation to the supervisor, or a small composition of two of its
//! calls (`get_capabilities`). The point of this crate is to give an
//! embedding host (a CLI, a desktop shell, a service manager) a narrow,
//! stable surface instead of a direct dependency on the supervisor's
//! full API.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use portunix_protocol::{ExecuteResponse, PluginInfo};
use portunix_registry::Record;
use portunix_supervisor::{Supervisor, SupervisorError};

/// A plugin's command surface plus the capability tags it negotiated at
/// `Initialize` time, bundled for callers that just want "what can this
/// plugin do" without juggling two separate RPC calls.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PluginCapabilities {
    pub commands: Vec<portunix_manifest::CommandSpec>,
    pub capabilities: Vec<String>,
}

pub struct Host {
    supervisor: Arc<Supervisor>,
}

impl Host {
    pub fn new(supervisor: Arc<Supervisor>) -> Self {
        Host { supervisor }
    }

    pub async fn install(&self, manifest_path: impl AsRef<Path>) -> Result<(), SupervisorError> {
        self.supervisor.install(manifest_path).await
    }

    pub async fn uninstall(&self, name: &str) -> Result<(), SupervisorError> {
        self.supervisor.uninstall(name).await
    }

    pub async fn enable(&self, name: &str) -> Result<(), SupervisorError> {
        self.supervisor.enable(name).await
    }

    pub async fn disable(&self, name: &str) -> Result<(), SupervisorError> {
        self.supervisor.disable(name).await
    }

    pub async fn start(&self, name: &str) -> Result<(), SupervisorError> {
        self.supervisor.start(name).await
    }

    pub async fn stop(&self, name: &str) -> Result<(), SupervisorError> {
        self.supervisor.stop(name).await
    }

    pub async fn execute(
        &self,
        name: &str,
        command: &str,
        args: Vec<String>,
        options: HashMap<String, String>,
    ) -> Result<ExecuteResponse, SupervisorError> {
        self.supervisor.execute(name, command, args, options).await
    }

    /// The full installed-plugin catalog, active or not.
    pub async fn list(&self) -> Vec<Record> {
        self.supervisor.list().await
    }

    pub async fn get(&self, name: &str) -> Result<Record, SupervisorError> {
        self.supervisor.get(name).await
    }

    pub async fn info(&self, name: &str) -> Result<PluginInfo, SupervisorError> {
        self.supervisor.plugin_info(name).await
    }

    pub async fn health(&self, name: &str) -> Result<portunix_plugin_client::HealthReport, SupervisorError> {
        self.supervisor.health(name).await
    }

    /// A plugin's advertised commands.
    pub async fn list_commands(&self, name: &str) -> Result<Vec<portunix_manifest::CommandSpec>, SupervisorError> {
        Ok(self.supervisor.list_commands(name).await?.commands)
    }

    /// Commands plus negotiated capability tags, combined from `Initialize`
    /// and `ListCommands` into one value for callers that want both.
    pub async fn get_capabilities(&self, name: &str) -> Result<PluginCapabilities, SupervisorError> {
        let info = self.supervisor.plugin_info(name).await?;
        let commands = self.supervisor.list_commands(name).await?.commands;
        Ok(PluginCapabilities {
            commands,
            capabilities: info.capabilities,
        })
    }

    pub async fn shutdown(&self) {
        self.supervisor.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portunix_supervisor::SupervisorConfig;
    use std::time::Duration;

    #[tokio::test]
    async fn get_unknown_plugin_surfaces_not_found() {
        let workdir = tempfile::tempdir().unwrap();
        let mut config = SupervisorConfig::new(
            workdir.path().join("plugins"),
            workdir.path().join("registry.json"),
        );
        config.health_interval = Duration::from_secs(0);
        let supervisor = Supervisor::new(config).await.unwrap();
        let host = Host::new(supervisor);

        let err = host.get("ghost").await.unwrap_err();
        assert!(matches!(err, SupervisorError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_is_empty_for_fresh_registry() {
        let workdir = tempfile::tempdir().unwrap();
        let mut config = SupervisorConfig::new(
            workdir.path().join("plugins"),
            workdir.path().join("registry.json"),
        );
        config.health_interval = Duration::from_secs(0);
        let supervisor = Supervisor::new(config).await.unwrap();
        let host = Host::new(supervisor);

        assert!(host.list().await.is_empty());
    }
}
