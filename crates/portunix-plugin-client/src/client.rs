//! The plugin handle: the in-memory object that owns exactly one plugin's
//! child process and RPC channel, and drives its lifecycle state machine.
//!
//! ```text
//! Stopped ──start──▶ Starting ──(Initialize ok)──▶ Running
//!   ▲                   │                              │
//!   │                   └──(failure)──▶ Failed         │
//!   │                                                  │
//!   └──── Stopping ◀──── stop ◀─────────────────────────
//! ```
//! Transitions out of `Failed` only happen via supervisor-driven re-enable,
//! which drops this handle and builds a fresh one — there is no `restart`
//! method here.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use portunix_manifest::PluginType;
use portunix_protocol::{ExecuteRequest, ExecuteResponse, InitializeRequest, PluginInfo, ShutdownRequest};
use portunix_rpc::PluginRpcClient;

use crate::config::PluginConfig;
use crate::error::ClientError;
use crate::state::State;

/// Snapshot of a plugin's self-reported liveness, as returned by [`PluginHandle::health`].
pub type HealthReport = portunix_protocol::HealthResponse;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Owns one plugin's process and RPC channel. Never shared across
/// plugins; the supervisor holds one handle per active plugin.
pub struct PluginHandle {
    config: PluginConfig,
    state: Mutex<State>,
    process: Mutex<Option<Child>>,
    rpc: Mutex<Option<PluginRpcClient>>,
    start_time: Mutex<Option<Instant>>,
    plugin_info: Mutex<Option<PluginInfo>>,
}

impl PluginHandle {
    /// Record `config` without spawning anything. Fails with
    /// [`ClientError::InvalidConfig`] if the config is not sane enough to
    /// ever start.
    pub fn initialize(config: PluginConfig) -> Result<PluginHandle, ClientError> {
        if config.name.is_empty() {
            return Err(ClientError::InvalidConfig("plugin name is empty".into()));
        }
        if config.plugin_type != PluginType::Helper && config.binary_path.as_os_str().is_empty() {
            return Err(ClientError::InvalidConfig("binary path is empty".into()));
        }
        if config.plugin_type == PluginType::Grpc && config.port == 0 {
            return Err(ClientError::InvalidConfig(
                "grpc plugin requires a nonzero port".into(),
            ));
        }

        Ok(PluginHandle {
            config,
            state: Mutex::new(State::Stopped),
            process: Mutex::new(None),
            rpc: Mutex::new(None),
            start_time: Mutex::new(None),
            plugin_info: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub async fn current_state(&self) -> State {
        *self.state.lock().await
    }

    pub async fn is_running(&self) -> bool {
        self.current_state().await.is_running()
    }

    /// Spawn the child process (long-running plugin types) or, for a
    /// `helper`-type plugin, transition straight to `Running` without a
    /// standing process: helpers are invoked fresh on every `execute` call,
    /// so there is nothing to keep alive between calls.
    pub async fn start(&self, cancel: &CancellationToken) -> Result<(), ClientError> {
        {
            let mut state = self.state.lock().await;
            if *state != State::Stopped {
                return Err(ClientError::StartFailed(format!(
                    "cannot start from state {:?}",
                    *state
                )));
            }
            *state = State::Starting;
        }

        if self.config.plugin_type == PluginType::Helper {
            *self.start_time.lock().await = Some(Instant::now());
            *self.state.lock().await = State::Running;
            info!(plugin = %self.config.name, "helper plugin marked running (per-invocation lifecycle)");
            return Ok(());
        }

        match self.start_long_running(cancel).await {
            Ok(()) => {
                *self.state.lock().await = State::Running;
                Ok(())
            }
            Err(err) => {
                self.kill_process().await;
                *self.state.lock().await = State::Failed;
                Err(err)
            }
        }
    }

    async fn start_long_running(&self, cancel: &CancellationToken) -> Result<(), ClientError> {
        let mut command = Command::new(&self.config.binary_path);
        command
            .current_dir(&self.config.working_dir)
            .envs(&self.config.environment)
            .env("PORT", self.config.port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|err| ClientError::StartFailed(format!("failed to spawn process: {err}")))?;

        forward_output(&self.config.name, &mut child);

        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), self.config.port);
        let deadline = self.config.startup_deadline;

        let rpc = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(ClientError::Cancelled);
            }
            result = tokio::time::timeout(deadline, connect_with_retry(addr)) => {
                match result {
                    Ok(Ok(rpc)) => rpc,
                    Ok(Err(err)) => return Err(ClientError::StartFailed(format!("rpc connect failed: {err}"))),
                    Err(_) => return Err(ClientError::StartFailed(format!(
                        "plugin did not accept connections within {:?}", deadline
                    ))),
                }
            }
        };

        let init_request = InitializeRequest {
            name: self.config.name.clone(),
            version: self.config.version.clone(),
            config: Default::default(),
            environment: self.config.environment.clone(),
            permissions: self.config.permissions.clone(),
        };
        let response = rpc
            .initialize(&init_request, deadline, cancel)
            .await
            .map_err(|err| ClientError::StartFailed(format!("initialize failed: {err}")))?;
        if !response.success {
            return Err(ClientError::StartFailed(response.message));
        }

        *self.plugin_info.lock().await = Some(response.plugin_info);
        *self.start_time.lock().await = Some(Instant::now());
        *self.process.lock().await = Some(child);
        *self.rpc.lock().await = Some(rpc);
        Ok(())
    }

    /// Send `Shutdown` with a grace period, then forcefully terminate the
    /// child if it is still alive at the deadline. Idempotent when already
    /// `Stopped`.
    pub async fn stop(&self, cancel: &CancellationToken) -> Result<(), ClientError> {
        {
            let mut state = self.state.lock().await;
            if *state == State::Stopped {
                return Ok(());
            }
            *state = State::Stopping;
        }

        if self.config.plugin_type == PluginType::Helper {
            *self.state.lock().await = State::Stopped;
            *self.start_time.lock().await = None;
            return Ok(());
        }

        let grace = self.config.shutdown_grace_period;
        if let Some(rpc) = self.rpc.lock().await.as_ref() {
            let request = ShutdownRequest {
                force: false,
                timeout_seconds: grace.as_secs(),
            };
            if let Err(err) = rpc.shutdown(&request, grace, cancel).await {
                warn!(plugin = %self.config.name, "shutdown rpc failed, will hard-kill: {err}");
            }
        }

        let exited_gracefully = {
            let mut process = self.process.lock().await;
            match process.as_mut() {
                Some(child) => tokio::select! {
                    biased;
                    _ = cancel.cancelled() => false,
                    result = tokio::time::timeout(grace, child.wait()) => matches!(result, Ok(Ok(_))),
                },
                None => true,
            }
        };

        if !exited_gracefully {
            self.kill_process().await;
        }
        *self.process.lock().await = None;
        *self.rpc.lock().await = None;
        *self.start_time.lock().await = None;
        *self.state.lock().await = State::Stopped;
        Ok(())
    }

    /// Run `request` against the plugin. `grpc`/`executable` plugins issue
    /// a single RPC call on the standing channel; `helper` plugins are
    /// spawned fresh for this one invocation and their stdout/exit code is
    /// mapped onto the same response shape.
    pub async fn execute(
        &self,
        request: ExecuteRequest,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<ExecuteResponse, ClientError> {
        if !self.is_running().await {
            return Err(ClientError::NotRunning);
        }

        if self.config.plugin_type == PluginType::Helper {
            return self.execute_helper(request).await;
        }

        let rpc = self.rpc.lock().await;
        let rpc = rpc.as_ref().ok_or(ClientError::NotRunning)?;
        Ok(rpc.execute(&request, deadline, cancel).await?)
    }

    async fn execute_helper(&self, request: ExecuteRequest) -> Result<ExecuteResponse, ClientError> {
        let mut command = Command::new(&self.config.binary_path);
        command.arg(&request.command).args(&request.args);
        command
            .current_dir(if request.working_directory.is_empty() {
                self.config.working_dir.clone()
            } else {
                request.working_directory.clone().into()
            })
            .envs(&self.config.environment)
            .envs(&request.environment)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = command
            .output()
            .await
            .map_err(|err| ClientError::StartFailed(format!("helper invocation failed: {err}")))?;

        Ok(ExecuteResponse {
            success: output.status.success(),
            message: String::new(),
            output: String::from_utf8_lossy(&output.stdout).into_owned(),
            error: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
            metadata: Default::default(),
        })
    }

    /// Single `Health` RPC call. A transport error or an unhealthy report
    /// flips this handle's local state to `Failed`; the caller (typically
    /// the supervisor's health loop) is responsible for reflecting that
    /// into the registry.
    pub async fn health(&self, deadline: Duration, cancel: &CancellationToken) -> Result<HealthReport, ClientError> {
        if self.config.plugin_type == PluginType::Helper {
            let healthy = self.is_running().await;
            return Ok(HealthReport {
                healthy,
                status: if healthy { "running".into() } else { "stopped".into() },
                message: String::new(),
                uptime_seconds: self.uptime().await.as_secs(),
                metrics: Default::default(),
            });
        }

        let rpc_guard = self.rpc.lock().await;
        let Some(rpc) = rpc_guard.as_ref() else {
            return Err(ClientError::NotRunning);
        };

        match rpc.health(deadline, cancel).await {
            Ok(report) => {
                if !report.healthy {
                    debug!(plugin = %self.config.name, "plugin reported unhealthy");
                    *self.state.lock().await = State::Failed;
                }
                Ok(report)
            }
            Err(err) => {
                *self.state.lock().await = State::Failed;
                Err(err.into())
            }
        }
    }

    /// Cached identity + capability summary, populated at `Initialize`
    /// time. Re-queried from the plugin if not yet cached.
    pub async fn get_info(&self, deadline: Duration, cancel: &CancellationToken) -> Result<PluginInfo, ClientError> {
        if let Some(info) = self.plugin_info.lock().await.clone() {
            return Ok(info);
        }
        let rpc_guard = self.rpc.lock().await;
        let rpc = rpc_guard.as_ref().ok_or(ClientError::NotRunning)?;
        let response = rpc.get_info(deadline, cancel).await?;
        *self.plugin_info.lock().await = Some(response.plugin_info.clone());
        Ok(response.plugin_info)
    }

    /// `ListCommands` RPC call: the plugin's advertised command surface.
    /// Unlike `get_info`, never cached — a plugin is free to change its
    /// command set across a restart.
    pub async fn list_commands(
        &self,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<portunix_protocol::ListCommandsResponse, ClientError> {
        if self.config.plugin_type == PluginType::Helper {
            return Ok(portunix_protocol::ListCommandsResponse::default());
        }
        let rpc_guard = self.rpc.lock().await;
        let rpc = rpc_guard.as_ref().ok_or(ClientError::NotRunning)?;
        Ok(rpc.list_commands(deadline, cancel).await?)
    }

    async fn uptime(&self) -> Duration {
        self.start_time
            .lock()
            .await
            .map(|t| t.elapsed())
            .unwrap_or_default()
    }

    async fn kill_process(&self) {
        if let Some(mut child) = self.process.lock().await.take() {
            if let Err(err) = child.kill().await {
                warn!(plugin = %self.config.name, "failed to kill child process: {err}");
            }
        }
    }
}

/// Retry TCP connects until one succeeds; the overall attempt is bounded
/// by the caller wrapping this in a `timeout`.
async fn connect_with_retry(addr: SocketAddr) -> Result<PluginRpcClient, portunix_rpc::RpcError> {
    loop {
        match PluginRpcClient::connect(addr, POLL_INTERVAL * 4).await {
            Ok(rpc) => return Ok(rpc),
            Err(_) => tokio::time::sleep(POLL_INTERVAL).await,
        }
    }
}

/// Drain a child's stdout/stderr into tracing events so plugin output isn't
/// silently discarded. Matches the forwarding the CLI's daemon spawn path
/// does for the one-shot daemon subprocess.
fn forward_output(plugin_name: &str, child: &mut Child) {
    if let Some(stdout) = child.stdout.take() {
        let name = plugin_name.to_string();
        tokio::spawn(async move {
            use tokio::io::{AsyncBufReadExt, BufReader};
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(plugin = %name, "stdout: {line}");
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        let name = plugin_name.to_string();
        tokio::spawn(async move {
            use tokio::io::{AsyncBufReadExt, BufReader};
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(plugin = %name, "stderr: {line}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portunix_manifest::PluginType;
    use std::collections::HashMap;

    fn helper_config(name: &str) -> PluginConfig {
        PluginConfig {
            name: name.to_string(),
            version: "1.0.0".into(),
            plugin_type: PluginType::Helper,
            binary_path: "/bin/true".into(),
            port: 0,
            working_dir: std::env::temp_dir(),
            environment: HashMap::new(),
            permissions: vec![],
            health_interval: Duration::from_secs(30),
            startup_deadline: Duration::from_secs(5),
            shutdown_grace_period: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn initialize_rejects_empty_name() {
        let mut config = helper_config("demo");
        config.name.clear();
        assert!(matches!(
            PluginHandle::initialize(config),
            Err(ClientError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn helper_lifecycle_is_per_invocation() {
        let handle = PluginHandle::initialize(helper_config("demo")).unwrap();
        assert_eq!(handle.current_state().await, State::Stopped);

        let cancel = CancellationToken::new();
        handle.start(&cancel).await.unwrap();
        assert_eq!(handle.current_state().await, State::Running);

        handle.stop(&cancel).await.unwrap();
        assert_eq!(handle.current_state().await, State::Stopped);
    }

    #[tokio::test]
    async fn execute_before_start_fails_not_running() {
        let handle = PluginHandle::initialize(helper_config("demo")).unwrap();
        let request = ExecuteRequest {
            command: "ping".into(),
            args: vec![],
            options: Default::default(),
            environment: Default::default(),
            working_directory: String::new(),
        };
        let cancel = CancellationToken::new();
        let err = handle
            .execute(request, Duration::from_secs(1), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotRunning));
    }

    #[tokio::test]
    async fn helper_execute_runs_real_binary() {
        let handle = PluginHandle::initialize(helper_config("demo")).unwrap();
        let cancel = CancellationToken::new();
        handle.start(&cancel).await.unwrap();

        let request = ExecuteRequest {
            command: String::new(),
            args: vec![],
            options: Default::default(),
            environment: Default::default(),
            working_directory: String::new(),
        };
        let response = handle
            .execute(request, Duration::from_secs(5), &cancel)
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.exit_code, 0);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let handle = PluginHandle::initialize(helper_config("demo")).unwrap();
        let cancel = CancellationToken::new();
        handle.stop(&cancel).await.unwrap();
        handle.stop(&cancel).await.unwrap();
        assert_eq!(handle.current_state().await, State::Stopped);
    }

    #[tokio::test]
    async fn start_twice_without_stop_fails() {
        let handle = PluginHandle::initialize(helper_config("demo")).unwrap();
        let cancel = CancellationToken::new();
        handle.start(&cancel).await.unwrap();
        let err = handle.start(&cancel).await.unwrap_err();
        assert!(matches!(err, ClientError::StartFailed(_)));
    }
}
