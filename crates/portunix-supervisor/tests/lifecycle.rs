//! End-to-end lifecycle scenarios against a real fixture plugin process:
//! install/enable/start/execute/stop/disable/uninstall round trips,
//! duplicate installs, incompatible host versions, startup timeouts, the
//! background health loop marking an unhealthy plugin failed, and port
//! range exhaustion. The unhealthy scenario is driven by the fixture's
//! "report unhealthy" mode rather than an externally-killed process, since
//! no external process-killing harness is available here.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use once_cell::sync::Lazy;
use portunix_manifest::{Manifest, OsKind, PluginType};
use portunix_registry::Status;
use portunix_supervisor::{PortRange, Supervisor, SupervisorConfig, SupervisorError};
use portunix_version::Version;

/// Tests that mutate process-global environment variables (to steer the
/// fixture plugin) must not interleave with each other.
static ENV_GUARD: Lazy<tokio::sync::Mutex<()>> = Lazy::new(|| tokio::sync::Mutex::new(()));

fn fixture_binary() -> &'static str {
    env!("CARGO_BIN_EXE_ptx-fixture-plugin")
}

fn write_manifest(dir: &Path, name: &str, port: u16, min_host_version: &str) {
    let mut manifest: Manifest = portunix_manifest::default(name, "fixture plugin", "test");
    manifest.plugin_type = PluginType::Grpc;
    manifest.binary = fixture_binary().to_string();
    manifest.port = Some(port);
    manifest.dependencies.min_host_version = Version::parse(min_host_version).unwrap();
    manifest.dependencies.os_support = vec![OsKind::Linux, OsKind::Windows, OsKind::Darwin];
    manifest.health_check_interval = Duration::from_millis(200);
    portunix_manifest::save(&manifest, dir.join("plugin.json")).unwrap();
}

fn test_config(plugins_dir: &Path, registry_file: &Path, port_start: u16, port_end: u16) -> SupervisorConfig {
    let mut config = SupervisorConfig::new(plugins_dir, registry_file);
    config.port_range = PortRange::new(port_start, port_end);
    config.default_port = port_start;
    config.health_interval = Duration::from_millis(0);
    config.startup_deadline = Duration::from_secs(5);
    config.shutdown_grace_period = Duration::from_secs(5);
    config
}

#[tokio::test]
async fn s1_full_lifecycle_round_trip() {
    let workdir = tempfile::tempdir().unwrap();
    let manifest_dir = workdir.path().join("src").join("demo");
    tokio::fs::create_dir_all(&manifest_dir).await.unwrap();
    write_manifest(&manifest_dir, "demo", 9101, "0.1.0");

    let supervisor = Supervisor::new(test_config(
        &workdir.path().join("plugins"),
        &workdir.path().join("registry.json"),
        9101,
        9101,
    ))
    .await
    .unwrap();

    supervisor.install(manifest_dir.join("plugin.json")).await.unwrap();
    assert_eq!(supervisor.get("demo").await.unwrap().status, Status::Stopped);

    supervisor.enable("demo").await.unwrap();
    assert_eq!(supervisor.get("demo").await.unwrap().status, Status::Stopped);

    supervisor.start("demo").await.unwrap();
    assert_eq!(supervisor.get("demo").await.unwrap().status, Status::Running);

    let health = supervisor.health("demo").await.unwrap();
    assert!(health.healthy);

    let response = supervisor
        .execute("demo", "ping", vec![], HashMap::new())
        .await
        .unwrap();
    assert!(response.success);
    assert_eq!(response.exit_code, 0);

    supervisor.stop("demo").await.unwrap();
    assert_eq!(supervisor.get("demo").await.unwrap().status, Status::Stopped);

    supervisor.disable("demo").await.unwrap();

    supervisor.uninstall("demo").await.unwrap();
    assert!(matches!(
        supervisor.get("demo").await,
        Err(SupervisorError::NotFound(_))
    ));
    assert!(!workdir.path().join("plugins").join("demo").exists());
}

#[tokio::test]
async fn s2_duplicate_install_fails() {
    let workdir = tempfile::tempdir().unwrap();
    let manifest_dir = workdir.path().join("src").join("demo");
    tokio::fs::create_dir_all(&manifest_dir).await.unwrap();
    write_manifest(&manifest_dir, "demo", 9102, "0.1.0");

    let supervisor = Supervisor::new(test_config(
        &workdir.path().join("plugins"),
        &workdir.path().join("registry.json"),
        9102,
        9102,
    ))
    .await
    .unwrap();

    supervisor.install(manifest_dir.join("plugin.json")).await.unwrap();
    let err = supervisor.install(manifest_dir.join("plugin.json")).await.unwrap_err();
    assert!(matches!(err, SupervisorError::AlreadyExists(_)));
}

#[tokio::test]
async fn s3_incompatible_host_version_rejected() {
    let workdir = tempfile::tempdir().unwrap();
    let manifest_dir = workdir.path().join("src").join("demo");
    tokio::fs::create_dir_all(&manifest_dir).await.unwrap();
    write_manifest(&manifest_dir, "demo", 9103, "2.0.0");

    let supervisor = Supervisor::new(test_config(
        &workdir.path().join("plugins"),
        &workdir.path().join("registry.json"),
        9103,
        9103,
    ))
    .await
    .unwrap();

    let err = supervisor.install(manifest_dir.join("plugin.json")).await.unwrap_err();
    assert!(matches!(err, SupervisorError::IncompatibleVersion { .. }));
}

#[tokio::test]
async fn s4_startup_timeout_leaves_no_orphan_and_marks_failed() {
    let _guard = ENV_GUARD.lock().await;
    std::env::set_var("PTX_FIXTURE_NO_LISTEN", "1");

    let workdir = tempfile::tempdir().unwrap();
    let manifest_dir = workdir.path().join("src").join("demo");
    tokio::fs::create_dir_all(&manifest_dir).await.unwrap();
    write_manifest(&manifest_dir, "demo", 9104, "0.1.0");

    let mut config = test_config(
        &workdir.path().join("plugins"),
        &workdir.path().join("registry.json"),
        9104,
        9104,
    );
    config.startup_deadline = Duration::from_millis(500);
    let supervisor = Supervisor::new(config).await.unwrap();

    supervisor.install(manifest_dir.join("plugin.json")).await.unwrap();
    supervisor.enable("demo").await.unwrap();

    let err = supervisor.start("demo").await.unwrap_err();
    assert!(matches!(err, SupervisorError::Client(_)));
    assert_eq!(supervisor.get("demo").await.unwrap().status, Status::Failed);

    std::env::remove_var("PTX_FIXTURE_NO_LISTEN");
}

#[tokio::test]
async fn s5_health_loop_marks_unhealthy_plugin_failed() {
    let _guard = ENV_GUARD.lock().await;
    std::env::set_var("PTX_FIXTURE_UNHEALTHY", "1");

    let workdir = tempfile::tempdir().unwrap();
    let manifest_dir = workdir.path().join("src").join("demo");
    tokio::fs::create_dir_all(&manifest_dir).await.unwrap();
    write_manifest(&manifest_dir, "demo", 9105, "0.1.0");

    let mut config = test_config(
        &workdir.path().join("plugins"),
        &workdir.path().join("registry.json"),
        9105,
        9105,
    );
    config.health_interval = Duration::from_millis(100);
    let supervisor = Supervisor::new(config).await.unwrap();

    supervisor.install(manifest_dir.join("plugin.json")).await.unwrap();
    supervisor.enable("demo").await.unwrap();
    supervisor.start("demo").await.unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(supervisor.get("demo").await.unwrap().status, Status::Failed);

    supervisor.shutdown().await;
    std::env::remove_var("PTX_FIXTURE_UNHEALTHY");
}

#[tokio::test]
async fn s6_port_range_exhaustion() {
    let workdir = tempfile::tempdir().unwrap();
    for name in ["alpha", "beta", "gamma"] {
        let manifest_dir = workdir.path().join("src").join(name);
        tokio::fs::create_dir_all(&manifest_dir).await.unwrap();
        write_manifest(&manifest_dir, name, 9201, "0.1.0");
    }

    let supervisor = Supervisor::new(test_config(
        &workdir.path().join("plugins"),
        &workdir.path().join("registry.json"),
        9201,
        9202,
    ))
    .await
    .unwrap();

    for name in ["alpha", "beta", "gamma"] {
        supervisor
            .install(workdir.path().join("src").join(name).join("plugin.json"))
            .await
            .unwrap();
    }

    supervisor.enable("alpha").await.unwrap();
    supervisor.enable("beta").await.unwrap();
    let err = supervisor.enable("gamma").await.unwrap_err();
    assert!(matches!(err, SupervisorError::InvalidConfig(_)));
}
