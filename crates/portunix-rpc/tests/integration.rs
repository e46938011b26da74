//! Exercises the client against a real OS child process rather than an
//! in-process fake, closing the same gap `portunix-supervisor`'s
//! `tests/lifecycle.rs` closes for the supervisor layer.

use std::net::SocketAddr;
use std::time::Duration;

use portunix_protocol::{ExecuteRequest, InitializeRequest, ShutdownRequest};
use portunix_rpc::PluginRpcClient;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

fn fixture_binary() -> &'static str {
    env!("CARGO_BIN_EXE_ptx-rpc-echo-fixture")
}

fn spawn_fixture(port: u16) -> Child {
    Command::new(fixture_binary())
        .env("PORT", port.to_string())
        .kill_on_drop(true)
        .spawn()
        .expect("spawn echo fixture")
}

async fn connect(port: u16) -> PluginRpcClient {
    let addr: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();
    // The fixture binds its listener shortly after the process starts; a
    // bounded retry loop absorbs that startup race without a fixed sleep.
    let mut last_err = None;
    for _ in 0..50 {
        match PluginRpcClient::connect(addr, Duration::from_millis(200)).await {
            Ok(client) => return client,
            Err(err) => {
                last_err = Some(err);
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        }
    }
    panic!("could not connect to echo fixture: {last_err:?}");
}

#[tokio::test]
async fn initialize_and_execute_round_trip_through_a_real_process() {
    let port = 9501;
    let mut child = spawn_fixture(port);
    let client = connect(port).await;
    let cancel = CancellationToken::new();

    let info = client
        .initialize(
            &InitializeRequest {
                name: "host".to_string(),
                version: "0.1.0".to_string(),
                config: Default::default(),
                environment: Default::default(),
                permissions: vec![],
            },
            Duration::from_secs(2),
            &cancel,
        )
        .await
        .unwrap();
    assert!(info.success);
    assert_eq!(info.plugin_info.name, "echo-fixture");

    let response = client
        .execute(
            &ExecuteRequest {
                command: "ping".to_string(),
                args: vec!["a".to_string(), "b".to_string()],
                options: Default::default(),
                environment: Default::default(),
                working_directory: String::new(),
            },
            Duration::from_secs(2),
            &cancel,
        )
        .await
        .unwrap();
    assert!(response.success);
    assert_eq!(response.output, "ping a b");
    assert_eq!(response.exit_code, 0);

    child.start_kill().ok();
    let _ = child.wait().await;
}

#[tokio::test]
async fn health_and_shutdown_round_trip_through_a_real_process() {
    let port = 9502;
    let mut child = spawn_fixture(port);
    let client = connect(port).await;
    let cancel = CancellationToken::new();

    let health = client.health(Duration::from_secs(2), &cancel).await.unwrap();
    assert!(health.healthy);

    let shutdown = client
        .shutdown(
            &ShutdownRequest {
                force: false,
                timeout_seconds: 5,
            },
            Duration::from_secs(2),
            &cancel,
        )
        .await
        .unwrap();
    assert!(shutdown.success);

    child.start_kill().ok();
    let _ = child.wait().await;
}
