//! A minimal real plugin process used only by this crate's integration
//! tests. Listens on `$PORT` and answers the base RPC contract; a few
//! environment variables steer it into the degenerate behaviors the
//! lifecycle tests need to drive:
//!
//! - `PTX_FIXTURE_NO_LISTEN=1`: never binds a socket (startup timeout).
//! - `PTX_FIXTURE_UNHEALTHY=1`: reports `healthy: false` forever.
//!
//! Not part of the published crate surface; it is a test fixture, not a
//! real plugin runtime.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use portunix_rpc::PluginService;

struct FixturePlugin {
    started_at: Instant,
    unhealthy: bool,
}

#[async_trait]
impl PluginService for FixturePlugin {
    async fn initialize(&self, _params: Value) -> Result<Value, String> {
        Ok(json!({
            "success": true,
            "message": "initialized",
            "pluginInfo": {
                "name": "fixture",
                "version": "1.0.0",
                "description": "test fixture plugin",
                "capabilities": [],
                "requiredPermissions": []
            }
        }))
    }

    async fn execute(&self, params: Value) -> Result<Value, String> {
        let command = params.get("command").and_then(Value::as_str).unwrap_or_default();
        let args: Vec<String> = params
            .get("args")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        Ok(json!({
            "success": true,
            "message": "ok",
            "output": format!("{command} {}", args.join(" ")).trim(),
            "error": "",
            "exitCode": 0,
            "metadata": {}
        }))
    }

    async fn health(&self, _params: Value) -> Result<Value, String> {
        Ok(json!({
            "healthy": !self.unhealthy,
            "status": if self.unhealthy { "degraded" } else { "ok" },
            "message": "",
            "uptimeSeconds": self.started_at.elapsed().as_secs(),
            "metrics": {}
        }))
    }

    async fn shutdown(&self, _params: Value) -> Result<Value, String> {
        Ok(json!({"success": true, "message": "shutting down"}))
    }

    async fn get_info(&self, _params: Value) -> Result<Value, String> {
        self.initialize(Value::Null)
            .await
            .map(|v| json!({"pluginInfo": v["pluginInfo"]}))
    }

    async fn list_commands(&self, _params: Value) -> Result<Value, String> {
        Ok(json!({"commands": [], "capabilities": []}))
    }
}

#[tokio::main]
async fn main() {
    if std::env::var("PTX_FIXTURE_NO_LISTEN").ok().as_deref() == Some("1") {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        }
    }

    let port: u16 = std::env::var("PORT")
        .expect("fixture plugin requires PORT")
        .parse()
        .expect("PORT must be numeric");
    let unhealthy = std::env::var("PTX_FIXTURE_UNHEALTHY").ok().as_deref() == Some("1");

    let service = FixturePlugin {
        started_at: Instant::now(),
        unhealthy,
    };
    let listener = TcpListener::bind(("127.0.0.1", port)).await.expect("bind fixture port");
    portunix_rpc::serve(listener, &service).await.expect("fixture plugin server loop");
}
