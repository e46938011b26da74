//! A minimal real plugin process used only by this crate's own integration
//! tests: reflects `execute`'s command and args back in its output, and
//! answers the rest of the base contract with fixed values. Not part of
//! the published crate surface.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use portunix_rpc::PluginService;

struct EchoFixture;

#[async_trait]
impl PluginService for EchoFixture {
    async fn initialize(&self, _params: Value) -> Result<Value, String> {
        Ok(json!({
            "success": true,
            "message": "initialized",
            "pluginInfo": {
                "name": "echo-fixture",
                "version": "1.0.0",
                "description": "rpc transport test fixture",
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
        Ok(json!({"healthy": true, "status": "ok", "message": "", "uptimeSeconds": 0}))
    }

    async fn shutdown(&self, _params: Value) -> Result<Value, String> {
        Ok(json!({"success": true, "message": "shutting down"}))
    }

    async fn get_info(&self, params: Value) -> Result<Value, String> {
        self.initialize(params).await.map(|v| json!({"pluginInfo": v["pluginInfo"]}))
    }

    async fn list_commands(&self, _params: Value) -> Result<Value, String> {
        Ok(json!({"commands": [], "capabilities": []}))
    }
}

#[tokio::main]
async fn main() {
    let port: u16 = std::env::var("PORT")
        .expect("echo fixture requires PORT")
        .parse()
        .expect("PORT must be numeric");

    let listener = TcpListener::bind(("127.0.0.1", port)).await.expect("bind fixture port");
    portunix_rpc::serve(listener, &EchoFixture).await.expect("echo fixture server loop");
}
