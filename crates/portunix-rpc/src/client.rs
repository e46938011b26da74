//! Host-side RPC client. The host always initiates the connection and
//! stays the RPC client; the plugin process is the server.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use portunix_protocol::methods;

use crate::error::RpcError;
use crate::frame::{self, Frame};

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, String>>>>>;

/// A connected RPC channel to a single plugin process.
pub struct PluginRpcClient {
    writer: tokio::sync::Mutex<WriteHalf<TcpStream>>,
    pending: Pending,
    next_id: AtomicU64,
    reader_task: JoinHandle<()>,
}

impl PluginRpcClient {
    /// Connect to `addr`, bounded by `connect_deadline`. Spawns a reader
    /// task that demultiplexes responses to pending callers by request id,
    /// so concurrent `execute`-style calls on the same connection may
    /// interleave.
    pub async fn connect(addr: SocketAddr, connect_deadline: Duration) -> Result<Self, RpcError> {
        let stream = tokio::time::timeout(connect_deadline, TcpStream::connect(addr))
            .await
            .map_err(|_| RpcError::Timeout)??;
        stream.set_nodelay(true).ok();
        Ok(Self::from_stream(stream))
    }

    fn from_stream(stream: TcpStream) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let reader_task = tokio::spawn(reader_loop(read_half, pending.clone()));

        PluginRpcClient {
            writer: tokio::sync::Mutex::new(write_half),
            pending,
            next_id: AtomicU64::new(1),
            reader_task,
        }
    }

    /// Issue a raw JSON-RPC call, bounded by `deadline` and `cancel`.
    pub async fn call(
        &self,
        method: &str,
        params: Value,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, tx);

        let frame = Frame::Request {
            id,
            method: method.to_string(),
            params,
        };

        {
            let mut writer = self.writer.lock().await;
            if let Err(err) = frame::write_frame(&mut *writer, &frame).await {
                self.pending.lock().unwrap().remove(&id);
                return Err(err);
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                self.pending.lock().unwrap().remove(&id);
                Err(RpcError::Cancelled)
            }
            _ = tokio::time::sleep(deadline) => {
                self.pending.lock().unwrap().remove(&id);
                Err(RpcError::Timeout)
            }
            outcome = rx => match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(message)) => Err(RpcError::Remote(message)),
                Err(_) => Err(RpcError::ConnectionClosed),
            }
        }
    }

    async fn call_typed<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        method: &str,
        request: &Req,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<Resp, RpcError> {
        let params = serde_json::to_value(request)?;
        let result = self.call(method, params, deadline, cancel).await?;
        Ok(serde_json::from_value(result)?)
    }

    pub async fn initialize(
        &self,
        request: &portunix_protocol::InitializeRequest,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<portunix_protocol::InitializeResponse, RpcError> {
        self.call_typed(methods::base::INITIALIZE, request, deadline, cancel).await
    }

    pub async fn execute(
        &self,
        request: &portunix_protocol::ExecuteRequest,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<portunix_protocol::ExecuteResponse, RpcError> {
        self.call_typed(methods::base::EXECUTE, request, deadline, cancel).await
    }

    pub async fn health(
        &self,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<portunix_protocol::HealthResponse, RpcError> {
        self.call_typed(
            methods::base::HEALTH,
            &portunix_protocol::HealthRequest::default(),
            deadline,
            cancel,
        )
        .await
    }

    pub async fn shutdown(
        &self,
        request: &portunix_protocol::ShutdownRequest,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<portunix_protocol::ShutdownResponse, RpcError> {
        self.call_typed(methods::base::SHUTDOWN, request, deadline, cancel).await
    }

    pub async fn get_info(
        &self,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<portunix_protocol::GetInfoResponse, RpcError> {
        self.call_typed(
            methods::base::GET_INFO,
            &portunix_protocol::GetInfoRequest::default(),
            deadline,
            cancel,
        )
        .await
    }

    pub async fn list_commands(
        &self,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<portunix_protocol::ListCommandsResponse, RpcError> {
        self.call_typed(
            methods::base::LIST_COMMANDS,
            &portunix_protocol::ListCommandsRequest::default(),
            deadline,
            cancel,
        )
        .await
    }

    pub async fn store(
        &self,
        request: &portunix_protocol::StoreRequest,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<portunix_protocol::StoreResponse, RpcError> {
        self.call_typed(methods::datastore::STORE, request, deadline, cancel).await
    }

    pub async fn retrieve(
        &self,
        request: &portunix_protocol::RetrieveRequest,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<portunix_protocol::RetrieveResponse, RpcError> {
        self.call_typed(methods::datastore::RETRIEVE, request, deadline, cancel).await
    }

    pub async fn query(
        &self,
        request: &portunix_protocol::QueryRequest,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<portunix_protocol::QueryResponse, RpcError> {
        self.call_typed(methods::datastore::QUERY, request, deadline, cancel).await
    }

    pub async fn delete(
        &self,
        request: &portunix_protocol::DeleteRequest,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<portunix_protocol::DeleteResponse, RpcError> {
        self.call_typed(methods::datastore::DELETE, request, deadline, cancel).await
    }

    pub async fn list_keys(
        &self,
        request: &portunix_protocol::ListRequest,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<portunix_protocol::ListResponse, RpcError> {
        self.call_typed(methods::datastore::LIST, request, deadline, cancel).await
    }

    pub async fn test_connection(
        &self,
        request: &portunix_protocol::TestConnectionRequest,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<portunix_protocol::TestConnectionResponse, RpcError> {
        self.call_typed(methods::datastore::TEST_CONNECTION, request, deadline, cancel).await
    }

    pub async fn get_stats(
        &self,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<portunix_protocol::GetStatsResponse, RpcError> {
        self.call_typed(
            methods::datastore::GET_STATS,
            &portunix_protocol::GetStatsRequest::default(),
            deadline,
            cancel,
        )
        .await
    }
}

impl Drop for PluginRpcClient {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

async fn reader_loop(mut reader: ReadHalf<TcpStream>, pending: Pending) {
    loop {
        match frame::read_frame(&mut reader).await {
            Ok(Frame::Response { id, result, error }) => {
                if let Some(tx) = pending.lock().unwrap().remove(&id) {
                    let outcome = match error {
                        Some(message) => Err(message),
                        None => Ok(result.unwrap_or(Value::Null)),
                    };
                    let _ = tx.send(outcome);
                }
            }
            Ok(Frame::Request { method, .. }) => {
                warn!(method, "plugin sent a request frame on the host channel, ignoring");
            }
            Err(err) => {
                debug!("rpc connection closed: {err}");
                break;
            }
        }
    }
    // Connection is gone: wake every still-pending caller with ConnectionClosed
    // by dropping their senders.
    pending.lock().unwrap().clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn call_round_trips_through_a_loopback_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (mut read_half, mut write_half) = tokio::io::split(stream);
            let frame = frame::read_frame(&mut read_half).await.unwrap();
            if let Frame::Request { id, .. } = frame {
                let response = Frame::Response {
                    id,
                    result: Some(serde_json::json!({"healthy": true, "status": "ok", "message": "", "uptimeSeconds": 5})),
                    error: None,
                };
                frame::write_frame(&mut write_half, &response).await.unwrap();
            }
        });

        let client = PluginRpcClient::connect(addr, Duration::from_secs(1)).await.unwrap();
        let cancel = CancellationToken::new();
        let response = client.health(Duration::from_secs(1), &cancel).await.unwrap();
        assert!(response.healthy);
    }

    #[tokio::test]
    async fn call_times_out_when_server_never_responds() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            // Hold the connection open without ever responding.
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let client = PluginRpcClient::connect(addr, Duration::from_secs(1)).await.unwrap();
        let cancel = CancellationToken::new();
        let err = client
            .health(Duration::from_millis(50), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Timeout));
    }

    #[tokio::test]
    async fn call_is_cancellable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let client = PluginRpcClient::connect(addr, Duration::from_secs(1)).await.unwrap();
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel_clone.cancel();
        });

        let err = client
            .health(Duration::from_secs(5), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Cancelled));
    }
}
