//! Plugin-side RPC server: the dispatcher a plugin process runs to
//! answer requests from a connected host. Used by the supervisor's test
//! fixtures and by any real plugin binary that links `portunix-rpc`
//! directly rather than reimplementing framing by hand.

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{debug, warn};

use portunix_protocol::methods;

use crate::error::RpcError;
use crate::frame::{self, Frame};

/// Implemented by a plugin to answer each base/datastore method. Methods
/// not implemented by a given plugin should return `Err` with a message
/// describing the unsupported method; `serve_connection` turns that into
/// a `Response` frame with the `error` field set rather than tearing down
/// the connection.
#[async_trait]
pub trait PluginService: Send + Sync {
    async fn initialize(&self, params: Value) -> Result<Value, String>;
    async fn execute(&self, params: Value) -> Result<Value, String>;
    async fn health(&self, params: Value) -> Result<Value, String>;
    async fn shutdown(&self, params: Value) -> Result<Value, String>;
    async fn get_info(&self, params: Value) -> Result<Value, String>;
    async fn list_commands(&self, params: Value) -> Result<Value, String>;

    async fn store(&self, _params: Value) -> Result<Value, String> {
        Err("datastore capability not implemented".to_string())
    }
    async fn retrieve(&self, _params: Value) -> Result<Value, String> {
        Err("datastore capability not implemented".to_string())
    }
    async fn query(&self, _params: Value) -> Result<Value, String> {
        Err("datastore capability not implemented".to_string())
    }
    async fn delete(&self, _params: Value) -> Result<Value, String> {
        Err("datastore capability not implemented".to_string())
    }
    async fn list(&self, _params: Value) -> Result<Value, String> {
        Err("datastore capability not implemented".to_string())
    }
    async fn test_connection(&self, _params: Value) -> Result<Value, String> {
        Err("datastore capability not implemented".to_string())
    }
    async fn get_stats(&self, _params: Value) -> Result<Value, String> {
        Err("datastore capability not implemented".to_string())
    }
}

async fn dispatch(service: &dyn PluginService, method: &str, params: Value) -> Result<Value, String> {
    match method {
        methods::base::INITIALIZE => service.initialize(params).await,
        methods::base::EXECUTE => service.execute(params).await,
        methods::base::HEALTH => service.health(params).await,
        methods::base::SHUTDOWN => service.shutdown(params).await,
        methods::base::GET_INFO => service.get_info(params).await,
        methods::base::LIST_COMMANDS => service.list_commands(params).await,
        methods::datastore::STORE => service.store(params).await,
        methods::datastore::RETRIEVE => service.retrieve(params).await,
        methods::datastore::QUERY => service.query(params).await,
        methods::datastore::DELETE => service.delete(params).await,
        methods::datastore::LIST => service.list(params).await,
        methods::datastore::TEST_CONNECTION => service.test_connection(params).await,
        methods::datastore::GET_STATS => service.get_stats(params).await,
        other => Err(format!("unknown method: {other}")),
    }
}

/// Serve requests on a single duplex stream until the peer disconnects or
/// a transport error occurs. One connection is one plugin process
/// lifetime: there is no reconnection or multiplexing across streams.
pub async fn serve_connection<S>(mut stream: S, service: &dyn PluginService) -> Result<(), RpcError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let frame = match frame::read_frame(&mut stream).await {
            Ok(frame) => frame,
            Err(RpcError::Transport(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                debug!("host closed the connection");
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let Frame::Request { id, method, params } = frame else {
            warn!("plugin received a response frame, ignoring");
            continue;
        };

        let response = match dispatch(service, &method, params).await {
            Ok(result) => Frame::Response {
                id,
                result: Some(result),
                error: None,
            },
            Err(message) => Frame::Response {
                id,
                result: None,
                error: Some(message),
            },
        };
        frame::write_frame(&mut stream, &response).await?;
    }
}

/// Bind `addr` and serve connections sequentially until the socket is
/// closed. Plugin processes handle exactly one host connection at a time,
/// so no connection-level concurrency is needed here.
pub async fn serve(listener: TcpListener, service: &dyn PluginService) -> Result<(), RpcError> {
    loop {
        let (stream, _) = listener.accept().await?;
        if let Err(err) = serve_connection(stream, service).await {
            warn!("connection ended with error: {err}");
        }
    }
}
