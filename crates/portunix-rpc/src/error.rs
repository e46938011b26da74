//! RPC error kinds surfaced to callers of `PluginRpcClient`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("malformed frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("frame exceeds maximum size ({0} bytes)")]
    FrameTooLarge(usize),

    #[error("connection closed before a response arrived")]
    ConnectionClosed,

    #[error("remote plugin returned an error: {0}")]
    Remote(String),

    #[error("RPC call exceeded its deadline")]
    Timeout,

    #[error("RPC call was cancelled")]
    Cancelled,
}
