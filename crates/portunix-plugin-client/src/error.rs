//! Error kinds surfaced by a single plugin handle.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid plugin configuration: {0}")]
    InvalidConfig(String),

    #[error("plugin process failed to start: {0}")]
    StartFailed(String),

    #[error("plugin is not running")]
    NotRunning,

    #[error(transparent)]
    Rpc(#[from] portunix_rpc::RpcError),

    #[error("operation was cancelled")]
    Cancelled,

    #[error("process management error: {0}")]
    Io(#[from] std::io::Error),
}
