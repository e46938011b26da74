//! Error kinds for registry operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("plugin {0:?} is already registered")]
    AlreadyExists(String),

    #[error("plugin {0:?} is not registered")]
    NotFound(String),

    #[error("registry file at {path} is corrupt: {reason}")]
    CorruptRegistry { path: String, reason: String },

    #[error("registry I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
