//! Error kinds surfaced by supervisor lifecycle operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("plugin {0:?} is already installed")]
    AlreadyExists(String),

    #[error("plugin {0:?} is not known to the supervisor")]
    NotFound(String),

    #[error("plugin {0:?} is not running")]
    NotRunning(String),

    #[error("manifest requires host version compatible with {required}, host is {host}")]
    IncompatibleVersion {
        required: portunix_version::Version,
        host: portunix_version::Version,
    },

    #[error("manifest does not support the current OS ({current:?}); supports {supported:?}")]
    UnsupportedOs {
        current: portunix_manifest::OsKind,
        supported: Vec<portunix_manifest::OsKind>,
    },

    #[error("no port available in configured range")]
    InvalidConfig(String),

    #[error(transparent)]
    Manifest(#[from] portunix_manifest::ManifestError),

    #[error(transparent)]
    Registry(#[from] portunix_registry::RegistryError),

    #[error(transparent)]
    Client(#[from] portunix_plugin_client::ClientError),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
}
