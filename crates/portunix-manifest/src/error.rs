//! Error kinds surfaced by manifest parsing, validation, and persistence.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to parse manifest at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("manifest validation failed: field {field:?}: {reason}")]
    Validation { field: String, reason: String },

    #[error("manifest I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ManifestError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ManifestError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
