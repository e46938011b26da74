//! Error kinds for helper discovery. Discovery has no persistent state,
//! so the only failure mode is being unable to even list the host's
//! executable directory; per-helper probe failures degrade gracefully
//! instead of erroring (see `discover`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HelperError {
    #[error("could not determine the host executable's directory: {0}")]
    ExecutableDir(std::io::Error),

    #[error("could not list helper directory {path}: {source}")]
    ListDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
