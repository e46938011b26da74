//! Discovery and capability probing for sibling `ptx-*` helper binaries.
//!
//! Helpers are standalone executables dropped next to the host binary,
//! outside the plugin manifest/registry system entirely: there is no
//! install step and no persisted state. `discover` looks at what is on
//! disk right now and, for anything that looks runnable, probes it for
//! its version, description, and commands.

mod discovery;
mod error;

pub use discovery::{discover, probe, validate_version, HelperInfo};
pub use error::HelperError;
