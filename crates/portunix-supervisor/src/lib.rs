//! The top-level plugin lifecycle manager: install / uninstall / enable /
//! disable / start / stop / execute, port allocation, and the background
//! health loop. Persists catalog state via `portunix-registry`; drives
//! per-plugin processes via `portunix-plugin-client`.

mod config;
mod error;
mod ports;
mod supervisor;

pub use config::{PortRange, SupervisorConfig};
pub use error::SupervisorError;
pub use supervisor::Supervisor;
