//! Transport-independent RPC message shapes for the host/plugin contract.
//! The transport itself (framing, cancellation, deadlines) lives in
//! `portunix-rpc`; this crate only fixes the method names and the
//! request/response payload shapes both sides agree on.

pub mod base;
pub mod datastore;
pub mod methods;

pub use base::*;
pub use datastore::*;
