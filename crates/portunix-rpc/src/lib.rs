//! Framed RPC transport shared by the host (client side) and plugin
//! processes (server side). Message shapes live in `portunix-protocol`;
//! this crate only owns the wire codec and the request/response
//! plumbing on top of it.

mod client;
mod error;
mod frame;
mod server;

pub use client::PluginRpcClient;
pub use error::RpcError;
pub use frame::{read_frame, write_frame, Frame, MAX_FRAME_BYTES};
pub use server::{serve, serve_connection, PluginService};
