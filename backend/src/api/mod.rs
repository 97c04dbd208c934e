//! HTTP API module.
//!
//! Upload and download endpoints, response types, and the SSE log stream.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server, ServerConfig};
pub use types::*;
