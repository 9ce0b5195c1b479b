//! HTTP API module.
//!
//! This module provides the HTTP server, response types and the log
//! broadcaster shared by the CLI and the server.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{start_server, ServerConfig};
pub use types::*;
