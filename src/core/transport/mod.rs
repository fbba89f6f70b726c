//! Transport layer for the MCP server.
//!
//! The wire transport is session-oriented HTTP: a single endpoint serving
//! POST (requests/notifications), GET (server-initiated SSE stream), and
//! DELETE (session termination). The `server` feature gates the axum
//! implementation; the configuration and error types are always available
//! so the client half can share them.

mod config;
mod error;

#[cfg(feature = "server")]
pub mod http;

pub use config::HttpConfig;
pub use error::{TransportError, TransportResult};

#[cfg(feature = "server")]
pub use http::HttpTransport;
