//! Core module containing shared infrastructure components.
//!
//! This module provides the foundational building blocks for the MCP
//! server: configuration, error handling, the protocol envelopes, schema
//! validation, session management, request dispatch, and the transport
//! layer.

pub mod config;
pub mod error;
pub mod protocol;
pub mod schema;
pub mod server;
pub mod session;
pub mod transport;

pub use config::Config;
pub use error::{Error, Result};
pub use server::McpServer;
pub use session::{Session, SessionManager, SessionState};
pub use transport::HttpConfig;

#[cfg(feature = "server")]
pub use transport::HttpTransport;
