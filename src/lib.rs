//! Session-oriented MCP Server and Client
//!
//! This crate implements a tool-invocation server speaking JSON-RPC 2.0 over
//! a session-oriented HTTP transport, together with the matching client
//! session, around an in-memory todo catalog.
//!
//! # Architecture
//!
//! - **core**: Shared infrastructure: configuration, error handling, the
//!   protocol envelopes, schema validation, session management, request
//!   dispatch, and the HTTP transport (behind the `server` feature)
//! - **domains**: Business logic organized by bounded contexts
//!   - **todos**: The in-memory todo store behind the tool catalog
//!   - **tools**: The tool registry and the registered tool definitions
//! - **client**: The caller side, behind the `client` feature: handshake,
//!   correlated tool calls, and the notification stream reader
//!
//! # Example
//!
//! ```rust,no_run
//! use todo_mcp_server::core::{Config, HttpTransport, McpServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let server = McpServer::new(config.clone())?;
//!     let transport = HttpTransport::new(config.http);
//!     transport.run(server).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

#[cfg(feature = "client")]
pub mod client;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};

#[cfg(feature = "client")]
pub use client::{ClientError, ClientSession, ToolCallResult};
