//! Transport configuration types.

use serde::{Deserialize, Serialize};

/// HTTP transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Port number to listen on.
    pub port: u16,

    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Path for the MCP endpoint.
    #[serde(default = "default_rpc_path")]
    pub rpc_path: String,

    /// Enable CORS for browser clients.
    #[serde(default = "default_cors")]
    pub enable_cors: bool,

    /// Deliver POST responses as an SSE stream when the client accepts
    /// `text/event-stream`; plain JSON bodies otherwise.
    #[serde(default)]
    pub enable_streaming: bool,

    /// Seconds a session may sit idle (no requests, no open notification
    /// stream) before it is closed and forgotten.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_rpc_path() -> String {
    "/mcp".to_string()
}

fn default_cors() -> bool {
    true
}

fn default_session_ttl() -> u64 {
    300
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: default_host(),
            rpc_path: default_rpc_path(),
            enable_cors: default_cors(),
            enable_streaming: false,
            session_ttl_secs: default_session_ttl(),
        }
    }
}

impl HttpConfig {
    /// Load HTTP config from environment variables.
    pub fn from_env() -> Self {
        let port = std::env::var("MCP_HTTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);
        let host = std::env::var("MCP_HTTP_HOST").unwrap_or_else(|_| default_host());
        let rpc_path = std::env::var("MCP_HTTP_PATH").unwrap_or_else(|_| default_rpc_path());
        let enable_cors = std::env::var("MCP_HTTP_CORS")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true);
        let enable_streaming = std::env::var("MCP_HTTP_STREAMING")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);
        let session_ttl_secs = std::env::var("MCP_HTTP_SESSION_TTL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_session_ttl);

        Self {
            port,
            host,
            rpc_path,
            enable_cors,
            enable_streaming,
            session_ttl_secs,
        }
    }
}
