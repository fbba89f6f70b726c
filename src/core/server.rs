//! MCP server implementation and request dispatch.
//!
//! [`McpServer`] owns the tool registry (immutable after startup) and the
//! session manager, and turns incoming JSON-RPC envelopes into responses:
//! resolve the tool, validate input against its declared schema, invoke the
//! handler, validate and wrap the result, and echo the request id. Domain
//! failures are caught here and mapped to protocol errors; they never crash
//! the process or leak internals to the caller.

use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::domains::todos::{TodoProvider, TodoService};
use crate::domains::tools::{ToolError, ToolRegistry, register_all};

use super::config::Config;
use super::protocol::{JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION, JsonRpcNotification};
use super::session::{Session, SessionManager};

/// The main MCP server: registry, sessions, and dispatch.
#[derive(Clone)]
pub struct McpServer {
    config: Arc<Config>,
    registry: Arc<ToolRegistry>,
    sessions: Arc<SessionManager>,
}

impl McpServer {
    /// Create a server with the default in-memory todo provider.
    pub fn new(config: Config) -> Result<Self, ToolError> {
        Self::with_provider(config, Arc::new(TodoService::new()))
    }

    /// Create a server around an injected domain provider.
    ///
    /// Registration happens here, before any request is served; a duplicate
    /// tool name is a startup failure.
    pub fn with_provider(
        config: Config,
        provider: Arc<dyn TodoProvider>,
    ) -> Result<Self, ToolError> {
        let mut registry = ToolRegistry::new();
        register_all(&mut registry, provider)?;
        info!("Registered {} tools", registry.len());

        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            sessions: Arc::new(SessionManager::new()),
        })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// The session manager owning the id-to-session map.
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Process one request in the context of a session.
    ///
    /// Returns `None` for notifications, which expect no response.
    #[instrument(skip_all, fields(method = %request.method, session = %session.id()))]
    pub async fn process_request(
        &self,
        session: &Arc<Session>,
        request: JsonRpcRequest,
    ) -> Option<JsonRpcResponse> {
        if request.jsonrpc != super::protocol::JSONRPC_VERSION {
            return Some(JsonRpcResponse::invalid_request(request.id));
        }

        if request.is_notification() {
            self.handle_notification(&request);
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request),
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "tools/list" => self.handle_tools_list(request),
            "tools/call" => self.handle_tools_call(session, request).await,
            other => {
                warn!("Unknown method: {}", other);
                JsonRpcResponse::method_not_found(request.id, &request.method)
            }
        };
        Some(response)
    }

    /// Handle the initialization handshake. Session creation itself is the
    /// transport's concern; this builds the capability response.
    fn handle_initialize(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        info!("Processing initialize request");
        let result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": self.name(),
                "version": self.version()
            }
        });
        JsonRpcResponse::success(request.id, result)
    }

    /// Handle tool discovery.
    fn handle_tools_list(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!("Processing tools/list request");
        JsonRpcResponse::success(request.id, json!({ "tools": self.registry.list() }))
    }

    /// Handle a tool invocation.
    async fn handle_tools_call(
        &self,
        session: &Arc<Session>,
        request: JsonRpcRequest,
    ) -> JsonRpcResponse {
        let params = request.params.unwrap_or(Value::Null);
        let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
            return JsonRpcResponse::invalid_params(request.id, "Missing tool name", None);
        };

        let Some(tool) = self.registry.resolve(name) else {
            warn!("Unknown tool requested: {}", name);
            return JsonRpcResponse::error(
                request.id,
                super::protocol::error_codes::METHOD_NOT_FOUND,
                format!("Unknown tool: {}", name),
            );
        };

        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
        let input = match tool.input_schema.validate(&arguments) {
            Ok(input) => input,
            Err(errors) => {
                debug!("Input validation failed for {}: {} errors", name, errors.len());
                let data = serde_json::to_value(&errors).ok();
                return JsonRpcResponse::invalid_params(
                    request.id,
                    format!("Invalid parameters for tool {}", name),
                    data,
                );
            }
        };

        let output = match (tool.handler)(input).await {
            Ok(output) => output,
            Err(ToolError::Execution(msg)) => {
                // Domain failure: reported to the caller, never fatal.
                info!("Tool {} failed: {}", name, msg);
                return JsonRpcResponse::internal_error(request.id, msg);
            }
            Err(e) => {
                error!("Tool {} internal error: {}", name, e);
                return JsonRpcResponse::internal_error(request.id, "Internal error");
            }
        };

        // An output-schema mismatch is a defect in the tool itself: logged
        // in full, detailed to the caller only in debug builds.
        let structured = match tool.output_schema.validate(&output) {
            Ok(structured) => structured,
            Err(errors) => {
                error!(
                    "Tool {} produced output violating its declared schema: {:?}",
                    name, errors
                );
                if cfg!(debug_assertions) {
                    return JsonRpcResponse::error_with_data(
                        request.id,
                        super::protocol::error_codes::INTERNAL_ERROR,
                        format!("Tool {} output does not match its schema", name),
                        serde_json::to_value(&errors).ok(),
                    );
                }
                return JsonRpcResponse::internal_error(request.id, "Internal error");
            }
        };

        if let Some(method) = tool.change_event {
            session.notify(JsonRpcNotification::new(method, Some(json!({ "tool": name }))));
        }

        let text = serde_json::to_string_pretty(&structured).unwrap_or_default();
        let result = json!({
            "content": [{ "type": "text", "text": text }],
            "structuredContent": structured,
        });
        JsonRpcResponse::success(request.id, result)
    }

    /// Handle client-to-server notifications; no response is produced.
    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => {
                info!("Client sent initialized notification");
            }
            other => {
                debug!("Received notification: {}", other);
            }
        }
    }
}
