//! JSON-RPC protocol envelopes.
//!
//! Wire types shared by the server transport and the client session:
//! requests, responses, notifications, and the protocol error codes used
//! to classify failures before they reach domain code.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC protocol version carried in every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol revision advertised during initialization.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Header carrying the session identifier on every HTTP request.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Header carrying the last delivered event id on stream reconnects.
pub const LAST_EVENT_ID_HEADER: &str = "last-event-id";

/// The designated initialization method name.
pub const INITIALIZE_METHOD: &str = "initialize";

/// Protocol error codes.
pub mod error_codes {
    /// The envelope itself is malformed (bad version, missing method).
    pub const INVALID_REQUEST: i32 = -32600;
    /// Unknown method or unknown tool name.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Parameters failed schema validation.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Handler failure or output-schema mismatch.
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Unknown or expired session identifier on a non-init request.
    pub const INVALID_SESSION: i32 = -32001;
}

/// JSON-RPC request envelope.
///
/// A request without an `id` is a notification: it expects no response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a request with the given correlation id.
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// Create a notification (no id, no response expected).
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: None,
            method: method.into(),
            params,
        }
    }

    /// True when this envelope expects no response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// True only for the designated initialization method.
///
/// The session manager uses this to decide whether a request without a
/// known session identifier may create a new session.
pub fn is_initialize_request(request: &JsonRpcRequest) -> bool {
    request.method == INITIALIZE_METHOD
}

/// JSON-RPC response envelope.
///
/// Exactly one of `result`/`error` is present, never both, and `id` echoes
/// the originating request's id verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self::error_with_data(id, code, message, None)
    }

    /// Create an error response carrying diagnostic data.
    pub fn error_with_data(
        id: Option<Value>,
        code: i32,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data,
            }),
        }
    }

    /// Invalid request error.
    pub fn invalid_request(id: Option<Value>) -> Self {
        Self::error(id, error_codes::INVALID_REQUEST, "Invalid Request")
    }

    /// Method not found error.
    pub fn method_not_found(id: Option<Value>, method: &str) -> Self {
        Self::error(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )
    }

    /// Invalid params error with an optional field-level error list.
    pub fn invalid_params(id: Option<Value>, msg: impl Into<String>, data: Option<Value>) -> Self {
        Self::error_with_data(id, error_codes::INVALID_PARAMS, msg, data)
    }

    /// Internal error.
    pub fn internal_error(id: Option<Value>, msg: impl Into<String>) -> Self {
        Self::error(id, error_codes::INTERNAL_ERROR, msg)
    }

    /// Invalid session error, as returned on non-init requests with an
    /// unknown session identifier. The id is the JSON `null` required by
    /// the wire contract, not an echoed request id.
    pub fn invalid_session() -> Self {
        Self::error(
            Some(Value::Null),
            error_codes::INVALID_SESSION,
            "Invalid or missing session identifier",
        )
    }

    /// True when this response carries a result rather than an error.
    pub fn is_success(&self) -> bool {
        self.result.is_some()
    }
}

/// JSON-RPC notification envelope, delivered unsolicited over an open
/// stream to a specific session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Create a notification.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_notification_detection() {
        let req = JsonRpcRequest::new(1, "tools/list", None);
        assert!(!req.is_notification());

        let note = JsonRpcRequest::notification("notifications/initialized", None);
        assert!(note.is_notification());
    }

    #[test]
    fn test_initialize_detection() {
        let init = JsonRpcRequest::new(1, "initialize", Some(json!({})));
        assert!(is_initialize_request(&init));

        let other = JsonRpcRequest::new(2, "tools/call", None);
        assert!(!is_initialize_request(&other));
    }

    #[test]
    fn test_response_success_shape() {
        let resp = JsonRpcResponse::success(Some(json!(7)), json!({"ok": true}));
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 7);
        assert_eq!(value["result"]["ok"], true);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_response_error_shape() {
        let resp = JsonRpcResponse::method_not_found(Some(json!("abc")), "bogus");
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["id"], "abc");
        assert_eq!(value["error"]["code"], error_codes::METHOD_NOT_FOUND);
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_invalid_session_has_null_id() {
        let resp = JsonRpcResponse::invalid_session();
        let value = serde_json::to_value(&resp).unwrap();
        assert!(value["id"].is_null());
        assert_eq!(value["error"]["code"], error_codes::INVALID_SESSION);
    }

    #[test]
    fn test_request_roundtrip() {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {"name": "todo_list", "arguments": {}}
        });
        let req: JsonRpcRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.method, "tools/call");
        assert_eq!(req.id, Some(json!(3)));
        assert_eq!(req.params.unwrap()["name"], "todo_list");
    }
}
