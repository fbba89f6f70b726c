//! Client session for the MCP HTTP transport.
//!
//! [`ClientSession`] performs the initialization handshake, captures the
//! session identifier from the `Mcp-Session-Id` response header, and
//! attaches it to every subsequent request through per-request header
//! configuration. Tool calls are unary request/response pairs correlated
//! by id; server-initiated notifications arrive over the session's SSE
//! stream and are handed to registered listeners in arrival order.

use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::core::protocol::{
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, LAST_EVENT_ID_HEADER, SESSION_HEADER,
};

/// Default bounded wait for a correlated response.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors surfaced to calling code by the client session.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP-level failure (connect refused, socket error, bad body).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The session was closed locally; pending and subsequent calls fail.
    #[error("Connection closed")]
    ConnectionClosed,

    /// No correlated response arrived within the bounded wait. Never
    /// retried automatically.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The server returned a protocol error envelope.
    #[error("Server error {code}: {message}")]
    Rpc {
        code: i32,
        message: String,
        data: Option<Value>,
    },

    /// The wire exchange violated the protocol contract.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The initialize response carried no session identifier.
    #[error("Missing session identifier in initialize response")]
    MissingSession,
}

/// Callback invoked for each inbound notification, in arrival order.
pub type NotificationHandler = Box<dyn Fn(JsonRpcNotification) + Send + Sync>;

/// Result of a tool invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Human-readable content blocks.
    #[serde(default)]
    pub content: Vec<Value>,

    /// The structured payload conforming to the tool's output schema.
    #[serde(default)]
    pub structured_content: Option<Value>,
}

/// A connected client session.
pub struct ClientSession {
    http: reqwest::Client,
    url: String,
    session_id: String,
    next_id: AtomicI64,
    call_timeout: Duration,
    handlers: Arc<StdMutex<Vec<NotificationHandler>>>,
    closed: Arc<AtomicBool>,
    // Flipped to true by close(); in-flight calls select against it so
    // they fail promptly instead of waiting out their timeout.
    close_signal: watch::Sender<bool>,
    reader: StdMutex<Option<JoinHandle<()>>>,
}

impl ClientSession {
    /// Connect to an MCP endpoint with the default call timeout.
    pub async fn connect(url: impl Into<String>) -> Result<Self, ClientError> {
        Self::connect_with_timeout(url, DEFAULT_CALL_TIMEOUT).await
    }

    /// Connect to an MCP endpoint with an explicit call timeout.
    ///
    /// Performs the initialization handshake and spawns the notification
    /// reader for the session's server-initiated stream.
    pub async fn connect_with_timeout(
        url: impl Into<String>,
        call_timeout: Duration,
    ) -> Result<Self, ClientError> {
        let url = url.into();
        let http = reqwest::Client::new();

        let init = JsonRpcRequest::new(
            1,
            "initialize",
            Some(json!({
                "protocolVersion": crate::core::protocol::PROTOCOL_VERSION,
                "clientInfo": {
                    "name": "todo-mcp-client",
                    "version": env!("CARGO_PKG_VERSION")
                }
            })),
        );
        let reply = tokio::time::timeout(call_timeout, post_envelope(&http, &url, None, &init))
            .await
            .map_err(|_| ClientError::Timeout(call_timeout))??;

        let session_id = reply.session_id.ok_or(ClientError::MissingSession)?;
        let response = reply.response.ok_or_else(|| {
            ClientError::Protocol("initialize produced no response envelope".into())
        })?;
        check_rpc(response)?;
        debug!("Connected with session {}", session_id);

        let (close_signal, _) = watch::channel(false);
        let session = Self {
            http,
            url,
            session_id,
            next_id: AtomicI64::new(2),
            call_timeout,
            handlers: Arc::new(StdMutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
            close_signal,
            reader: StdMutex::new(None),
        };

        // The server acknowledges with 202 and no envelope.
        let initialized = JsonRpcRequest::notification("notifications/initialized", None);
        tokio::time::timeout(
            call_timeout,
            post_envelope(
                &session.http,
                &session.url,
                Some(&session.session_id),
                &initialized,
            ),
        )
        .await
        .map_err(|_| ClientError::Timeout(call_timeout))??;

        let reader = session.spawn_reader();
        *session
            .reader
            .lock()
            .expect("client reader lock poisoned") = Some(reader);
        Ok(session)
    }

    /// The session identifier assigned by the server.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Register a callback for inbound notifications. Callbacks run on the
    /// reader task, in arrival order, never reordered.
    pub fn on_notification(&self, handler: impl Fn(JsonRpcNotification) + Send + Sync + 'static) {
        self.handlers
            .lock()
            .expect("client handlers lock poisoned")
            .push(Box::new(handler));
    }

    /// List the tools exposed by the server.
    pub async fn list_tools(&self) -> Result<Vec<Value>, ClientError> {
        let result = self.request("tools/list", None).await?;
        let tools = result
            .get("tools")
            .and_then(|v| v.as_array())
            .cloned()
            .ok_or_else(|| ClientError::Protocol("tools/list result missing tools".into()))?;
        Ok(tools)
    }

    /// Invoke a tool and await its correlated result.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallResult, ClientError> {
        let params = json!({ "name": name, "arguments": arguments });
        let result = self.request("tools/call", Some(params)).await?;
        serde_json::from_value(result)
            .map_err(|e| ClientError::Protocol(format!("malformed tool result: {}", e)))
    }

    /// Send one request and await the correlated response within the
    /// bounded wait. Responses are matched by id, not arrival order.
    /// Closing the session mid-flight fails the pending call with
    /// [`ClientError::ConnectionClosed`] rather than waiting out the
    /// timeout.
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::ConnectionClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(id, method, params);

        let mut close_signal = self.close_signal.subscribe();
        let reply = tokio::select! {
            _ = close_signal.wait_for(|closed| *closed) => {
                return Err(ClientError::ConnectionClosed);
            }
            outcome = tokio::time::timeout(
                self.call_timeout,
                post_envelope(&self.http, &self.url, Some(&self.session_id), &request),
            ) => outcome.map_err(|_| ClientError::Timeout(self.call_timeout))??,
        };

        // Notifications interleaved into a streaming response are handed
        // to the listeners before the final response resolves.
        for note in reply.notifications {
            self.dispatch(note);
        }

        let response = reply
            .response
            .ok_or_else(|| ClientError::Protocol("no response envelope received".into()))?;
        if response.id != Some(json!(id)) {
            return Err(ClientError::Protocol(format!(
                "response id {:?} does not match request id {}",
                response.id, id
            )));
        }
        check_rpc(response)
    }

    fn dispatch(&self, notification: JsonRpcNotification) {
        let handlers = self
            .handlers
            .lock()
            .expect("client handlers lock poisoned");
        for handler in handlers.iter() {
            handler(notification.clone());
        }
    }

    /// Spawn the reader for the server-initiated notification stream,
    /// reconnecting with the last delivered event id as resumption marker.
    fn spawn_reader(&self) -> JoinHandle<()> {
        let http = self.http.clone();
        let url = self.url.clone();
        let session_id = self.session_id.clone();
        let handlers = self.handlers.clone();
        let closed = self.closed.clone();

        tokio::spawn(async move {
            let mut last_event_id: Option<String> = None;
            while !closed.load(Ordering::SeqCst) {
                let mut builder = http
                    .get(&url)
                    .header(SESSION_HEADER, &session_id)
                    .header("accept", "text/event-stream");
                if let Some(marker) = &last_event_id {
                    builder = builder.header(LAST_EVENT_ID_HEADER, marker);
                }

                let response = match builder.send().await {
                    Ok(response) => response,
                    Err(e) => {
                        if closed.load(Ordering::SeqCst) {
                            break;
                        }
                        debug!("Notification stream connect failed: {}", e);
                        tokio::time::sleep(Duration::from_millis(250)).await;
                        continue;
                    }
                };

                if response.status() == reqwest::StatusCode::BAD_REQUEST {
                    // Session is gone; nothing to resume.
                    debug!("Notification stream rejected: session invalid");
                    break;
                }
                if !response.status().is_success() {
                    tokio::time::sleep(Duration::from_millis(250)).await;
                    continue;
                }

                let mut parser = SseParser::new();
                let mut stream = response.bytes_stream();
                while let Some(chunk) = stream.next().await {
                    let Ok(bytes) = chunk else { break };
                    for event in parser.feed(&bytes) {
                        if let Some(id) = event.id {
                            last_event_id = Some(id);
                        }
                        match serde_json::from_str::<JsonRpcNotification>(&event.data) {
                            Ok(note) => {
                                let handlers =
                                    handlers.lock().expect("client handlers lock poisoned");
                                for handler in handlers.iter() {
                                    handler(note.clone());
                                }
                            }
                            Err(_) => {
                                warn!("Ignoring non-notification stream payload");
                            }
                        }
                    }
                }

                if !closed.load(Ordering::SeqCst) {
                    tokio::time::sleep(Duration::from_millis(250)).await;
                }
            }
        })
    }

    /// Close the session: terminate it server-side and release local
    /// resources. Idempotent; pending and later calls fail with
    /// [`ClientError::ConnectionClosed`].
    pub async fn close(&self) -> Result<(), ClientError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let _ = self.close_signal.send(true);

        if let Some(reader) = self
            .reader
            .lock()
            .expect("client reader lock poisoned")
            .take()
        {
            reader.abort();
        }

        // Best-effort termination; the server also cleans up on its own.
        let result = self
            .http
            .delete(&self.url)
            .header(SESSION_HEADER, &self.session_id)
            .send()
            .await;
        if let Err(e) = result {
            debug!("Session termination request failed: {}", e);
        }
        Ok(())
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.close_signal.send(true);
        if let Some(reader) = self
            .reader
            .lock()
            .ok()
            .and_then(|mut guard| guard.take())
        {
            reader.abort();
        }
    }
}

/// What one POST exchange yielded: the final response, any notifications
/// interleaved before it, and the session header if present.
struct HttpReply {
    session_id: Option<String>,
    response: Option<JsonRpcResponse>,
    notifications: Vec<JsonRpcNotification>,
}

async fn post_envelope(
    http: &reqwest::Client,
    url: &str,
    session_id: Option<&str>,
    request: &JsonRpcRequest,
) -> Result<HttpReply, ClientError> {
    let mut builder = http
        .post(url)
        .header("accept", "application/json, text/event-stream")
        .json(request);
    if let Some(id) = session_id {
        builder = builder.header(SESSION_HEADER, id);
    }

    let response = builder.send().await?;
    let session_id = response
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let status = response.status();

    // 202 acknowledges a notification; there is no envelope to read.
    if status == reqwest::StatusCode::ACCEPTED {
        return Ok(HttpReply {
            session_id,
            response: None,
            notifications: Vec::new(),
        });
    }

    if content_type.starts_with("text/event-stream") {
        let body = response.text().await?;
        let mut parser = SseParser::new();
        let mut events = parser.feed(body.as_bytes());
        events.extend(parser.flush());

        let mut final_response = None;
        let mut notifications = Vec::new();
        for event in events {
            if let Ok(note) = serde_json::from_str::<JsonRpcNotification>(&event.data) {
                notifications.push(note);
            } else if let Ok(resp) = serde_json::from_str::<JsonRpcResponse>(&event.data) {
                final_response = Some(resp);
            }
        }
        return Ok(HttpReply {
            session_id,
            response: final_response,
            notifications,
        });
    }

    let envelope: JsonRpcResponse = response.json().await?;
    Ok(HttpReply {
        session_id,
        response: Some(envelope),
        notifications: Vec::new(),
    })
}

/// Unwrap a response envelope into its result, or the server's error.
fn check_rpc(response: JsonRpcResponse) -> Result<Value, ClientError> {
    if let Some(error) = response.error {
        return Err(ClientError::Rpc {
            code: error.code,
            message: error.message,
            data: error.data,
        });
    }
    response
        .result
        .ok_or_else(|| ClientError::Protocol("response carries neither result nor error".into()))
}

/// One parsed server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SseEvent {
    id: Option<String>,
    data: String,
}

/// Incremental SSE parser over arbitrary byte chunks.
///
/// Buffers raw bytes and decodes only at event boundaries, so a multi-byte
/// UTF-8 character split across chunks survives intact.
#[derive(Debug, Default)]
struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every complete event it finished.
    fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(boundary) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..boundary + 2).collect();
            if let Some(event) = parse_event_block(&String::from_utf8_lossy(&block)) {
                events.push(event);
            }
        }
        events
    }

    /// Parse whatever remains as a final, unterminated event.
    fn flush(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        parse_event_block(&String::from_utf8_lossy(&rest))
    }
}

fn parse_event_block(block: &str) -> Option<SseEvent> {
    let mut id = None;
    let mut data_lines = Vec::new();
    for line in block.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        } else if let Some(rest) = line.strip_prefix("id:") {
            id = Some(rest.trim().to_string());
        }
        // "event:" lines and ":" keep-alive comments carry no payload.
    }
    if data_lines.is_empty() {
        return None;
    }
    Some(SseEvent {
        id,
        data: data_lines.join("\n"),
    })
}


#[cfg(test)]
mod parser_tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"id: 1\nevent: message\ndata: {\"a\":1}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id.as_deref(), Some("1"));
        assert_eq!(events[0].data, "{\"a\":1}");
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: {\"a\"").is_empty());
        let events = parser.feed(b":1}\n\ndata: {\"b\":2}\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "{\"a\":1}");
        assert_eq!(events[1].data, "{\"b\":2}");
    }

    #[test]
    fn test_keep_alive_comments_ignored() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b": keep-alive\n\n").is_empty());
    }

    #[test]
    fn test_flush_unterminated_event() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: tail").is_empty());
        let event = parser.flush().unwrap();
        assert_eq!(event.data, "tail");
    }

    #[test]
    fn test_multi_line_data_joined() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: line1\ndata: line2\n\n");
        assert_eq!(events[0].data, "line1\nline2");
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let payload = "data: {\"text\":\"héllo\"}\n\n".as_bytes();
        // Split inside the two-byte 'é'.
        let (head, tail) = payload.split_at(17);

        let mut parser = SseParser::new();
        assert!(parser.feed(head).is_empty());
        let events = parser.feed(tail);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"text\":\"héllo\"}");
    }
}
