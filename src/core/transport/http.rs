//! HTTP transport implementation.
//!
//! A single MCP endpoint served by axum:
//!
//! - `POST` carries one request or notification envelope; the session
//!   identifier travels in the `Mcp-Session-Id` header, assigned during
//!   initialization.
//! - `GET` opens the session's SSE stream for server-initiated
//!   notifications, with `Last-Event-ID` accepted as a resumption hint.
//! - `DELETE` terminates the session.
//! - Any other method gets a 405 from axum's method routing.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, instrument, warn};

use crate::core::McpServer;
use crate::core::protocol::{
    JsonRpcRequest, JsonRpcResponse, LAST_EVENT_ID_HEADER, SESSION_HEADER, is_initialize_request,
};
use crate::core::session::{OutboundEvent, Session};

use super::{TransportError, TransportResult, config::HttpConfig};

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

/// Application state shared across HTTP handlers.
#[derive(Clone)]
struct AppState {
    server: McpServer,
    config: HttpConfig,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Build the axum router for this transport.
    pub fn router(config: &HttpConfig, server: McpServer) -> Router {
        let state = AppState {
            server,
            config: config.clone(),
        };

        let mut app = Router::new()
            .route(
                &config.rpc_path,
                post(handle_post).get(handle_get).delete(handle_delete),
            )
            .route("/health", get(health_check))
            .route("/", get(root_handler))
            .with_state(state);

        if config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any);
            app = app.layer(cors);
        }
        app
    }

    /// Run the HTTP transport until shutdown.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let addr = self.address();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;
        self.serve(listener, server).await
    }

    /// Serve on an already-bound listener. Tests use this with port 0.
    pub async fn serve(
        self,
        listener: tokio::net::TcpListener,
        server: McpServer,
    ) -> TransportResult<()> {
        Self::spawn_session_reaper(
            server.sessions().clone(),
            Duration::from_secs(self.config.session_ttl_secs.max(1)),
        );
        let app = Self::router(&self.config, server);

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!(
            "Ready - listening on {} (MCP over HTTP, CORS {})",
            listener.local_addr().map_err(TransportError::IoError)?,
            cors_status
        );
        info!("  → MCP:    POST/GET/DELETE {}", self.config.rpc_path);
        info!("  → Health: GET /health");

        axum::serve(listener, app)
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;
        Ok(())
    }

    /// Periodically close sessions that went idle without an explicit
    /// DELETE, so abandoned clients do not pin state forever.
    fn spawn_session_reaper(sessions: Arc<crate::core::SessionManager>, ttl: Duration) {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(ttl);
            // The first tick fires immediately; skip it.
            tick.tick().await;
            loop {
                tick.tick().await;
                let reaped = sessions.remove_idle(ttl).await;
                if reaped > 0 {
                    debug!("Reaped {} idle sessions", reaped);
                }
            }
        });
    }
}

/// Root handler - provides API info.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": state.server.name(),
        "version": state.server.version(),
        "transport": "HTTP",
        "endpoints": {
            "mcp": state.config.rpc_path,
            "health": "/health"
        },
        "protocol": "JSON-RPC 2.0",
        "documentation": "Send POST requests to the MCP endpoint with JSON-RPC messages"
    }))
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

fn header_value(headers: &HeaderMap, name: &'static str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn accepts_event_stream(headers: &HeaderMap) -> bool {
    header_value(headers, "accept")
        .map(|accept| accept.contains("text/event-stream"))
        .unwrap_or(false)
}

fn invalid_session_response() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(JsonRpcResponse::invalid_session()),
    )
        .into_response()
}

fn with_session_header(mut response: Response, session: &Session) -> Response {
    if let Ok(value) = HeaderValue::from_str(session.id()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(SESSION_HEADER), value);
    }
    response
}

/// Resolve the session for a non-initialization request.
async fn resolve_session(state: &AppState, headers: &HeaderMap) -> Option<Arc<Session>> {
    let id = header_value(headers, SESSION_HEADER)?;
    state.server.sessions().get_active(&id).await
}

/// Handle a POST: one request or notification envelope.
#[instrument(skip_all, fields(method = %request.method))]
async fn handle_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    debug!("Received envelope: {}", request.method);

    let session = if is_initialize_request(&request) {
        // Initialization is the only session-creating path. A known id on
        // an init request routes to the existing session.
        match header_value(&headers, SESSION_HEADER) {
            Some(id) => match state.server.sessions().get_active(&id).await {
                Some(existing) => existing,
                None => state.server.sessions().create().await,
            },
            None => state.server.sessions().create().await,
        }
    } else {
        match resolve_session(&state, &headers).await {
            Some(session) => session,
            None => {
                warn!("Rejecting {}: invalid or missing session", request.method);
                return invalid_session_response();
            }
        }
    };

    let Some(response) = state.server.process_request(&session, request).await else {
        // Notifications are accepted without a response body.
        return with_session_header(StatusCode::ACCEPTED.into_response(), &session);
    };

    let framed = if state.config.enable_streaming && accepts_event_stream(&headers) {
        sse_response(response)
    } else {
        Json(response).into_response()
    };
    with_session_header(framed, &session)
}

/// Frame a single final response as an SSE stream.
fn sse_response(response: JsonRpcResponse) -> Response {
    let data = serde_json::to_string(&response).unwrap_or_default();
    let stream = futures::stream::once(async move {
        Ok::<_, Infallible>(Event::default().event("message").data(data))
    });
    Sse::new(stream).into_response()
}

/// Returns the claimed notification receiver to the session when the SSE
/// stream is dropped, so a reconnecting client can resume.
struct StreamGuard {
    session: Arc<Session>,
    rx: Option<Receiver<OutboundEvent>>,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if let Some(rx) = self.rx.take() {
            self.session.restore_stream(rx);
        }
    }
}

/// Handle a GET: open the session's server-initiated notification stream.
async fn handle_get(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session) = resolve_session(&state, &headers).await else {
        return invalid_session_response();
    };

    if let Some(marker) = header_value(&headers, LAST_EVENT_ID_HEADER) {
        // No replay buffer is retained: delivery resumes from the current
        // point, at-most-once behind the marker.
        debug!(
            "Session {} reconnected with resumption marker {}; starting fresh stream",
            session.id(),
            marker
        );
    }

    let Some(rx) = session.take_stream() else {
        warn!("Session {} already has an open notification stream", session.id());
        return (StatusCode::CONFLICT, "notification stream already open").into_response();
    };
    info!("Session {} opened notification stream", session.id());

    let guard = StreamGuard {
        session: session.clone(),
        rx: Some(rx),
    };
    let stream = futures::stream::unfold(guard, |mut guard| async move {
        let rx = guard.rx.as_mut()?;
        match rx.recv().await {
            Some(event) => {
                let data = serde_json::to_string(&event.notification).unwrap_or_default();
                let sse_event = Event::default()
                    .id(event.id.to_string())
                    .event("message")
                    .data(data);
                Some((Ok::<_, Infallible>(sse_event), guard))
            }
            None => {
                // Session closed: drop the dead receiver instead of
                // re-arming it.
                guard.rx.take();
                None
            }
        }
    });

    with_session_header(
        Sse::new(stream).keep_alive(KeepAlive::default()).into_response(),
        &session,
    )
}

/// Handle a DELETE: explicit session termination.
async fn handle_delete(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match header_value(&headers, SESSION_HEADER) {
        Some(id) if state.server.sessions().remove(&id).await => {
            StatusCode::NO_CONTENT.into_response()
        }
        _ => invalid_session_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::protocol::error_codes;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn test_router() -> Router {
        let config = HttpConfig::default();
        let server = McpServer::new(Config::default()).unwrap();
        HttpTransport::router(&config, server)
    }

    fn post_request(body: Value, session: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json");
        if let Some(id) = session {
            builder = builder.header(SESSION_HEADER, id);
        }
        builder
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn init_body() -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {"protocolVersion": "2024-11-05"}
        })
    }

    #[tokio::test]
    async fn test_initialize_assigns_session_header() {
        let app = test_router();
        let response = app.oneshot(post_request(init_body(), None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        assert!(session_id.is_some());

        let body = body_json(response).await;
        assert_eq!(body["result"]["protocolVersion"], "2024-11-05");
    }

    #[tokio::test]
    async fn test_two_initializations_get_distinct_sessions() {
        let app = test_router();
        let first = app
            .clone()
            .oneshot(post_request(init_body(), None))
            .await
            .unwrap();
        let second = app.oneshot(post_request(init_body(), None)).await.unwrap();

        let id_a = first.headers().get(SESSION_HEADER).unwrap().clone();
        let id_b = second.headers().get(SESSION_HEADER).unwrap().clone();
        assert_ne!(id_a, id_b);
    }

    #[tokio::test]
    async fn test_non_init_without_session_is_400() {
        let app = test_router();
        let body = json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"});
        let response = app.oneshot(post_request(body, None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], error_codes::INVALID_SESSION);
        assert!(body["id"].is_null());
    }

    #[tokio::test]
    async fn test_non_init_with_unknown_session_is_400() {
        let app = test_router();
        let body = json!({"jsonrpc": "2.0", "id": 3, "method": "tools/list"});
        let response = app
            .oneshot(post_request(body, Some("bogus-session")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_known_session_routes_to_dispatch() {
        let app = test_router();
        let init = app
            .clone()
            .oneshot(post_request(init_body(), None))
            .await
            .unwrap();
        let session = init
            .headers()
            .get(SESSION_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        let body = json!({"jsonrpc": "2.0", "id": 4, "method": "tools/list"});
        let response = app
            .oneshot(post_request(body, Some(&session)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_notification_accepted_with_202() {
        let app = test_router();
        let init = app
            .clone()
            .oneshot(post_request(init_body(), None))
            .await
            .unwrap();
        let session = init
            .headers()
            .get(SESSION_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        let note = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        let response = app
            .oneshot(post_request(note, Some(&session)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_delete_terminates_session() {
        let app = test_router();
        let init = app
            .clone()
            .oneshot(post_request(init_body(), None))
            .await
            .unwrap();
        let session = init
            .headers()
            .get(SESSION_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        let delete = Request::builder()
            .method("DELETE")
            .uri("/mcp")
            .header(SESSION_HEADER, &session)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        // The identifier is now unknown.
        let body = json!({"jsonrpc": "2.0", "id": 5, "method": "tools/list"});
        let response = app
            .oneshot(post_request(body, Some(&session)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_without_session_is_400() {
        let app = test_router();
        let delete = Request::builder()
            .method("DELETE")
            .uri("/mcp")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_other_methods_are_405() {
        let app = test_router();
        let put = Request::builder()
            .method("PUT")
            .uri("/mcp")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(put).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_get_without_session_is_400() {
        let app = test_router();
        let get = Request::builder()
            .method("GET")
            .uri("/mcp")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(get).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_opens_stream_once() {
        let config = HttpConfig::default();
        let server = McpServer::new(Config::default()).unwrap();
        let session = server.sessions().create().await;
        let app = HttpTransport::router(&config, server);

        let open = |app: Router| {
            let id = session.id().to_string();
            async move {
                app.oneshot(
                    Request::builder()
                        .method("GET")
                        .uri("/mcp")
                        .header(SESSION_HEADER, id)
                        .header("accept", "text/event-stream")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap()
            }
        };

        let first = open(app.clone()).await;
        assert_eq!(first.status(), StatusCode::OK);
        assert!(
            first
                .headers()
                .get("content-type")
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("text/event-stream")
        );

        let second = open(app).await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_streaming_post_framed_as_sse() {
        let config = HttpConfig {
            enable_streaming: true,
            ..HttpConfig::default()
        };
        let server = McpServer::new(Config::default()).unwrap();
        let app = HttpTransport::router(&config, server);

        let init = app
            .clone()
            .oneshot(post_request(init_body(), None))
            .await
            .unwrap();
        let session = init
            .headers()
            .get(SESSION_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        let body = json!({"jsonrpc": "2.0", "id": 6, "method": "ping"});
        let mut request = post_request(body, Some(&session));
        request
            .headers_mut()
            .insert("accept", HeaderValue::from_static("text/event-stream"));

        let response = app.oneshot(request).await.unwrap();
        assert!(
            response
                .headers()
                .get("content-type")
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("text/event-stream")
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("data:"));
        assert!(text.contains("\"id\":6"));
    }
}
