//! Axum routes for the friend graph service.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Json, State,
    },
    http::StatusCode,
    middleware,
    response::Response,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;
use crate::error::GraphError;
use crate::graph::{build_graph, label_index};
use crate::session::{AcquisitionSession, SUPPORTED_DEPTH};
use crate::PROTOCOL_VERSION;

use super::middleware::{metrics_middleware, record_expansion_metrics, record_message_metrics};
use super::state::ServiceState;

// ============================================================================
// Message Types
// ============================================================================

/// Incoming websocket message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage {
    /// Endpoint name.
    #[serde(default)]
    pub endpoint: String,
    /// Identity token the endpoint acts on, if any.
    #[serde(default)]
    pub id: String,
}

/// Outcome flag of a response. Serialized as `0` (ok) or `1` (error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MessageStatus {
    /// Handled successfully.
    Ok,
    /// Handler failed; see `err` and `code`.
    Error,
}

impl From<MessageStatus> for u8 {
    fn from(status: MessageStatus) -> Self {
        match status {
            MessageStatus::Ok => 0,
            MessageStatus::Error => 1,
        }
    }
}

impl TryFrom<u8> for MessageStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, String> {
        match value {
            0 => Ok(Self::Ok),
            1 => Ok(Self::Error),
            other => Err(format!("unknown message status {}", other)),
        }
    }
}

/// Outgoing websocket message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// Echo of the request endpoint.
    pub endpoint: String,
    /// Outcome flag.
    pub status: MessageStatus,
    /// Payload, itself a JSON document encoded as a string (`"pong"` for ping).
    pub data: String,
    /// Error message, empty on success.
    pub err: String,
    /// Machine-readable error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ResponseMessage {
    /// Successful response.
    pub fn ok(endpoint: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            status: MessageStatus::Ok,
            data: data.into(),
            err: String::new(),
            code: None,
        }
    }

    /// Error response.
    pub fn error(endpoint: impl Into<String>, code: impl Into<String>, err: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            status: MessageStatus::Error,
            data: String::new(),
            err: err.into(),
            code: Some(code.into()),
        }
    }

    /// Whether the response reports success.
    pub fn is_ok(&self) -> bool {
        self.status == MessageStatus::Ok
    }
}

/// Failure inside a message handler.
#[derive(Debug, thiserror::Error)]
enum HandlerError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("remote call ceiling of {0} reached")]
    CeilingReached(u64),
}

impl HandlerError {
    fn code(&self) -> &'static str {
        match self {
            Self::Graph(e) => e.code(),
            Self::Encode(_) => "ENCODE_FAILED",
            Self::CeilingReached(_) => "CALL_CEILING_REACHED",
        }
    }
}

/// Payload of `getFriendProfiles`.
#[derive(Debug, Serialize)]
struct FriendProfilesPayload<'a> {
    friends: &'a [crate::types::Profile],
    profile: &'a crate::types::Profile,
}

/// Detailed service health.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` once the call ceiling is reached.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Websocket protocol version.
    pub protocol_version: String,
    /// Remote calls issued since startup.
    pub call_count: u64,
    /// Governor ceiling.
    pub call_ceiling: u64,
    /// Response cache statistics.
    pub response_cache: CacheStats,
    /// Profile cache statistics.
    pub profile_cache: CacheStats,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize)]
pub struct LivenessResponse {
    /// Always `alive`.
    pub status: String,
}

/// Readiness response.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// Whether new expansions are accepted.
    pub ready: bool,
    /// Reason when not ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// ============================================================================
// Message Handlers
// ============================================================================

/// Dispatch one websocket message against a connection's session.
pub async fn handle_message(
    state: &ServiceState,
    session: &AcquisitionSession,
    request: &RequestMessage,
) -> ResponseMessage {
    let endpoint = request.endpoint.as_str();
    let started = Instant::now();

    let result = match endpoint {
        "ping" => Ok("pong".to_string()),
        "generateGraphData" => generate_graph_data(state, session, &request.id).await,
        "generateLabels" => generate_labels(session),
        "getFriendProfiles" => friend_profiles(session, &request.id).await,
        _ => {
            tracing::debug!(endpoint, "Unknown endpoint");
            return ResponseMessage::error(endpoint, "ENDPOINT_NOT_FOUND", "endpoint not found");
        }
    };

    record_message_metrics(endpoint, result.is_ok(), started.elapsed().as_millis() as u64);

    match result {
        Ok(data) => ResponseMessage::ok(endpoint, data),
        Err(e) => {
            tracing::warn!(endpoint, id = %request.id, code = e.code(), error = %e, "Message failed");
            ResponseMessage::error(endpoint, e.code(), e.to_string())
        }
    }
}

async fn generate_graph_data(
    state: &ServiceState,
    session: &AcquisitionSession,
    id: &str,
) -> Result<String, HandlerError> {
    if state.ceiling_reached() {
        return Err(HandlerError::CeilingReached(state.call_ceiling()));
    }

    let started = Instant::now();
    let calls_before = state.client.call_count();

    session.reset();
    let root = session.expand(id, SUPPORTED_DEPTH).await?;
    session.resolve_profiles().await?;
    let graph = build_graph(&session.records(), &root);

    record_expansion_metrics(
        graph.node_count(),
        graph.edge_count(),
        state.client.call_count() - calls_before,
        started.elapsed().as_millis() as u64,
    );

    Ok(serde_json::to_string(&graph)?)
}

fn generate_labels(session: &AcquisitionSession) -> Result<String, HandlerError> {
    let profiles = session.profiles();
    Ok(serde_json::to_string(&label_index(&profiles))?)
}

async fn friend_profiles(session: &AcquisitionSession, id: &str) -> Result<String, HandlerError> {
    let friends_of = session.friends_of(id).await?;
    Ok(serde_json::to_string(&FriendProfilesPayload {
        friends: &friends_of.friends,
        profile: &friends_of.profile,
    })?)
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Upgrade to a websocket carrying the request/response protocol.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<ServiceState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Serve one connection. Each connection owns one session.
async fn handle_socket(mut socket: WebSocket, state: Arc<ServiceState>) {
    let session = AcquisitionSession::new(Arc::clone(&state.client));
    let connection_id = uuid::Uuid::new_v4();
    tracing::info!(%connection_id, "WebSocket connection established");

    while let Some(msg) = socket.recv().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(%connection_id, error = %e, "WebSocket receive failed");
                break;
            }
        };

        let response = match serde_json::from_str::<RequestMessage>(&text) {
            Ok(request) => handle_message(&state, &session, &request).await,
            Err(e) => ResponseMessage::error("", "INVALID_MESSAGE", e.to_string()),
        };

        let body = match serde_json::to_string(&response) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(%connection_id, error = %e, "Failed to serialize response");
                continue;
            }
        };
        if socket.send(Message::Text(body)).await.is_err() {
            break;
        }
    }

    tracing::info!(%connection_id, records = session.len(), "WebSocket connection closed");
}

/// Health check endpoint (detailed).
async fn health_handler(State(state): State<Arc<ServiceState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: if state.ceiling_reached() { "degraded" } else { "healthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        call_count: state.client.call_count(),
        call_ceiling: state.call_ceiling(),
        response_cache: state.client.response_cache_stats(),
        profile_cache: state.client.profile_cache_stats(),
    })
}

/// Liveness check endpoint. Does not check the remote API.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

/// Readiness check endpoint. Returns 503 once the call ceiling is reached.
async fn readiness_handler(
    State(state): State<Arc<ServiceState>>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    if state.ceiling_reached() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                details: Some("Remote call ceiling reached".to_string()),
            }),
        ));
    }
    Ok(Json(ReadinessResponse {
        ready: true,
        details: None,
    }))
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the friend graph service.
pub fn create_router(state: ServiceState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .layer(middleware::from_fn(metrics_middleware))
        .with_state(state)
}
