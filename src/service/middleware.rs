//! Service middleware and metric events.
//!
//! ## Metrics Exposed
//!
//! Logged as `tracing` events under the `friend_graph::metrics` target:
//!
//! - `request` - path, method, status, latency per HTTP request
//! - `expansion` - nodes, edges, remote calls and latency per generated graph
//! - `ws_message` - endpoint, status and latency per websocket message

use std::sync::OnceLock;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::info;

/// Metrics middleware that records request counts and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    info!(
        target: "friend_graph::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request_metric"
    );

    response
}

/// Replace canonical identities in a path with `:id` to bound cardinality.
fn normalize_path(path: &str) -> String {
    static ID: OnceLock<regex_lite::Regex> = OnceLock::new();
    let pattern = ID.get_or_init(|| {
        regex_lite::Regex::new(r"765611[0-9]{11}").expect("identity pattern is valid")
    });
    pattern.replace_all(path, ":id").to_string()
}

/// Record a completed graph generation.
pub fn record_expansion_metrics(node_count: usize, edge_count: usize, remote_calls: u64, latency_ms: u64) {
    info!(
        target: "friend_graph::metrics",
        metric_type = "expansion",
        node_count,
        edge_count,
        remote_calls,
        latency_ms,
        "expansion_metric"
    );
}

/// Record one handled websocket message.
pub fn record_message_metrics(endpoint: &str, ok: bool, latency_ms: u64) {
    let status = if ok { "ok" } else { "error" };
    info!(
        target: "friend_graph::metrics",
        metric_type = "ws_message",
        endpoint,
        status,
        latency_ms,
        "ws_message_metric"
    );
}
