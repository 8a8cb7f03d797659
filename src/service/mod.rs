//! Friend Graph WebSocket Service
//!
//! Exposes acquisition sessions over a websocket, one session per connection.
//!
//! ## Endpoints
//!
//! - `GET /ws` - Websocket carrying `{endpoint, id}` requests
//!   - `ping` - Liveness over the socket, answers `pong`
//!   - `generateGraphData` - Reset the session, expand one hop, resolve profiles, return the graph
//!   - `generateLabels` - Labels for every profile in the session
//!   - `getFriendProfiles` - Profile of `id` plus its known connections
//! - `GET /health` - Detailed service health check
//! - `GET /health/live` - Liveness check
//! - `GET /health/ready` - Readiness check

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{metrics_middleware, record_expansion_metrics, record_message_metrics};
pub use routes::{create_router, handle_message, MessageStatus, RequestMessage, ResponseMessage};
pub use state::{ServiceState, DEFAULT_CALL_CEILING};
