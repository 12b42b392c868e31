//! HTTP RPC server for the execution book.
//!
//! - `GET /health` - liveness probe
//! - `POST /api/v1/sequencer/transactions` - submit a sequencer transaction
//! - `GET /api/v1/stats` - book counters
//! - `GET /api/v1/sequencers` - registered sequencer ids
//!
//! Submissions answer `200` with `{"success": bool, "message": ...}` whether
//! or not the book admitted them. Envelope problems (empty body, bad JSON,
//! empty sequencer id) answer `400`, and rate-limited clients get `429`.

mod handlers;
mod rate_limiter;
mod routes;
mod server;
mod state;

pub use rate_limiter::{RateLimitConfig, SubmitRateLimiter};
pub use routes::create_router;
pub use server::{RpcServer, RpcServerConfig, RpcServerError, RpcServerHandle};
pub use state::RpcState;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencersResponse {
    pub sequencers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
