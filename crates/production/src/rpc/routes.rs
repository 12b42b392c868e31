//! Route configuration for the RPC API.

use super::handlers::*;
use super::state::RpcState;
use axum::{
    routing::{get, post},
    Router,
};

/// Create the full router with all RPC routes.
pub fn create_router(state: RpcState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1", api_v1_routes())
        .with_state(state)
}

fn api_v1_routes() -> Router<RpcState> {
    Router::new()
        .route("/sequencer/transactions", post(submit_handler))
        .route("/stats", get(stats_handler))
        .route("/sequencers", get(sequencers_handler))
}
