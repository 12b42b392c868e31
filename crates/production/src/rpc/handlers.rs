//! HTTP request handlers for the RPC API.

use super::state::RpcState;
use super::{ErrorResponse, HealthResponse, SequencersResponse};
use crate::{RequestContext, SubmitSequencerTxRequest};
use axum::{
    body::to_bytes,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::net::SocketAddr;
use tracing::warn;

/// Largest accepted submission body. A request is two short hex strings.
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Handler for `GET /health` - liveness probe.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Handler for `POST /api/v1/sequencer/transactions`.
///
/// An empty or `null` body is a nil request. The body is read by hand rather
/// than with the `Json` extractor so that case reaches the ingress.
pub async fn submit_handler(State(state): State<RpcState>, request: Request) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let body = match to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("failed to read body: {e}")),
    };

    let submission = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        match serde_json::from_slice::<Option<SubmitSequencerTxRequest>>(&body) {
            Ok(submission) => submission,
            Err(e) => {
                return error_response(StatusCode::BAD_REQUEST, format!("invalid request: {e}"))
            }
        }
    };

    if let Some(addr) = peer {
        let registered = submission
            .as_ref()
            .is_some_and(|s| state.ingress.is_registered(&s.sequencer_id));
        if !state.rate_limiter.lock().check(addr.ip(), registered) {
            warn!(peer = %addr, registered, "Sequencer submission rate limited");
            return error_response(StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded".to_string());
        }
    }

    let ctx = peer
        .map(|addr| RequestContext::from_peer(addr.to_string()))
        .unwrap_or_default();
    match state.ingress.submit_sequencer_tx(&ctx, submission) {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

/// Handler for `GET /api/v1/stats`.
pub async fn stats_handler(State(state): State<RpcState>) -> impl IntoResponse {
    Json(state.ingress.get_stats())
}

/// Handler for `GET /api/v1/sequencers`.
pub async fn sequencers_handler(State(state): State<RpcState>) -> impl IntoResponse {
    Json(SequencersResponse {
        sequencers: state.ingress.book().sequencer_ids(),
    })
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}
