//! Shared state for RPC handlers.

use super::{RateLimitConfig, SubmitRateLimiter};
use crate::SequencerIngress;
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared state for RPC handlers.
#[derive(Clone)]
pub struct RpcState {
    pub ingress: SequencerIngress,
    pub rate_limiter: Arc<Mutex<SubmitRateLimiter>>,
}

impl RpcState {
    pub fn new(ingress: SequencerIngress, rate_limit: RateLimitConfig) -> Self {
        Self {
            ingress,
            rate_limiter: Arc::new(Mutex::new(SubmitRateLimiter::new(rate_limit))),
        }
    }
}
