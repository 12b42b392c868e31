//! Transport-agnostic ingress for sequencer submissions.
//!
//! Any RPC shell (the bundled HTTP server, or another transport) delegates
//! here. Only malformed envelopes are transport errors; book rejections are
//! reported in-band with `success: false` so sequencers can read the reason.

use execbook_book::{BookStats, ExecutionBook};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Envelope-level failures, reported by the transport rather than in-band.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngressError {
    #[error("request cannot be nil")]
    NilRequest,

    #[error("sequencer_id cannot be empty")]
    EmptySequencerId,
}

/// Caller metadata supplied by the transport. Only used for logging.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Remote address or other caller label.
    pub peer: Option<String>,
}

impl RequestContext {
    pub fn from_peer(peer: impl Into<String>) -> Self {
        Self {
            peer: Some(peer.into()),
        }
    }
}

/// A sequencer submission. Byte fields travel as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitSequencerTxRequest {
    #[serde(with = "hex")]
    pub tx_hash: Vec<u8>,
    pub sequence_number: u64,
    #[serde(with = "hex")]
    pub signature: Vec<u8>,
    pub sequencer_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitSequencerTxResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetStatsResponse {
    pub total_transactions: usize,
    pub pending_transactions: usize,
    pub included_transactions: usize,
    pub next_sequence: u64,
    pub current_block_height: u64,
    pub sequencer_count: usize,
}

impl From<BookStats> for GetStatsResponse {
    fn from(stats: BookStats) -> Self {
        Self {
            total_transactions: stats.total,
            pending_transactions: stats.pending,
            included_transactions: stats.included,
            next_sequence: stats.next_sequence,
            current_block_height: stats.current_block_height,
            sequencer_count: stats.sequencer_count,
        }
    }
}

/// Sequencer-facing entry point to an [`ExecutionBook`].
#[derive(Debug, Clone)]
pub struct SequencerIngress {
    book: Arc<ExecutionBook>,
}

impl SequencerIngress {
    pub fn new(book: Arc<ExecutionBook>) -> Self {
        Self { book }
    }

    pub fn book(&self) -> &Arc<ExecutionBook> {
        &self.book
    }

    /// Validate the envelope and submit it to the book.
    pub fn submit_sequencer_tx(
        &self,
        ctx: &RequestContext,
        request: Option<SubmitSequencerTxRequest>,
    ) -> Result<SubmitSequencerTxResponse, IngressError> {
        let request = request.ok_or(IngressError::NilRequest)?;
        if request.sequencer_id.is_empty() {
            return Err(IngressError::EmptySequencerId);
        }

        let result = self.book.submit(
            &request.tx_hash,
            request.sequence_number,
            &request.signature,
            &request.sequencer_id,
        );

        Ok(match result {
            Ok(()) => SubmitSequencerTxResponse {
                success: true,
                message: "transaction submitted successfully".to_string(),
            },
            Err(e) => {
                debug!(
                    peer = ctx.peer.as_deref().unwrap_or("unknown"),
                    sequencer_id = %request.sequencer_id,
                    sequence = request.sequence_number,
                    error = %e,
                    "Sequencer submission rejected"
                );
                SubmitSequencerTxResponse {
                    success: false,
                    message: format!("failed to submit transaction: {e}"),
                }
            }
        })
    }

    pub fn get_stats(&self) -> GetStatsResponse {
        self.book.get_stats().into()
    }

    /// Whether `sequencer_id` is currently registered.
    pub fn is_registered(&self, sequencer_id: &str) -> bool {
        self.book.sequencer_ids().iter().any(|id| id == sequencer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use execbook_book::BookConfig;
    use execbook_test_helpers::{test_tx_hash, TestSequencers};
    use execbook_types::KeyType;

    fn setup() -> (SequencerIngress, TestSequencers) {
        let sequencers = TestSequencers::new(&["seq1"], KeyType::Ed25519, 21);
        let config = BookConfig::default().with_sequencer("seq1", sequencers.public_key("seq1"));
        (
            SequencerIngress::new(Arc::new(ExecutionBook::new(config))),
            sequencers,
        )
    }

    fn request(sequencers: &TestSequencers, label: &str, seq: u64) -> SubmitSequencerTxRequest {
        let sub = sequencers.submission("seq1", test_tx_hash(label), seq);
        SubmitSequencerTxRequest {
            tx_hash: sub.tx_hash.to_bytes().to_vec(),
            sequence_number: seq,
            signature: sub.signature,
            sequencer_id: sub.sequencer_id,
        }
    }

    #[test]
    fn test_envelope_errors() {
        let (ingress, sequencers) = setup();
        let ctx = RequestContext::default();

        assert_eq!(
            ingress.submit_sequencer_tx(&ctx, None),
            Err(IngressError::NilRequest)
        );

        let mut req = request(&sequencers, "tx0", 0);
        req.sequencer_id.clear();
        assert_eq!(
            ingress.submit_sequencer_tx(&ctx, Some(req)),
            Err(IngressError::EmptySequencerId)
        );
        assert_eq!(ingress.get_stats().next_sequence, 0);
    }

    #[test]
    fn test_success_and_in_band_rejection() {
        let (ingress, sequencers) = setup();
        let ctx = RequestContext::from_peer("10.0.0.1:5000");

        let ok = ingress
            .submit_sequencer_tx(&ctx, Some(request(&sequencers, "tx0", 0)))
            .unwrap();
        assert!(ok.success);
        assert_eq!(ok.message, "transaction submitted successfully");

        let rejected = ingress
            .submit_sequencer_tx(&ctx, Some(request(&sequencers, "tx5", 5)))
            .unwrap();
        assert!(!rejected.success);
        assert_eq!(
            rejected.message,
            "failed to submit transaction: sequence number mismatch: expected 1, got 5 (no gaps allowed)"
        );

        let stats = ingress.get_stats();
        assert_eq!(stats.total_transactions, 1);
        assert_eq!(stats.pending_transactions, 1);
        assert_eq!(stats.sequencer_count, 1);
    }

    #[test]
    fn test_request_json_uses_hex() {
        let (_, sequencers) = setup();
        let req = request(&sequencers, "tx0", 0);
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["tx_hash"], test_tx_hash("tx0").to_hex());
        assert_eq!(json["signature"], hex::encode(&req.signature));
        let parsed: SubmitSequencerTxRequest = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, req);
    }

    #[test]
    fn test_is_registered() {
        let (ingress, _) = setup();
        assert!(ingress.is_registered("seq1"));
        assert!(!ingress.is_registered("seq2"));
    }
}
