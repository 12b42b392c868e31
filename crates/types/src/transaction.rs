//! Admitted sequencer transaction record.

use crate::{sequencer_tx_digest, PublicKey, TxHash};
use std::time::SystemTime;

/// Maximum accepted signature length (secp256k1 with recovery id).
pub const MAX_SIGNATURE_LEN: usize = 65;

/// A transaction pre-executed by a sequencer and admitted to the book.
///
/// Records are created on admission, mutated once when included in a block
/// (`included` set, `block_height` overwritten with the inclusion height),
/// and evicted by cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerTransaction {
    /// Hash of the transaction bytes.
    pub tx_hash: TxHash,
    /// Global sequence number assigned by the sequencer.
    pub sequence_number: u64,
    /// Sequencer signature over the canonical digest (1..=65 bytes).
    pub signature: Vec<u8>,
    /// Identifier of the sequencer that signed this entry.
    pub sequencer_id: String,
    /// Wall-clock admission time.
    pub timestamp: SystemTime,
    /// Height current at admission; inclusion height once included.
    pub block_height: u64,
    /// Whether the transaction has been included in a committed block.
    pub included: bool,
}

impl SequencerTransaction {
    /// Check the stored signature against `public_key`.
    pub fn verify_with(&self, public_key: &PublicKey) -> bool {
        public_key.verify(
            &sequencer_tx_digest(&self.tx_hash, self.sequence_number),
            &self.signature,
        )
    }

    /// Whether the record still awaits inclusion.
    pub fn is_pending(&self) -> bool {
        !self.included
    }
}
