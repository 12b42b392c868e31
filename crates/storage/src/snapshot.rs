//! On-disk snapshot format.
//!
//! ```json
//! {
//!   "transactions": [
//!     {
//!       "tx_hash": "<64 lowercase hex chars>",
//!       "sequence_number": 0,
//!       "signature": "<lowercase hex>",
//!       "sequencer_id": "seq1",
//!       "timestamp": "2025-01-01T00:00:00.000000000Z",
//!       "block_height": 0,
//!       "included": false
//!     }
//!   ],
//!   "next_sequence": 1,
//!   "current_block_height": 0,
//!   "saved_at": "2025-01-01T00:00:00.000000000Z"
//! }
//! ```

use execbook_types::{HexError, SequencerTransaction, TxHash};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use thiserror::Error;

/// A full book snapshot, in admission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// Records in admission order.
    pub transactions: Vec<PersistedTransaction>,
    /// Next sequence number the book expects.
    pub next_sequence: u64,
    /// Last block height announced by the host.
    pub current_block_height: u64,
    /// When the snapshot was taken.
    #[serde(with = "rfc3339")]
    pub saved_at: SystemTime,
}

impl BookSnapshot {
    /// Build a snapshot from book records, stamped with the current time.
    pub fn capture<'a>(
        records: impl IntoIterator<Item = &'a SequencerTransaction>,
        next_sequence: u64,
        current_block_height: u64,
    ) -> Self {
        Self {
            transactions: records.into_iter().map(PersistedTransaction::from).collect(),
            next_sequence,
            current_block_height,
            saved_at: SystemTime::now(),
        }
    }
}

/// Serializable form of a [`SequencerTransaction`].
///
/// Binary fields are lowercase hex without a `0x` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTransaction {
    pub tx_hash: String,
    pub sequence_number: u64,
    pub signature: String,
    pub sequencer_id: String,
    #[serde(with = "rfc3339")]
    pub timestamp: SystemTime,
    pub block_height: u64,
    pub included: bool,
}

impl From<&SequencerTransaction> for PersistedTransaction {
    fn from(tx: &SequencerTransaction) -> Self {
        Self {
            tx_hash: tx.tx_hash.to_hex(),
            sequence_number: tx.sequence_number,
            signature: hex::encode(&tx.signature),
            sequencer_id: tx.sequencer_id.clone(),
            timestamp: tx.timestamp,
            block_height: tx.block_height,
            included: tx.included,
        }
    }
}

impl PersistedTransaction {
    /// Decode back into a book record.
    pub fn decode(&self) -> Result<SequencerTransaction, RecordError> {
        let tx_hash = TxHash::from_hex(&self.tx_hash).map_err(RecordError::TxHash)?;
        let signature =
            hex::decode(&self.signature).map_err(|e| RecordError::Signature(e.to_string()))?;

        Ok(SequencerTransaction {
            tx_hash,
            sequence_number: self.sequence_number,
            signature,
            sequencer_id: self.sequencer_id.clone(),
            timestamp: self.timestamp,
            block_height: self.block_height,
            included: self.included,
        })
    }
}

/// Why a single persisted record could not be restored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("failed to decode tx hash: {0}")]
    TxHash(HexError),

    #[error("failed to decode signature: {0}")]
    Signature(String),
}

/// RFC 3339 timestamps (UTC, nanosecond precision).
mod rfc3339 {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::SystemTime;

    pub fn serialize<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_rfc3339_nanos(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SystemTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        humantime::parse_rfc3339_weak(&s).map_err(serde::de::Error::custom)
    }
}
