//! Admission errors.

use execbook_types::{TxHash, MAX_SIGNATURE_LEN};
use thiserror::Error;

/// Why a sequencer submission was rejected.
///
/// A rejected submission never mutates the book.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Transaction hash is not exactly 32 bytes.
    #[error("invalid tx hash length: expected 32 bytes, got {0}")]
    InvalidHashLength(usize),

    /// Signature is empty.
    #[error("signature cannot be empty")]
    EmptySignature,

    /// Signature exceeds the maximum length.
    #[error("signature too long: max {MAX_SIGNATURE_LEN} bytes, got {0}")]
    SignatureTooLong(usize),

    /// Sequencer id is not registered.
    #[error("unknown sequencer: {0}")]
    UnknownSequencer(String),

    /// Signature does not verify under the sequencer's key.
    #[error("invalid sequencer signature for tx {0}")]
    InvalidSignature(TxHash),

    /// Hash is already in the book.
    #[error("transaction {0} already submitted")]
    DuplicateTransaction(TxHash),

    /// Pending records are at capacity.
    #[error("execution book is full: {pending}/{capacity} pending transactions")]
    BookFull {
        /// Records awaiting inclusion.
        pending: usize,
        /// Configured capacity.
        capacity: usize,
    },

    /// Sequence number is not the next expected one.
    #[error("sequence number mismatch: expected {expected}, got {got} (no gaps allowed)")]
    SequenceMismatch {
        /// The book's next sequence number.
        expected: u64,
        /// The submitted sequence number.
        got: u64,
    },
}
