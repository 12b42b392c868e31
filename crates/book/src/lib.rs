//! Execution book for sequencer pre-executed transactions.
//!
//! External sequencers submit transactions they have already ordered and
//! executed. The book admits each one only if it carries a valid signature
//! from a registered sequencer and exactly the next global sequence number,
//! then hands pending entries to the block proposer in admission order.
//!
//! # Lifecycle
//!
//! ```text
//! submit ──► pending ──mark_included──► included ──cleanup──► evicted
//! ```
//!
//! # Example
//!
//! ```rust
//! use execbook_book::{BookConfig, ExecutionBook};
//! use execbook_types::{sign_sequencer_tx, KeyPair, KeyType, TxHash};
//!
//! let key = KeyPair::generate(KeyType::Ed25519);
//! let book = ExecutionBook::new(BookConfig::default().with_sequencer("seq1", key.public_key()));
//!
//! let hash = TxHash::of_bytes(b"tx0");
//! let signature = sign_sequencer_tx(&hash, 0, &key);
//! book.submit(hash.as_bytes(), 0, &signature, "seq1").unwrap();
//!
//! assert_eq!(book.get_next_sequence(), 1);
//! assert_eq!(book.get_ordered_transactions()[0].tx_hash, hash);
//! ```

mod book;
mod config;
mod error;
mod persister;
mod registry;
mod state;

pub use book::ExecutionBook;
pub use config::BookConfig;
pub use error::SubmitError;
pub use registry::{RemovedSequencer, SequencerRegistry};
pub use state::BookStats;
