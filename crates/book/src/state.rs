//! Book state guarded by the execution book's lock.
//!
//! `BookState` is plain data with no synchronization or I/O. The
//! [`ExecutionBook`](crate::ExecutionBook) wraps it in a single readers-writer
//! lock and schedules saves after mutations.

use crate::{RemovedSequencer, SequencerRegistry, SubmitError};
use execbook_storage::{BookSnapshot, LoadedState};
use execbook_types::{
    sequencer_tx_digest, PublicKey, SequencerTransaction, TxHash, MAX_SIGNATURE_LEN,
};
use std::collections::HashMap;
use std::time::SystemTime;
use tracing::error;

/// Point-in-time counters for an execution book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookStats {
    /// Records in the book, pending or included.
    pub total: usize,
    pub pending: usize,
    /// Records marked included but not yet cleaned up.
    pub included: usize,
    pub next_sequence: u64,
    pub current_block_height: u64,
    pub sequencer_count: usize,
}

#[derive(Debug)]
pub(crate) struct BookState {
    transactions: HashMap<TxHash, SequencerTransaction>,
    /// Admission order. Always holds exactly the keys of `transactions`.
    order: Vec<TxHash>,
    next_sequence: u64,
    current_block_height: u64,
    /// `None` means unlimited.
    capacity: Option<usize>,
    /// Records with `included == false`.
    pending: usize,
    registry: SequencerRegistry,
}

impl BookState {
    pub(crate) fn new(registry: SequencerRegistry, capacity: Option<usize>) -> Self {
        Self {
            transactions: HashMap::new(),
            order: Vec::new(),
            next_sequence: 0,
            current_block_height: 0,
            capacity,
            pending: 0,
            registry,
        }
    }

    /// Run the admission checks and, if all pass, append the record.
    ///
    /// Checks run in a fixed order: shape (hash length, signature bounds),
    /// sequencer lookup, signature, duplicate, capacity, sequence. Nothing is
    /// mutated unless every check passes.
    pub(crate) fn admit(
        &mut self,
        tx_hash: &[u8],
        sequence_number: u64,
        signature: &[u8],
        sequencer_id: &str,
        now: SystemTime,
    ) -> Result<TxHash, SubmitError> {
        let hash =
            TxHash::from_slice(tx_hash).ok_or(SubmitError::InvalidHashLength(tx_hash.len()))?;
        if signature.is_empty() {
            return Err(SubmitError::EmptySignature);
        }
        if signature.len() > MAX_SIGNATURE_LEN {
            return Err(SubmitError::SignatureTooLong(signature.len()));
        }

        let public_key = self
            .registry
            .get(sequencer_id)
            .ok_or_else(|| SubmitError::UnknownSequencer(sequencer_id.to_string()))?;
        if !public_key.verify(&sequencer_tx_digest(&hash, sequence_number), signature) {
            return Err(SubmitError::InvalidSignature(hash));
        }

        if self.transactions.contains_key(&hash) {
            return Err(SubmitError::DuplicateTransaction(hash));
        }
        if let Some(capacity) = self.capacity {
            if self.pending >= capacity {
                return Err(SubmitError::BookFull {
                    pending: self.pending,
                    capacity,
                });
            }
        }
        if sequence_number != self.next_sequence {
            return Err(SubmitError::SequenceMismatch {
                expected: self.next_sequence,
                got: sequence_number,
            });
        }

        let record = SequencerTransaction {
            tx_hash: hash,
            sequence_number,
            signature: signature.to_vec(),
            sequencer_id: sequencer_id.to_string(),
            timestamp: now,
            block_height: self.current_block_height,
            included: false,
        };
        self.transactions.insert(hash, record);
        self.order.push(hash);
        self.pending += 1;
        self.next_sequence += 1;
        Ok(hash)
    }

    /// Pending records in admission order.
    pub(crate) fn ordered_pending(&self) -> Vec<SequencerTransaction> {
        self.order
            .iter()
            .filter_map(|hash| self.transactions.get(hash))
            .filter(|tx| tx.is_pending())
            .cloned()
            .collect()
    }

    /// Flag known hashes as included at `block_height`.
    ///
    /// Returns the hashes that were found. Unknown or malformed hashes are
    /// ignored.
    pub(crate) fn mark_included<I, H>(&mut self, tx_hashes: I, block_height: u64) -> Vec<TxHash>
    where
        I: IntoIterator<Item = H>,
        H: AsRef<[u8]>,
    {
        let mut marked = Vec::new();
        for raw in tx_hashes {
            let Some(hash) = TxHash::from_slice(raw.as_ref()) else {
                continue;
            };
            if let Some(tx) = self.transactions.get_mut(&hash) {
                if !tx.included {
                    tx.included = true;
                    self.pending -= 1;
                }
                tx.block_height = block_height;
                marked.push(hash);
            }
        }
        marked
    }

    /// Evict every included record. Returns how many were removed.
    pub(crate) fn cleanup_included(&mut self) -> usize {
        let before = self.transactions.len();
        self.transactions.retain(|_, tx| tx.is_pending());
        let transactions = &self.transactions;
        self.order.retain(|hash| transactions.contains_key(hash));
        before - self.transactions.len()
    }

    pub(crate) fn set_block_height(&mut self, block_height: u64) {
        self.current_block_height = block_height;
    }

    pub(crate) fn get(&self, tx_hash: &[u8]) -> Option<&SequencerTransaction> {
        TxHash::from_slice(tx_hash).and_then(|hash| self.transactions.get(&hash))
    }

    pub(crate) fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending
    }

    pub(crate) fn stats(&self) -> BookStats {
        BookStats {
            total: self.transactions.len(),
            pending: self.pending,
            included: self.transactions.len() - self.pending,
            next_sequence: self.next_sequence,
            current_block_height: self.current_block_height,
            sequencer_count: self.registry.len(),
        }
    }

    pub(crate) fn registry(&self) -> &SequencerRegistry {
        &self.registry
    }

    pub(crate) fn add_sequencer(&mut self, id: String, public_key: PublicKey) -> Option<PublicKey> {
        self.registry.insert(id, public_key)
    }

    pub(crate) fn remove_sequencer(&mut self, id: &str) -> Option<RemovedSequencer> {
        let public_key = self.registry.remove(id)?;
        let retained_records = self
            .transactions
            .values()
            .filter(|tx| tx.sequencer_id == id)
            .count();
        Some(RemovedSequencer {
            public_key,
            retained_records,
        })
    }

    /// Replace records and counters with a loaded snapshot.
    ///
    /// The registry and capacity are kept. Records are trusted as persisted;
    /// a hash appearing twice keeps its first occurrence.
    pub(crate) fn restore(&mut self, loaded: LoadedState) {
        self.transactions.clear();
        self.order.clear();
        self.pending = 0;

        for tx in loaded.transactions {
            if self.transactions.contains_key(&tx.tx_hash) {
                error!(
                    tx_hash = %tx.tx_hash,
                    sequence = tx.sequence_number,
                    "Skipping duplicate persisted transaction"
                );
                continue;
            }
            if tx.is_pending() {
                self.pending += 1;
            }
            self.order.push(tx.tx_hash);
            self.transactions.insert(tx.tx_hash, tx);
        }

        self.next_sequence = loaded.next_sequence;
        self.current_block_height = loaded.current_block_height;
    }

    /// Capture the state for persistence, in admission order.
    pub(crate) fn snapshot(&self) -> BookSnapshot {
        BookSnapshot::capture(
            self.order.iter().filter_map(|hash| self.transactions.get(hash)),
            self.next_sequence,
            self.current_block_height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use execbook_test_helpers::{test_tx_hash, TestSequencers};
    use execbook_types::KeyType;

    fn setup(capacity: Option<usize>) -> (BookState, TestSequencers) {
        let sequencers = TestSequencers::new(&["seq1", "seq2"], KeyType::Ed25519, 7);
        let registry = SequencerRegistry::new(sequencers.registry_entries().into_iter().collect());
        (BookState::new(registry, capacity), sequencers)
    }

    fn admit_n(state: &mut BookState, sequencers: &TestSequencers, n: u64) {
        for sub in sequencers.numbered_submissions("seq1", state.next_sequence(), n) {
            state
                .admit(
                    sub.tx_hash.as_ref(),
                    sub.sequence_number,
                    &sub.signature,
                    &sub.sequencer_id,
                    SystemTime::now(),
                )
                .unwrap();
        }
    }

    #[test]
    fn test_shape_checks_precede_registry_lookup() {
        let (mut state, _) = setup(None);
        let now = SystemTime::now();

        assert_eq!(
            state.admit(&[0u8; 31], 0, &[1], "nobody", now),
            Err(SubmitError::InvalidHashLength(31))
        );
        assert_eq!(
            state.admit(&[0u8; 32], 0, &[], "nobody", now),
            Err(SubmitError::EmptySignature)
        );
        assert_eq!(
            state.admit(&[0u8; 32], 0, &[1; 66], "nobody", now),
            Err(SubmitError::SignatureTooLong(66))
        );
        assert_eq!(
            state.admit(&[0u8; 32], 0, &[1; 64], "nobody", now),
            Err(SubmitError::UnknownSequencer("nobody".into()))
        );
    }

    #[test]
    fn test_duplicate_reported_before_capacity_and_sequence() {
        let (mut state, sequencers) = setup(Some(1));
        admit_n(&mut state, &sequencers, 1);

        // Same hash re-signed at a later sequence on a full book.
        let sub = sequencers.submission("seq1", test_tx_hash("tx0"), 9);
        assert_eq!(
            state.admit(sub.tx_hash.as_ref(), 9, &sub.signature, "seq1", SystemTime::now()),
            Err(SubmitError::DuplicateTransaction(sub.tx_hash))
        );
    }

    #[test]
    fn test_capacity_reported_before_sequence() {
        let (mut state, sequencers) = setup(Some(1));
        admit_n(&mut state, &sequencers, 1);

        let sub = sequencers.submission("seq1", test_tx_hash("late"), 42);
        assert_eq!(
            state.admit(sub.tx_hash.as_ref(), 42, &sub.signature, "seq1", SystemTime::now()),
            Err(SubmitError::BookFull {
                pending: 1,
                capacity: 1
            })
        );
    }

    #[test]
    fn test_rejection_leaves_state_untouched() {
        let (mut state, sequencers) = setup(None);
        admit_n(&mut state, &sequencers, 2);
        let before = state.stats();

        let sub = sequencers.submission("seq1", test_tx_hash("gap"), 5);
        assert!(state
            .admit(sub.tx_hash.as_ref(), 5, &sub.signature, "seq1", SystemTime::now())
            .is_err());

        assert_eq!(state.stats(), before);
        assert!(state.get(sub.tx_hash.as_ref()).is_none());
    }

    #[test]
    fn test_admitted_record_takes_current_height() {
        let (mut state, sequencers) = setup(None);
        state.set_block_height(17);
        admit_n(&mut state, &sequencers, 1);

        let tx = state.get(test_tx_hash("tx0").as_ref()).unwrap();
        assert_eq!(tx.block_height, 17);
        assert!(!tx.included);
        assert!(tx.verify_with(&sequencers.public_key("seq1")));
    }

    #[test]
    fn test_mark_included_tracks_pending_and_ignores_unknown() {
        let (mut state, sequencers) = setup(None);
        admit_n(&mut state, &sequencers, 3);

        let tx1 = test_tx_hash("tx1");
        let marked = state.mark_included([tx1.as_ref(), &[9u8; 32][..], &[1, 2, 3][..]], 50);
        assert_eq!(marked, vec![tx1]);
        assert_eq!(state.pending(), 2);

        // Second call overwrites the height but does not double count.
        state.mark_included([tx1], 51);
        assert_eq!(state.pending(), 2);
        assert_eq!(state.get(tx1.as_ref()).unwrap().block_height, 51);

        let seqs: Vec<u64> = state
            .ordered_pending()
            .iter()
            .map(|t| t.sequence_number)
            .collect();
        assert_eq!(seqs, vec![0, 2]);
    }

    #[test]
    fn test_cleanup_preserves_order_of_pending() {
        let (mut state, sequencers) = setup(None);
        admit_n(&mut state, &sequencers, 5);
        state.mark_included([test_tx_hash("tx0"), test_tx_hash("tx3")], 10);

        assert_eq!(state.cleanup_included(), 2);
        assert_eq!(state.cleanup_included(), 0);

        let stats = state.stats();
        assert_eq!((stats.total, stats.pending, stats.included), (3, 3, 0));
        let seqs: Vec<u64> = state
            .ordered_pending()
            .iter()
            .map(|t| t.sequence_number)
            .collect();
        assert_eq!(seqs, vec![1, 2, 4]);
        assert_eq!(state.snapshot().transactions.len(), 3);
    }

    #[test]
    fn test_remove_sequencer_reports_retained_records() {
        let (mut state, sequencers) = setup(None);
        admit_n(&mut state, &sequencers, 2);

        let removed = state.remove_sequencer("seq1").unwrap();
        assert_eq!(removed.public_key, sequencers.public_key("seq1"));
        assert_eq!(removed.retained_records, 2);
        assert!(state.remove_sequencer("seq1").is_none());
        assert_eq!(state.stats().total, 2);
    }

    #[test]
    fn test_restore_recounts_pending_and_drops_duplicates() {
        let (mut source, sequencers) = setup(None);
        admit_n(&mut source, &sequencers, 3);
        source.mark_included([test_tx_hash("tx1")], 4);
        let mut records: Vec<_> = source
            .order
            .iter()
            .map(|h| source.transactions[h].clone())
            .collect();
        records.push(records[0].clone());

        let (mut state, _) = setup(None);
        state.restore(LoadedState {
            transactions: records,
            next_sequence: 3,
            current_block_height: 8,
            saved_at: SystemTime::now(),
            skipped: 0,
        });

        let stats = state.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.next_sequence, 3);
        assert_eq!(stats.current_block_height, 8);
        assert_eq!(stats.sequencer_count, 2);
    }
}
