//! The execution book.

use crate::persister::Persister;
use crate::state::{BookState, BookStats};
use crate::{BookConfig, RemovedSequencer, SequencerRegistry, SubmitError};
use execbook_storage::{StateError, StateStore};
use execbook_types::{PublicKey, SequencerTransaction};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Sequencer-signed, strictly-ordered pre-execution book.
///
/// Sequencers submit `(tx_hash, sequence_number, signature)` triples. A
/// submission is admitted only if it is signed by a registered sequencer over
/// the canonical digest and carries exactly the next global sequence number.
/// Block proposers read pending records in admission order; committers mark
/// them included and clean them up.
///
/// All state sits behind one readers-writer lock. When a state file is
/// configured, every mutation schedules a background save; saves never block
/// the caller and their failures are only logged.
///
/// The book is `Send + Sync`; share it behind an `Arc`.
pub struct ExecutionBook {
    state: Arc<RwLock<BookState>>,
    persister: Option<Persister>,
}

impl std::fmt::Debug for ExecutionBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionBook")
            .field("stats", &self.get_stats())
            .field("state_file", &self.state_file_path())
            .finish()
    }
}

impl ExecutionBook {
    /// Create a book, restoring state from the configured file if present.
    ///
    /// A missing, unreadable or corrupt state file is logged and the book
    /// starts empty; construction never fails.
    pub fn new(config: BookConfig) -> Self {
        let capacity = config.capacity();
        let registry = SequencerRegistry::new(config.sequencer_keys);
        let mut state = BookState::new(registry, capacity);

        let store = config.state_file_path.map(StateStore::new);
        if let Some(store) = &store {
            load_into(&mut state, store);
        }

        info!(
            sequencer_count = state.registry().len(),
            book_size = config.book_size,
            next_sequence = state.next_sequence(),
            state_file = ?store.as_ref().map(|s| s.path().display().to_string()),
            "Execution book initialized"
        );

        let state = Arc::new(RwLock::new(state));
        let persister = store.map(|store| Persister::start(store, Arc::clone(&state)));
        Self { state, persister }
    }

    /// Submit a sequencer-signed transaction.
    ///
    /// On success the record is appended in admission order and
    /// `next_sequence` advances by one. On error the book is unchanged.
    pub fn submit(
        &self,
        tx_hash: &[u8],
        sequence_number: u64,
        signature: &[u8],
        sequencer_id: &str,
    ) -> Result<(), SubmitError> {
        let (hash, pending) = {
            let mut state = self.state.write();
            let hash = state.admit(
                tx_hash,
                sequence_number,
                signature,
                sequencer_id,
                SystemTime::now(),
            )?;
            (hash, state.pending())
        };

        debug!(
            tx_hash = %hash,
            sequence = sequence_number,
            sequencer_id,
            pending,
            "Sequencer transaction admitted"
        );
        self.schedule_save();
        Ok(())
    }

    /// Pending records in admission order.
    ///
    /// Returns copies; later mutations of the book are not reflected.
    pub fn get_ordered_transactions(&self) -> Vec<SequencerTransaction> {
        self.state.read().ordered_pending()
    }

    /// Mark transactions as included at `block_height`.
    ///
    /// Hashes not in the book are ignored. Returns how many were found.
    pub fn mark_included<I, H>(&self, tx_hashes: I, block_height: u64) -> usize
    where
        I: IntoIterator<Item = H>,
        H: AsRef<[u8]>,
    {
        let marked = self.state.write().mark_included(tx_hashes, block_height);
        for hash in &marked {
            debug!(tx_hash = %hash, block_height, "Transaction marked as included");
        }
        if !marked.is_empty() {
            self.schedule_save();
        }
        marked.len()
    }

    /// Evict all included records. Returns the number removed.
    pub fn cleanup_included_transactions(&self) -> usize {
        let (removed, remaining) = {
            let mut state = self.state.write();
            let removed = state.cleanup_included();
            (removed, state.stats().total)
        };

        if removed > 0 {
            info!(count = removed, remaining, "Cleaned up included transactions");
            self.schedule_save();
        }
        removed
    }

    /// Record the height of the block being built.
    ///
    /// Sequence numbers are global; this does not reset `next_sequence`.
    pub fn update_block_height(&self, block_height: u64) {
        let next_sequence = {
            let mut state = self.state.write();
            state.set_block_height(block_height);
            state.next_sequence()
        };
        debug!(block_height, next_sequence, "Block height updated");
        self.schedule_save();
    }

    pub fn get_stats(&self) -> BookStats {
        self.state.read().stats()
    }

    /// Look up a record by hash, pending or included.
    pub fn get_transaction(&self, tx_hash: impl AsRef<[u8]>) -> Option<SequencerTransaction> {
        self.state.read().get(tx_hash.as_ref()).cloned()
    }

    /// The sequence number the next submission must carry.
    pub fn get_next_sequence(&self) -> u64 {
        self.state.read().next_sequence()
    }

    /// Number of pending records.
    pub fn get_transaction_count(&self) -> usize {
        self.state.read().pending()
    }

    /// Register a sequencer, replacing any existing key for `sequencer_id`.
    ///
    /// Returns the replaced key. Takes effect for the next submission.
    pub fn add_sequencer(
        &self,
        sequencer_id: impl Into<String>,
        public_key: PublicKey,
    ) -> Option<PublicKey> {
        let sequencer_id = sequencer_id.into();
        let key_type = public_key.key_type();
        let replaced = self
            .state
            .write()
            .add_sequencer(sequencer_id.clone(), public_key);
        info!(
            sequencer_id = %sequencer_id,
            key_type = %key_type,
            replaced = replaced.is_some(),
            "Sequencer added"
        );
        replaced
    }

    /// Unregister a sequencer.
    ///
    /// Further submissions from it fail with
    /// [`SubmitError::UnknownSequencer`]. Records it already signed stay in
    /// the book.
    pub fn remove_sequencer(&self, sequencer_id: &str) -> Option<RemovedSequencer> {
        let removed = self.state.write().remove_sequencer(sequencer_id);
        match &removed {
            Some(r) => info!(
                sequencer_id,
                retained_records = r.retained_records,
                "Sequencer removed"
            ),
            None => debug!(sequencer_id, "Sequencer not registered, nothing to remove"),
        }
        removed
    }

    /// Registered sequencer ids, sorted.
    pub fn sequencer_ids(&self) -> Vec<String> {
        self.state.read().registry().ids()
    }

    /// Save the current state now, bypassing the background worker.
    ///
    /// A no-op without a configured state file.
    pub fn save_state(&self) -> Result<(), StateError> {
        match &self.persister {
            Some(persister) => persister.save_now(),
            None => Ok(()),
        }
    }

    /// Block until all scheduled background saves have been written.
    pub fn flush(&self) {
        if let Some(persister) = &self.persister {
            persister.flush();
        }
    }

    pub fn state_file_path(&self) -> Option<&Path> {
        self.persister.as_ref().map(Persister::path)
    }

    fn schedule_save(&self) {
        if let Some(persister) = &self.persister {
            persister.schedule();
        }
    }
}

fn load_into(state: &mut BookState, store: &StateStore) {
    match store.load() {
        Ok(loaded) => {
            let skipped = loaded.skipped;
            let saved_at = loaded.saved_at;
            state.restore(loaded);
            let stats = state.stats();
            info!(
                file = %store.path().display(),
                transactions = stats.total,
                pending = stats.pending,
                skipped,
                next_sequence = stats.next_sequence,
                block_height = stats.current_block_height,
                saved_at = %humantime::format_rfc3339_seconds(saved_at),
                "Execution book state loaded"
            );
        }
        Err(e) if e.is_not_found() => {
            info!(file = %store.path().display(), "No execution book state file, starting fresh");
        }
        Err(e) => {
            warn!(
                file = %store.path().display(),
                error = %e,
                "Failed to load execution book state, starting fresh"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use execbook_test_helpers::{test_tx_hash, TestSequencers};
    use execbook_types::KeyType;
    use tracing_test::traced_test;

    fn book_with(sequencers: &TestSequencers, config: BookConfig) -> ExecutionBook {
        let config = sequencers
            .registry_entries()
            .into_iter()
            .fold(config, |c, (id, key)| c.with_sequencer(id, key));
        ExecutionBook::new(config)
    }

    fn submit_n(book: &ExecutionBook, sequencers: &TestSequencers, id: &str, n: u64) {
        for sub in sequencers.numbered_submissions(id, book.get_next_sequence(), n) {
            book.submit(
                sub.tx_hash.as_ref(),
                sub.sequence_number,
                &sub.signature,
                &sub.sequencer_id,
            )
            .unwrap();
        }
    }

    #[test]
    fn test_add_sequencer_enables_submission() {
        let sequencers = TestSequencers::new(&["seq1"], KeyType::Secp256k1, 3);
        let book = ExecutionBook::new(BookConfig::default());
        let sub = sequencers.submission("seq1", test_tx_hash("tx0"), 0);

        assert_eq!(
            book.submit(sub.tx_hash.as_ref(), 0, &sub.signature, "seq1"),
            Err(SubmitError::UnknownSequencer("seq1".into()))
        );

        assert!(book
            .add_sequencer("seq1", sequencers.public_key("seq1"))
            .is_none());
        book.submit(sub.tx_hash.as_ref(), 0, &sub.signature, "seq1")
            .unwrap();
        assert_eq!(book.get_stats().sequencer_count, 1);
        assert_eq!(book.sequencer_ids(), vec!["seq1"]);
    }

    #[test]
    fn test_removed_sequencer_is_rejected_but_records_remain() {
        let sequencers = TestSequencers::new(&["seq1"], KeyType::Ed25519, 3);
        let book = book_with(&sequencers, BookConfig::default());
        submit_n(&book, &sequencers, "seq1", 2);

        let removed = book.remove_sequencer("seq1").unwrap();
        assert_eq!(removed.retained_records, 2);

        let sub = sequencers.submission("seq1", test_tx_hash("tx2"), 2);
        assert_eq!(
            book.submit(sub.tx_hash.as_ref(), 2, &sub.signature, "seq1"),
            Err(SubmitError::UnknownSequencer("seq1".into()))
        );
        assert_eq!(book.get_ordered_transactions().len(), 2);
        assert!(book.remove_sequencer("seq1").is_none());
    }

    #[test]
    fn test_get_transaction_sees_included_until_cleanup() {
        let sequencers = TestSequencers::new(&["seq1"], KeyType::Ed25519, 3);
        let book = book_with(&sequencers, BookConfig::default());
        submit_n(&book, &sequencers, "seq1", 2);
        let tx0 = test_tx_hash("tx0");

        assert_eq!(book.mark_included([tx0], 9), 1);
        let record = book.get_transaction(tx0).unwrap();
        assert!(record.included);
        assert_eq!(record.block_height, 9);
        assert_eq!(book.get_transaction_count(), 1);

        assert_eq!(book.cleanup_included_transactions(), 1);
        assert!(book.get_transaction(tx0).is_none());
        assert!(book.get_transaction([0u8; 3]).is_none());
    }

    #[test]
    fn test_no_state_file_means_no_persistence() {
        let book = ExecutionBook::new(BookConfig::default());
        assert!(book.state_file_path().is_none());
        assert!(book.save_state().is_ok());
        book.flush();
    }

    #[traced_test]
    #[test]
    fn test_corrupt_state_file_is_logged_and_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");
        std::fs::write(&path, b"not json at all").unwrap();

        let book = ExecutionBook::new(BookConfig::default().with_state_file(&path));

        assert_eq!(book.get_next_sequence(), 0);
        assert_eq!(book.get_stats().total, 0);
        assert!(logs_contain("Failed to load execution book state"));
    }

    #[traced_test]
    #[test]
    fn test_admission_is_logged() {
        let sequencers = TestSequencers::new(&["seq1"], KeyType::Ed25519, 3);
        let book = book_with(&sequencers, BookConfig::default());
        submit_n(&book, &sequencers, "seq1", 1);
        assert!(logs_contain("Sequencer transaction admitted"));
    }
}
