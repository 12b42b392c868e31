//! Test helpers for the execution book.
//!
//! Provides sequencers with deterministic keys and properly-signed
//! submissions, so tests exercise the real verification path instead of
//! bypassing it.
//!
//! # Example
//!
//! ```rust
//! use execbook_test_helpers::{test_tx_hash, TestSequencers};
//! use execbook_types::{sequencer_tx_digest, KeyType};
//!
//! let sequencers = TestSequencers::new(&["seq1", "seq2"], KeyType::Ed25519, 42);
//! let submission = sequencers.submission("seq1", test_tx_hash("tx0"), 0);
//!
//! let digest = sequencer_tx_digest(&submission.tx_hash, 0);
//! assert!(sequencers.public_key("seq1").verify(&digest, &submission.signature));
//! ```

use execbook_types::{sign_sequencer_tx, KeyPair, KeyType, PublicKey, TxHash};

/// SHA-256 of a label, matching how test transactions are named (`"tx0"`, ...).
pub fn test_tx_hash(label: &str) -> TxHash {
    TxHash::of_bytes(label.as_bytes())
}

/// A ready-to-submit sequencer entry.
#[derive(Debug, Clone)]
pub struct Submission {
    pub tx_hash: TxHash,
    pub sequence_number: u64,
    pub signature: Vec<u8>,
    pub sequencer_id: String,
}

/// A set of named sequencers with deterministic keypairs.
pub struct TestSequencers {
    entries: Vec<(String, KeyPair)>,
}

impl std::fmt::Debug for TestSequencers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestSequencers")
            .field("ids", &self.ids())
            .finish()
    }
}

impl TestSequencers {
    /// Create sequencers with the given ids, all using `key_type`.
    ///
    /// Keys are derived from `seed` and the sequencer's index, so the same
    /// arguments always yield the same keys.
    pub fn new(ids: &[&str], key_type: KeyType, seed: u64) -> Self {
        let entries = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let mut key_seed = [0u8; 32];
                key_seed[..8].copy_from_slice(&seed.to_le_bytes());
                key_seed[8..16].copy_from_slice(&(i as u64).to_le_bytes());
                (id.to_string(), KeyPair::from_seed(key_type, &key_seed))
            })
            .collect();
        Self { entries }
    }

    /// Sequencer ids in creation order.
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// Keypair for a sequencer.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not part of this set.
    pub fn keypair(&self, id: &str) -> &KeyPair {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, key)| key)
            .unwrap_or_else(|| panic!("unknown test sequencer {id}"))
    }

    /// Public key for a sequencer.
    pub fn public_key(&self, id: &str) -> PublicKey {
        self.keypair(id).public_key()
    }

    /// `(id, public key)` pairs, for seeding a registry.
    pub fn registry_entries(&self) -> Vec<(String, PublicKey)> {
        self.entries
            .iter()
            .map(|(id, key)| (id.clone(), key.public_key()))
            .collect()
    }

    /// Sign `(tx_hash, sequence_number)` with the given sequencer's key.
    pub fn sign(&self, id: &str, tx_hash: &TxHash, sequence_number: u64) -> Vec<u8> {
        sign_sequencer_tx(tx_hash, sequence_number, self.keypair(id))
    }

    /// Build a correctly-signed submission from `id`.
    pub fn submission(&self, id: &str, tx_hash: TxHash, sequence_number: u64) -> Submission {
        Submission {
            signature: self.sign(id, &tx_hash, sequence_number),
            tx_hash,
            sequence_number,
            sequencer_id: id.to_string(),
        }
    }

    /// Signed submissions `tx{start}..tx{start+count}` with matching sequence numbers.
    pub fn numbered_submissions(&self, id: &str, start: u64, count: u64) -> Vec<Submission> {
        (start..start + count)
            .map(|i| self.submission(id, test_tx_hash(&format!("tx{i}")), i))
            .collect()
    }
}
