//! Sequencer registry.

use execbook_types::PublicKey;
use std::collections::HashMap;

/// Authorized sequencers and the keys their submissions must verify under.
///
/// A sequencer id maps to exactly one key. Re-registering an id replaces its
/// key; records admitted under the old key are not re-checked.
#[derive(Debug, Clone, Default)]
pub struct SequencerRegistry {
    keys: HashMap<String, PublicKey>,
}

impl SequencerRegistry {
    /// Create a registry from an id -> key mapping.
    pub fn new(keys: HashMap<String, PublicKey>) -> Self {
        Self { keys }
    }

    /// Key registered for `sequencer_id`.
    pub fn get(&self, sequencer_id: &str) -> Option<&PublicKey> {
        self.keys.get(sequencer_id)
    }

    /// Register or replace a sequencer. Returns the replaced key, if any.
    pub fn insert(&mut self, sequencer_id: String, public_key: PublicKey) -> Option<PublicKey> {
        self.keys.insert(sequencer_id, public_key)
    }

    /// Unregister a sequencer. Returns its key if it was registered.
    pub fn remove(&mut self, sequencer_id: &str) -> Option<PublicKey> {
        self.keys.remove(sequencer_id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.keys.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// A sequencer removed from the registry.
///
/// Records it signed stay in the book; `public_key` is the key they were
/// authenticated against at admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedSequencer {
    pub public_key: PublicKey,
    /// Records from this sequencer still in the book at removal.
    pub retained_records: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use execbook_types::{KeyPair, KeyType};

    fn key(seed: u8) -> PublicKey {
        KeyPair::from_seed(KeyType::Ed25519, &[seed; 32]).public_key()
    }

    #[test]
    fn test_insert_replaces_and_remove_returns_key() {
        let mut registry = SequencerRegistry::default();
        assert!(registry.insert("seq1".into(), key(1)).is_none());
        assert_eq!(registry.insert("seq1".into(), key(2)), Some(key(1)));
        assert_eq!(registry.len(), 1);

        assert_eq!(registry.remove("seq1"), Some(key(2)));
        assert!(registry.remove("seq1").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_ids_are_sorted() {
        let mut registry = SequencerRegistry::default();
        registry.insert("seq2".into(), key(2));
        registry.insert("alpha".into(), key(3));
        registry.insert("seq1".into(), key(1));
        assert_eq!(registry.ids(), vec!["alpha", "seq1", "seq2"]);
    }
}
