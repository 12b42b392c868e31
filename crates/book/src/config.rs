//! Execution book configuration.

use execbook_types::PublicKey;
use std::collections::HashMap;
use std::path::PathBuf;

/// Configuration for an [`ExecutionBook`](crate::ExecutionBook).
#[derive(Debug, Clone, Default)]
pub struct BookConfig {
    /// Registered sequencers: id -> public key.
    pub sequencer_keys: HashMap<String, PublicKey>,

    /// Snapshot path. `None` disables persistence.
    pub state_file_path: Option<PathBuf>,

    /// Maximum pending (not yet included) records.
    ///
    /// Zero or negative means unlimited.
    pub book_size: i64,
}

impl BookConfig {
    /// Register a sequencer.
    pub fn with_sequencer(mut self, id: impl Into<String>, public_key: PublicKey) -> Self {
        self.sequencer_keys.insert(id.into(), public_key);
        self
    }

    /// Enable persistence at `path`.
    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file_path = Some(path.into());
        self
    }

    /// Set the pending-record cap (`<= 0` means unlimited).
    pub fn with_book_size(mut self, book_size: i64) -> Self {
        self.book_size = book_size;
        self
    }

    /// Effective capacity, or `None` when unlimited.
    pub fn capacity(&self) -> Option<usize> {
        if self.book_size > 0 {
            Some(usize::try_from(self.book_size).unwrap_or(usize::MAX))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_book_size_is_unlimited() {
        assert_eq!(BookConfig::default().capacity(), None);
        assert_eq!(BookConfig::default().with_book_size(-5).capacity(), None);
        assert_eq!(BookConfig::default().with_book_size(3).capacity(), Some(3));
    }
}
