//! Atomic snapshot file persistence.
//!
//! Saves write the full snapshot to `<path>.tmp` and rename it over `<path>`,
//! so readers observe either the previous snapshot or the new one, never a
//! partial write.

use crate::{BookSnapshot, StateError};
use execbook_types::SequencerTransaction;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, error};

/// Suffix of the temporary file used during a save.
pub const TMP_SUFFIX: &str = ".tmp";

/// State restored from a snapshot file.
#[derive(Debug, Clone)]
pub struct LoadedState {
    /// Decoded records, in admission order.
    pub transactions: Vec<SequencerTransaction>,
    pub next_sequence: u64,
    pub current_block_height: u64,
    pub saved_at: SystemTime,
    /// Records dropped because they failed to decode.
    pub skipped: usize,
}

/// Reads and writes book snapshots at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a store for the given snapshot path. No I/O happens here.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Temporary file written before the atomic rename.
    pub fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(TMP_SUFFIX);
        PathBuf::from(tmp)
    }

    /// Atomically persist a snapshot.
    pub fn save(&self, snapshot: &BookSnapshot) -> Result<(), StateError> {
        let data = serde_json::to_vec_pretty(snapshot).map_err(StateError::Serialize)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            create_dir_all(dir).map_err(|e| StateError::io("create directory for", dir, e))?;
        }

        let tmp = self.tmp_path();
        write_file(&tmp, &data).map_err(|e| StateError::io("write", &tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| StateError::io("rename", &tmp, e))?;

        debug!(
            file = %self.path.display(),
            next_sequence = snapshot.next_sequence,
            transaction_count = snapshot.transactions.len(),
            "Execution book state saved"
        );
        Ok(())
    }

    /// Load the snapshot at the configured path.
    ///
    /// Records whose hex fields fail to decode are skipped individually and
    /// logged; the rest of the snapshot is still restored.
    pub fn load(&self) -> Result<LoadedState, StateError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StateError::NotFound(self.path.clone()))
            }
            Err(e) => return Err(StateError::io("read", &self.path, e)),
        };

        let snapshot: BookSnapshot =
            serde_json::from_slice(&data).map_err(StateError::Deserialize)?;

        let mut transactions = Vec::with_capacity(snapshot.transactions.len());
        let mut skipped = 0;
        for persisted in &snapshot.transactions {
            match persisted.decode() {
                Ok(tx) => transactions.push(tx),
                Err(e) => {
                    error!(
                        tx_hash = %persisted.tx_hash,
                        sequence = persisted.sequence_number,
                        error = %e,
                        "Skipping undecodable persisted transaction"
                    );
                    skipped += 1;
                }
            }
        }

        Ok(LoadedState {
            transactions,
            next_sequence: snapshot.next_sequence,
            current_block_height: snapshot.current_block_height,
            saved_at: snapshot.saved_at,
            skipped,
        })
    }
}

#[cfg(unix)]
fn create_dir_all(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o755).create(dir)
}

#[cfg(not(unix))]
fn create_dir_all(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}
