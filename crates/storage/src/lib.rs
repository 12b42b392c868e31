//! Snapshot persistence for the execution book.
//!
//! - [`BookSnapshot`] / [`PersistedTransaction`]: the self-describing JSON
//!   snapshot format
//! - [`StateStore`]: write-then-rename saves and corruption-tolerant loads

mod error;
mod snapshot;
mod store;

pub use error::StateError;
pub use snapshot::{BookSnapshot, PersistedTransaction, RecordError};
pub use store::{LoadedState, StateStore, TMP_SUFFIX};
