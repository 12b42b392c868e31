//! Background snapshot saving.
//!
//! Each persistent book owns one save worker thread. Mutations send a
//! [`SaveRequest::Save`] and return immediately; the worker drains whatever
//! has queued up and performs a single save for the batch, so a burst of
//! admissions costs one write. Saves never overlap: the worker and
//! [`Persister::save_now`] both go through [`SnapshotWriter`], which captures
//! and writes under one mutex.

use crate::state::BookState;
use crossbeam::channel::{self, Receiver, Sender};
use execbook_storage::{StateError, StateStore};
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

const WORKER_THREAD_NAME: &str = "execbook-save";

enum SaveRequest {
    /// Persist the current state.
    Save,
    /// Reply once every earlier request has been handled.
    Flush(Sender<()>),
}

/// Captures the book state and writes it, one save at a time.
struct SnapshotWriter {
    store: StateStore,
    write_lock: Mutex<()>,
}

impl SnapshotWriter {
    fn save(&self, state: &RwLock<BookState>) -> Result<(), StateError> {
        let _guard = self.write_lock.lock();
        // Capture under the read lock, serialize and write outside it.
        let snapshot = state.read().snapshot();
        self.store.save(&snapshot)
    }

    fn save_logged(&self, state: &RwLock<BookState>) {
        if let Err(e) = self.save(state) {
            error!(
                file = %self.store.path().display(),
                error = %e,
                "Failed to save execution book state"
            );
        }
    }
}

struct Worker {
    requests: Sender<SaveRequest>,
    handle: JoinHandle<()>,
}

/// Schedules and performs snapshot saves for one book.
pub(crate) struct Persister {
    writer: Arc<SnapshotWriter>,
    state: Arc<RwLock<BookState>>,
    /// `None` if the worker thread could not be spawned; saves then run inline.
    worker: Option<Worker>,
}

impl Persister {
    /// Start the save worker for `store`.
    pub(crate) fn start(store: StateStore, state: Arc<RwLock<BookState>>) -> Self {
        let writer = Arc::new(SnapshotWriter {
            store,
            write_lock: Mutex::new(()),
        });
        let (requests, rx) = channel::unbounded();

        let worker_writer = Arc::clone(&writer);
        let worker_state = Arc::clone(&state);
        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(rx, &worker_writer, &worker_state));

        let worker = match spawned {
            Ok(handle) => Some(Worker { requests, handle }),
            Err(e) => {
                warn!(error = %e, "Failed to spawn save worker, saving inline");
                None
            }
        };

        Self {
            writer,
            state,
            worker,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        self.writer.store.path()
    }

    /// Request a save without waiting for it.
    ///
    /// Must not be called while holding the book lock when the worker is
    /// unavailable, since the inline save takes the read lock.
    pub(crate) fn schedule(&self) {
        match &self.worker {
            Some(worker) => {
                if worker.requests.send(SaveRequest::Save).is_err() {
                    error!("Save worker has stopped, saving inline");
                    self.writer.save_logged(&self.state);
                }
            }
            None => self.writer.save_logged(&self.state),
        }
    }

    /// Save synchronously and report the outcome.
    pub(crate) fn save_now(&self) -> Result<(), StateError> {
        self.writer.save(&self.state)
    }

    /// Block until every save scheduled so far has completed.
    pub(crate) fn flush(&self) {
        let Some(worker) = &self.worker else {
            return;
        };
        let (ack, done) = channel::bounded(1);
        if worker.requests.send(SaveRequest::Flush(ack)).is_ok() {
            // A disconnect here means the worker exited; nothing left to wait for.
            let _ = done.recv();
        }
    }
}

impl Drop for Persister {
    fn drop(&mut self) {
        if let Some(Worker { requests, handle }) = self.worker.take() {
            // Closing the channel lets the worker finish queued saves and exit.
            drop(requests);
            if handle.join().is_err() {
                error!("Save worker panicked");
            }
        }
    }
}

fn run_worker(rx: Receiver<SaveRequest>, writer: &SnapshotWriter, state: &RwLock<BookState>) {
    debug!(file = %writer.store.path().display(), "Save worker started");

    while let Ok(first) = rx.recv() {
        let mut dirty = false;
        let mut acks = Vec::new();
        for request in std::iter::once(first).chain(rx.try_iter()) {
            match request {
                SaveRequest::Save => dirty = true,
                SaveRequest::Flush(ack) => acks.push(ack),
            }
        }

        if dirty {
            writer.save_logged(state);
        }
        for ack in acks {
            let _ = ack.send(());
        }
    }

    debug!("Save worker stopped");
}
