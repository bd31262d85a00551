use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::buffer::EditBuffer;
use crate::debounce::DebounceScheduler;
use crate::model::{FieldEdit, RecordId, TestCase, TestCaseUpdate};
use crate::remote::RecordStore;

/// UI-visible state of a record's pending write.
///
/// One entry per id, independently cleared; there is deliberately no single
/// "currently saving" scalar, since any number of ids can have writes
/// scheduled or in flight at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteState {
    /// Edited; the debounce timer has not fired yet.
    Scheduled,
    /// A write-back request is on the wire.
    Saving,
    /// The write-back failed; the local edits are kept but unconfirmed.
    /// Terminal until a new edit schedules a fresh write.
    Failed,
}

enum PendingWrite {
    Scheduled,
    InFlight { retouched: bool },
    Failed,
}

#[derive(Clone, Copy, Debug)]
pub struct SyncOptions {
    /// Quiescence period before a buffered edit becomes a write-back.
    pub debounce: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1000),
        }
    }
}

/// Glues the edit buffer, the per-id debounce timers and the record store
/// together.
///
/// `apply_edit` updates the buffer synchronously (optimistic update) and
/// touches the id's timer; when the timer fires, a background task reads the
/// freshest buffered snapshot and issues one `PUT` for it. At most one write
/// per id is ever in flight: a fire that lands mid-write only flags a
/// re-schedule, performed when the write resolves. Writes for distinct ids
/// overlap freely.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn RecordStore>,
    buffer: Mutex<EditBuffer>,
    pending: Mutex<HashMap<RecordId, PendingWrite>>,
    scheduler: Mutex<DebounceScheduler>,
}

// Buffer, markers and timer table are guarded by plain mutexes; none is ever
// held across an await, so a write-back task can never observe a
// partially-applied edit.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SyncEngine {
    /// Must be called from within a tokio runtime: the flush loop is spawned
    /// here and the scheduler captures the runtime handle.
    pub fn new(store: Arc<dyn RecordStore>, options: SyncOptions) -> Self {
        let (fire_tx, fire_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            store,
            buffer: Mutex::new(EditBuffer::new()),
            pending: Mutex::new(HashMap::new()),
            scheduler: Mutex::new(DebounceScheduler::new(options.debounce, fire_tx)),
        });

        // The loop holds only a weak reference; dropping the last engine
        // handle drops the scheduler's sender and ends the loop.
        tokio::spawn(flush_loop(Arc::downgrade(&inner), fire_rx));

        Self { inner }
    }

    /// Bulk-read the store into the buffer. Called once at session start; a
    /// failure propagates and the caller renders an empty table.
    pub async fn load(&self) -> Result<usize> {
        let cases = self
            .inner
            .store
            .fetch_all()
            .await
            .context("bulk read from record store")?;
        let mut buffer = lock(&self.inner.buffer);
        buffer.load(cases)?;
        Ok(buffer.len())
    }

    /// Apply one field edit optimistically and (re)arm the id's debounce
    /// timer. Returns the updated record for immediate display.
    pub fn apply_edit(&self, id: &RecordId, edit: FieldEdit) -> Result<TestCase> {
        let updated = {
            let mut buffer = lock(&self.inner.buffer);
            buffer.apply(id, edit)?.clone()
        };

        {
            let mut pending = lock(&self.inner.pending);
            match pending.get_mut(id) {
                // The write on the wire predates this edit, so its success
                // must not clear the marker: flag it and `finish_write`
                // keeps the id scheduled until the new snapshot is written.
                Some(PendingWrite::InFlight { retouched }) => {
                    *retouched = true;
                }
                _ => {
                    pending.insert(id.clone(), PendingWrite::Scheduled);
                }
            }
        }

        lock(&self.inner.scheduler).touch(id.clone());
        Ok(updated)
    }

    /// Drop the id's timer and marker without writing. Used when a record
    /// leaves the session's interest; an already in-flight request still runs
    /// to completion.
    pub fn cancel(&self, id: &RecordId) {
        lock(&self.inner.scheduler).cancel(id);
        lock(&self.inner.pending).remove(id);
    }

    pub fn snapshot(&self, id: &RecordId) -> Option<TestCase> {
        lock(&self.inner.buffer).snapshot(id).cloned()
    }

    /// Clone of the buffered rows, in stable session order.
    pub fn cases(&self) -> Vec<TestCase> {
        lock(&self.inner.buffer).cases().to_vec()
    }

    pub fn write_state(&self, id: &RecordId) -> Option<WriteState> {
        let pending = lock(&self.inner.pending);
        pending.get(id).map(|p| match p {
            PendingWrite::Scheduled => WriteState::Scheduled,
            PendingWrite::InFlight { .. } => WriteState::Saving,
            PendingWrite::Failed => WriteState::Failed,
        })
    }

    /// Ids that currently have a write scheduled, in flight, or failed.
    pub fn pending_ids(&self) -> Vec<RecordId> {
        lock(&self.inner.pending).keys().cloned().collect()
    }

    /// True while any edit is unconfirmed by the store.
    pub fn has_unsaved(&self) -> bool {
        !lock(&self.inner.pending).is_empty()
    }

    pub fn pending_timers(&self) -> usize {
        lock(&self.inner.scheduler).pending_count()
    }
}

async fn flush_loop(inner: Weak<Inner>, mut fire_rx: mpsc::UnboundedReceiver<RecordId>) {
    while let Some(id) = fire_rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        Inner::begin_write(&inner, id);
    }
}

impl Inner {
    /// Handle one debounce fire: snapshot the freshest buffered state and
    /// issue the write-back, unless one is already in flight for this id.
    fn begin_write(self: &Arc<Self>, id: RecordId) {
        let already_in_flight = {
            let mut pending = lock(&self.pending);
            match pending.get_mut(&id) {
                Some(PendingWrite::InFlight { retouched }) => {
                    // No second request; re-schedule when the current one
                    // resolves.
                    *retouched = true;
                    true
                }
                _ => {
                    pending.insert(id.clone(), PendingWrite::InFlight { retouched: false });
                    false
                }
            }
        };
        lock(&self.scheduler).complete(&id);
        if already_in_flight {
            return;
        }

        let snapshot = lock(&self.buffer).snapshot(&id).cloned();
        let Some(case) = snapshot else {
            // Ids originate from the buffer, so this is a defensive fault.
            warn!(id = %id, "debounce fired for unknown test case; dropping");
            lock(&self.pending).remove(&id);
            return;
        };

        let update = TestCaseUpdate::from(&case);
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            debug!(id = %id, "write-back started");
            let result = inner.store.update(&id, &update).await;
            inner.finish_write(id, result);
        });
    }

    fn finish_write(&self, id: RecordId, result: Result<()>) {
        let retouched = {
            let mut pending = lock(&self.pending);
            let retouched = matches!(
                pending.get(&id),
                Some(PendingWrite::InFlight { retouched: true })
            );
            match (&result, retouched) {
                (Ok(()), false) => {
                    pending.remove(&id);
                }
                // Edits arrived mid-write; give them their own window.
                (_, true) => {
                    pending.insert(id.clone(), PendingWrite::Scheduled);
                }
                (Err(_), false) => {
                    pending.insert(id.clone(), PendingWrite::Failed);
                }
            }
            retouched
        };

        match result {
            Ok(()) => debug!(id = %id, "write-back confirmed"),
            Err(err) => {
                warn!(id = %id, error = %format!("{:#}", err), "write-back failed; edits remain unsaved");
            }
        }

        if retouched {
            lock(&self.scheduler).touch(id);
        }
    }
}
