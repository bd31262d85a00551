use std::collections::HashMap;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::model::RecordId;

/// Per-record debounce timers.
///
/// Each id with a buffered-but-unwritten edit owns exactly one timer.
/// `touch` aborts and replaces the id's timer, so a burst of edits collapses
/// into one fire per quiescence period. Timers are keyed by id: edits to one
/// record never cancel or delay the pending fire of another.
///
/// A fire delivers the id on the channel handed to `new`; the consumer is
/// expected to call `complete` once it has picked the fire up.
pub struct DebounceScheduler {
    delay: Duration,
    handle: Handle,
    fire_tx: mpsc::UnboundedSender<RecordId>,
    timers: HashMap<RecordId, JoinHandle<()>>,
}

impl DebounceScheduler {
    /// Must be called from within a tokio runtime; the current handle is
    /// captured so later `touch` calls may come from any thread.
    pub fn new(delay: Duration, fire_tx: mpsc::UnboundedSender<RecordId>) -> Self {
        Self {
            delay,
            handle: Handle::current(),
            fire_tx,
            timers: HashMap::new(),
        }
    }

    /// (Re)start the timer for `id` at `now + delay`. An already-pending
    /// timer is cancelled and replaced, never duplicated.
    pub fn touch(&mut self, id: RecordId) {
        if let Some(prev) = self.timers.remove(&id) {
            prev.abort();
        }

        let tx = self.fire_tx.clone();
        let delay = self.delay;
        let fire_id = id.clone();
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(fire_id);
        });
        self.timers.insert(id, task);
    }

    /// Remove a pending timer without firing. No-op when none is pending.
    pub fn cancel(&mut self, id: &RecordId) {
        if let Some(task) = self.timers.remove(id) {
            task.abort();
        }
    }

    /// Cancel every pending timer; used at session end.
    pub fn cancel_all(&mut self) {
        for (_, task) in self.timers.drain() {
            task.abort();
        }
    }

    /// Drop the bookkeeping entry for a fired timer.
    ///
    /// Only a finished task is removed: if a re-touch replaced the entry
    /// between the fire and its processing, the fresh timer stays pending.
    pub fn complete(&mut self, id: &RecordId) {
        if self.timers.get(id).is_some_and(|t| t.is_finished()) {
            self.timers.remove(id);
        }
    }

    pub fn is_pending(&self, id: &RecordId) -> bool {
        self.timers.get(id).is_some_and(|t| !t.is_finished())
    }

    pub fn pending_count(&self) -> usize {
        self.timers.values().filter(|t| !t.is_finished()).count()
    }
}

impl Drop for DebounceScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
