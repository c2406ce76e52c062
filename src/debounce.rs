//! Latest-wins delayed task executor
//!
//! Submitting a task cancels whatever was submitted before it, so of N
//! rapid submissions exactly the last one runs to completion. Superseded
//! tasks are aborted, never queued.

use parking_lot::Mutex;
use std::future::Future;
use tokio::task::JoinHandle;

/// Single-slot executor where the most recent submission wins
pub struct Debouncer {
    current: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    /// Spawn `task`, cancelling the previously submitted task if it has not
    /// finished yet.
    pub fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.current.lock();
        if let Some(handle) = slot.take() {
            handle.abort();
        }
        *slot = Some(tokio::spawn(task));
    }

    /// Cancel the pending task, if any
    pub fn cancel(&self) {
        if let Some(handle) = self.current.lock().take() {
            handle.abort();
        }
    }

    /// Whether no submitted task is still running
    pub fn is_idle(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .map(|handle| handle.is_finished())
            .unwrap_or(true)
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}
