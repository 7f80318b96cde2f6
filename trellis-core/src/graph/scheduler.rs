//! Batch Scheduler
//!
//! Coalesces notifications raised while a batch is open.
//!
//! # Algorithm
//!
//! 1. `enter` increments the batch depth.
//! 2. While depth is non-zero, notified subscribers are queued into an
//!    ordered set. A subscriber notified twice keeps its first position.
//! 3. `exit` decrements the depth. When it reaches zero the queue is drained
//!    and handed back to the runtime, which runs each subscriber once.

use indexmap::IndexSet;

use crate::reactive::SubscriberId;

/// Batch depth and the queue of subscribers waiting for the outermost batch
/// to close.
#[derive(Debug, Default)]
pub struct BatchScheduler {
    depth: usize,
    pending: IndexSet<SubscriberId>,
}

impl BatchScheduler {
    /// Create a scheduler with no open batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a (possibly nested) batch.
    pub fn enter(&mut self) {
        self.depth += 1;
    }

    /// Close a batch.
    ///
    /// Returns the queued subscribers when the outermost batch closed, in
    /// first-registration order. Returns an empty list otherwise.
    pub fn exit(&mut self) -> Vec<SubscriberId> {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.drain()
        } else {
            Vec::new()
        }
    }

    /// Whether a batch is currently open.
    pub fn is_batching(&self) -> bool {
        self.depth > 0
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Queue subscribers for the end of the current batch.
    pub fn enqueue<I>(&mut self, subscribers: I)
    where
        I: IntoIterator<Item = SubscriberId>,
    {
        self.pending.extend(subscribers);
    }

    /// Take every queued subscriber, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<SubscriberId> {
        self.pending.drain(..).collect()
    }

    /// Number of subscribers waiting for a flush.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
