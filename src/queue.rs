//! # Work Queues
//!
//! Unbounded FIFO queues connecting the pipeline workers.
//!
//! Producers never block on push. The consumer either polls with
//! [`WorkQueue::try_pop`] or suspends in [`WorkQueue::pop`] until an item
//! arrives. [`WorkQueue::pop_or_backoff`] bounds that wait so a worker can
//! report an empty queue once per back-off interval without spinning.
//!
//! The queue outlives any single consumer: a restarted worker picks up the
//! same queue with its pending items intact.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;

use crate::document::{OutputRecord, ScanDocument};

/// Queue between the producers and the Enrichment Worker
pub type ScanQueue = WorkQueue<ScanDocument>;

/// Queue between the Enrichment Worker and the Write Worker
pub type WriteQueue = WorkQueue<OutputRecord>;

struct Inner<T> {
    items: Mutex<VecDeque<T>>,
    available: Notify,
}

/// Cloneable handle to a shared unbounded FIFO queue
pub struct WorkQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for WorkQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkQueue<T> {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                items: Mutex::new(VecDeque::new()),
                available: Notify::new(),
            }),
        }
    }

    // A panicking holder cannot leave the deque half-modified, so a
    // poisoned lock is still safe to use.
    fn items(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.inner
            .items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append an item to the back of the queue
    ///
    /// Never blocks and never fails.
    pub fn push(&self, item: T) {
        self.items().push_back(item);
        self.inner.available.notify_one();
    }

    /// Append several items, preserving their order
    ///
    /// The batch lands contiguously even with concurrent producers.
    pub fn push_all<I: IntoIterator<Item = T>>(&self, items: I) {
        let pushed = {
            let mut queue = self.items();
            let before = queue.len();
            queue.extend(items);
            queue.len() - before
        };
        if pushed > 0 {
            self.inner.available.notify_one();
        }
    }

    /// Pop the front item if there is one
    pub fn try_pop(&self) -> Option<T> {
        self.items().pop_front()
    }

    /// Pop the front item, suspending until one is available
    pub async fn pop(&self) -> T {
        loop {
            if let Some(item) = self.try_pop() {
                return item;
            }
            // notify_one stores a permit when nobody is waiting, so a push
            // between try_pop and this await is not lost.
            self.inner.available.notified().await;
        }
    }

    /// Pop the front item, waiting at most `backoff`
    ///
    /// Returns `None` when the queue stayed empty for the whole interval.
    pub async fn pop_or_backoff(&self, backoff: Duration) -> Option<T> {
        tokio::time::timeout(backoff, self.pop()).await.ok()
    }

    /// Number of queued items
    pub fn len(&self) -> usize {
        self.items().len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}
