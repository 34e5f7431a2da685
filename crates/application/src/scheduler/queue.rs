//! Task queue with optional priority ordering and delayed entries.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;

use apiprobe_domain::TaskPriority;

use crate::error::{SchedulerError, SchedulerResult};

/// Ordering key: priority (when enabled, higher first) then submission order.
type QueueKey = (Reverse<i32>, u64);

/// One queued reference to a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTask {
    /// Task identifier.
    pub task_id: String,
    /// Priority at submission.
    pub priority: TaskPriority,
    /// Earliest start time.
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl QueuedTask {
    fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at.is_none_or(|at| at <= now)
    }
}

/// A bounded, ordered queue of task references.
///
/// `pop_eligible` returns the best entry that is already due, so delayed
/// entries never block due ones behind them.
#[derive(Debug)]
pub struct TaskQueue {
    entries: Mutex<BTreeMap<QueueKey, QueuedTask>>,
    capacity: usize,
    prioritized: bool,
    sequence: AtomicU64,
    notify: Notify,
}

impl TaskQueue {
    /// Creates a queue. A `capacity` of 0 means unbounded.
    #[must_use]
    pub fn new(capacity: usize, prioritized: bool) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            capacity,
            prioritized,
            sequence: AtomicU64::new(0),
            notify: Notify::new(),
        }
    }

    /// Adds an entry and wakes the dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::QueueFull`] when the queue is at capacity.
    pub fn push(&self, entry: QueuedTask) -> SchedulerResult<()> {
        {
            let mut entries = self.entries.lock();
            if self.capacity > 0 && entries.len() >= self.capacity {
                return Err(SchedulerError::QueueFull {
                    capacity: self.capacity,
                });
            }
            let rank = if self.prioritized { entry.priority.0 } else { 0 };
            let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
            entries.insert((Reverse(rank), seq), entry);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Removes and returns the first entry that is due at `now`.
    pub fn pop_eligible(&self, now: DateTime<Utc>) -> Option<QueuedTask> {
        let mut entries = self.entries.lock();
        let key = entries
            .iter()
            .find(|(_, entry)| entry.is_due(now))
            .map(|(key, _)| *key)?;
        entries.remove(&key)
    }

    /// Removes the entry for `task_id`; returns whether one was present.
    pub fn remove(&self, task_id: &str) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.task_id != task_id);
        entries.len() != before
    }

    /// Number of queued entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Configured capacity (0 = unbounded).
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Waits until an entry is pushed.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}
