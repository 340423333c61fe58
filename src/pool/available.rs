//! The available-index queue (spec.md §4.6): holds the indices of idle
//! slots. An index appears at most once; callers are responsible for that
//! invariant (the pool never pushes an index it didn't just pop, or that it
//! has verified still names the slot it thinks it does).

use std::collections::VecDeque;

use tokio::sync::{Mutex, Notify};

pub(super) struct AvailableQueue {
    queue: Mutex<VecDeque<usize>>,
    notify: Notify,
}

impl AvailableQueue {
    pub(super) fn new() -> Self {
        AvailableQueue {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    pub(super) async fn push(&self, index: usize) {
        self.queue.lock().await.push_back(index);
        self.notify.notify_one();
    }

    /// Non-blocking: returns `None` immediately if nothing is idle right
    /// now, used once a checkout's budget has already elapsed.
    pub(super) fn try_pop(&self) -> Option<usize> {
        self.queue.try_lock().ok()?.pop_front()
    }

    /// Blocks until some slot is idle.
    pub(super) async fn pop(&self) -> usize {
        loop {
            if let Some(index) = self.queue.lock().await.pop_front() {
                return index;
            }
            self.notify.notified().await;
        }
    }
}
