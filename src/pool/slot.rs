//! A pool slot and the pooled-connection wrapper around its channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::channel::Channel;

/// Wraps one [`Channel`] plus the bookkeeping the pool needs: maximum
/// -occupancy deadline, acquisition timestamp, and whether it is currently
/// checked out. Invariant: `acquired == true` implies this slot's index is
/// absent from the pool's available-index queue.
pub(crate) struct SlotState {
    pub(crate) channel: Channel,
    acquired: AtomicBool,
    acquired_at: Mutex<Option<Instant>>,
    deadline: Mutex<Option<Instant>>,
}

impl SlotState {
    pub(crate) fn new(channel: Channel) -> Self {
        SlotState {
            channel,
            acquired: AtomicBool::new(false),
            acquired_at: Mutex::new(None),
            deadline: Mutex::new(None),
        }
    }

    /// Attempts to mark this slot acquired. Fails if it's already acquired
    /// (by another caller who raced ahead) or the channel is no longer
    /// `NORMAL`.
    pub(crate) fn try_acquire(&self, max_occupy_time: Duration) -> bool {
        if self.channel.state() != crate::channel::ChannelState::Normal {
            return false;
        }

        if self
            .acquired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let now = Instant::now();
        *self.acquired_at.lock().unwrap() = Some(now);
        *self.deadline.lock().unwrap() = if max_occupy_time.is_zero() {
            None
        } else {
            Some(now + max_occupy_time)
        };
        true
    }

    pub(crate) fn release(&self) {
        *self.acquired_at.lock().unwrap() = None;
        *self.deadline.lock().unwrap() = None;
        self.acquired.store(false, Ordering::Release);
    }

    pub(crate) fn is_acquired(&self) -> bool {
        self.acquired.load(Ordering::Acquire)
    }

    /// A pooled connection is leaked if it's acquired and past its
    /// `maxOccupyTime` deadline.
    pub(crate) fn is_leaked(&self) -> bool {
        self.is_acquired()
            && self
                .deadline
                .lock()
                .unwrap()
                .map(|d| Instant::now() > d)
                .unwrap_or(false)
    }
}
