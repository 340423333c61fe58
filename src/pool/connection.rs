//! A checked-out connection: a [`Channel`] plus the slot bookkeeping,
//! returned to the pool automatically on drop (spec.md §4.6).

use std::ops::Deref;
use std::sync::Arc;

use crate::channel::Channel;

use super::slot::SlotState;
use super::PoolInner;

/// Borrowed from a [`super::Pool`] by [`super::Pool::get_connection`].
/// Dereferences to the underlying [`Channel`]; returned to the pool's
/// available queue when dropped.
pub struct PoolConnection {
    inner: Arc<PoolInner>,
    index: usize,
    slot: Arc<SlotState>,
    released: bool,
}

impl PoolConnection {
    pub(super) fn new(inner: Arc<PoolInner>, index: usize, slot: Arc<SlotState>) -> Self {
        PoolConnection {
            inner,
            index,
            slot,
            released: false,
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.slot.channel
    }
}

impl Deref for PoolConnection {
    type Target = Channel;

    fn deref(&self) -> &Channel {
        &self.slot.channel
    }
}

impl Drop for PoolConnection {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        self.slot.release();
        self.inner.metrics.record_pool_released();

        let inner = self.inner.clone();
        let index = self.index;
        let slot = self.slot.clone();
        tokio::spawn(async move {
            // Only hand the index back if this is still the live channel at
            // that slot: it may have been nulled (the channel died while
            // checked out) or already replaced by a rescue pass, either of
            // which has already settled -- or will settle -- the index's
            // place in the available queue on its own.
            let still_live = {
                let slots = inner.slots.lock().unwrap();
                matches!(&slots[index], Some(current) if Arc::ptr_eq(current, &slot))
            };
            if still_live {
                inner.available.push(index).await;
            }
        });
    }
}
