//! The connection pool (spec.md §4.6): a fixed array of slots, an
//! available-index queue, a single-flight rescue task, and a process-wide
//! leak detector.

mod available;
mod connection;
mod leak_detector;
mod rescue;
mod slot;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;

use crate::channel::Channel;
use crate::config::{ConnectionConfig, PoolConfig};
use crate::error::{Error, Result};
use crate::listener::{self, NoopListener, PoolListener};
use crate::monitor::Metrics;

pub use connection::PoolConnection;

use available::AvailableQueue;
use slot::SlotState;

pub(crate) struct PoolInner {
    config: ConnectionConfig,
    pool_config: PoolConfig,
    listener: Arc<dyn PoolListener>,
    metrics: Arc<Metrics>,
    slots: Mutex<Vec<Option<Arc<SlotState>>>>,
    available: AvailableQueue,
    closed: AtomicBool,
    rescue_running: Mutex<bool>,
}

/// A fixed-size pool of [`Channel`]s to one host (spec.md §4.6).
///
/// Every slot is either a live channel or a tombstone awaiting rescue;
/// acquisition retries past tombstones rather than failing on them.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl Pool {
    /// Fills every slot, failing only if every single connection attempt
    /// fails. Slots that do fail are left null and handed to the rescue
    /// task rather than aborting the whole pool.
    pub async fn connect(config: ConnectionConfig, pool_config: PoolConfig) -> Result<Pool> {
        Self::connect_with_listener(config, pool_config, Arc::new(NoopListener)).await
    }

    pub async fn connect_with_listener(
        config: ConnectionConfig,
        pool_config: PoolConfig,
        listener: Arc<dyn PoolListener>,
    ) -> Result<Pool> {
        config.validate()?;
        pool_config.validate()?;

        let inner = Arc::new(PoolInner {
            config: config.clone(),
            pool_config: pool_config.clone(),
            listener,
            metrics: Arc::new(Metrics::default()),
            slots: Mutex::new((0..pool_config.pool_size).map(|_| None).collect()),
            available: AvailableQueue::new(),
            closed: AtomicBool::new(false),
            rescue_running: Mutex::new(false),
        });

        let mut successes = 0usize;
        for index in 0..pool_config.pool_size {
            match create_slot(&inner, index).await {
                Ok(()) => successes += 1,
                Err(e) => {
                    tracing::warn!(
                        host = %inner.config.host,
                        index,
                        error = %e,
                        "initial connection attempt failed"
                    );
                }
            }
        }

        if successes == 0 {
            return Err(Error::SocketBuild {
                host: inner.config.host.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "every initial connection attempt failed",
                ),
            });
        }

        listener::notify_created(inner.listener.as_ref(), &inner.config.host, &inner.config.database);
        leak_detector::register(inner.clone());

        if successes < pool_config.pool_size {
            rescue::trigger(inner.clone());
        }

        Ok(Pool { inner })
    }

    /// Checks a connection out (spec.md §4.6 "acquisition"). Retries past
    /// tombstoned slots and lost acquisition races up to `pool_size` times,
    /// honoring the checkout budget (`0` means wait forever); once the
    /// budget has elapsed, makes one final non-blocking attempt before
    /// giving up.
    pub async fn get_connection(&self) -> Result<PoolConnection> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }

        let budget = self.inner.pool_config.checkout_timeout;
        let deadline = if budget.is_zero() {
            None
        } else {
            Some(Instant::now() + budget)
        };

        for _ in 0..self.inner.pool_config.pool_size.max(1) {
            let index = match self.next_index(deadline).await {
                Some(index) => index,
                None => break,
            };

            let slot = self.inner.slots.lock().unwrap()[index].clone();
            let Some(slot) = slot else {
                rescue::trigger(self.inner.clone());
                continue;
            };

            if !slot.try_acquire(self.inner.pool_config.max_occupy_time) {
                continue;
            }

            self.inner.metrics.record_pool_acquired();
            return Ok(PoolConnection::new(self.inner.clone(), index, slot));
        }

        self.inner.metrics.record_pool_exhausted();
        Err(Error::PoolExhausted)
    }

    async fn next_index(&self, deadline: Option<Instant>) -> Option<usize> {
        match deadline {
            None => Some(self.inner.available.pop().await),
            Some(d) => {
                let remaining = d.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    self.inner.available.try_pop()
                } else {
                    tokio::time::timeout(remaining, self.inner.available.pop())
                        .await
                        .ok()
                }
            }
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    /// Closes every live channel and refuses further checkouts. Idempotent.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let slots = self.inner.slots.lock().unwrap().clone();
        for slot in slots.into_iter().flatten() {
            slot.channel.close();
        }
    }
}

async fn create_slot(inner: &Arc<PoolInner>, index: usize) -> Result<()> {
    let channel = Channel::connect(inner.config.clone(), inner.metrics.clone()).await?;
    let state = Arc::new(SlotState::new(channel));

    let removal_inner = Arc::downgrade(inner);
    let removal_state = Arc::downgrade(&state);
    state.channel.on_closed(move || {
        if let (Some(inner), Some(state)) = (removal_inner.upgrade(), removal_state.upgrade()) {
            remove_slot(&inner, index, &state);
        }
    });

    inner.slots.lock().unwrap()[index] = Some(state);
    inner.available.push(index).await;
    Ok(())
}

/// The removal callback every slot's channel is wired to: nulls the slot
/// (but only if `expected` is still the channel installed there -- a
/// rescue pass may have already replaced it) and, unless the pool itself is
/// closing, starts a rescue pass.
fn remove_slot(inner: &Arc<PoolInner>, index: usize, expected: &Arc<SlotState>) {
    {
        let mut slots = inner.slots.lock().unwrap();
        match &slots[index] {
            Some(current) if Arc::ptr_eq(current, expected) => slots[index] = None,
            _ => return,
        }
    }

    listener::notify_closed(inner.listener.as_ref(), &inner.config.host, &inner.config.database);

    if !inner.closed.load(Ordering::Acquire) {
        rescue::trigger(inner.clone());
    }
}
