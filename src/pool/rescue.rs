//! The rescue task (spec.md §4.6): after a slot goes null, walk every null
//! slot and try to fill it with a freshly connected channel. At most one
//! rescue pass runs per pool at a time.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::channel::Channel;
use crate::listener;

use super::slot::SlotState;
use super::PoolInner;

const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Starts a rescue pass if one isn't already running. Safe to call
/// concurrently from many slots' removal callbacks and from acquisition
/// racing a tombstoned slot.
pub(super) fn trigger(inner: Arc<PoolInner>) {
    {
        let mut running = inner.rescue_running.lock().unwrap();
        if *running {
            return;
        }
        *running = true;
    }

    tokio::spawn(run(inner));
}

async fn run(inner: Arc<PoolInner>) {
    loop {
        if inner.closed.load(Ordering::Acquire) {
            break;
        }

        let null_indices: Vec<usize> = {
            let slots = inner.slots.lock().unwrap();
            slots
                .iter()
                .enumerate()
                .filter_map(|(i, s)| if s.is_none() { Some(i) } else { None })
                .collect()
        };

        if null_indices.is_empty() {
            break;
        }

        let mut any_success = false;
        for index in null_indices {
            if inner.closed.load(Ordering::Acquire) {
                break;
            }

            match Channel::connect(inner.config.clone(), inner.metrics.clone()).await {
                Ok(channel) => {
                    install(&inner, index, channel);
                    listener::notify_recovered(
                        inner.listener.as_ref(),
                        &inner.config.host,
                        &inner.config.database,
                    );
                    any_success = true;
                }
                Err(e) => {
                    tracing::warn!(
                        host = %inner.config.host,
                        index,
                        error = %e,
                        "rescue attempt failed, will retry"
                    );
                }
            }
        }

        if !any_success {
            tokio::time::sleep(RETRY_DELAY).await;
        }
    }

    *inner.rescue_running.lock().unwrap() = false;
}

fn install(inner: &Arc<PoolInner>, index: usize, channel: Channel) {
    let state = Arc::new(SlotState::new(channel));

    let removal_inner: Weak<PoolInner> = Arc::downgrade(inner);
    let removal_state = Arc::downgrade(&state);
    state.channel.on_closed(move || {
        if let (Some(inner), Some(state)) = (removal_inner.upgrade(), removal_state.upgrade()) {
            super::remove_slot(&inner, index, &state);
        }
    });

    inner.slots.lock().unwrap()[index] = Some(state);
    let push_inner = inner.clone();
    tokio::spawn(async move {
        push_inner.available.push(index).await;
    });
}
