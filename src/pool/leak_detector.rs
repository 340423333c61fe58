//! Process-wide leak detector (spec.md §4.6): a single background task,
//! started lazily by the first pool constructed, that scans every
//! registered pool every 5 seconds for connections held past
//! `maxOccupyTime` and physically closes them.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;

use super::PoolInner;

const SCAN_INTERVAL: Duration = Duration::from_secs(5);

struct Registry {
    pools: Mutex<Vec<Weak<PoolInner>>>,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();
static STARTED: OnceLock<()> = OnceLock::new();

/// Registers a pool with the leak detector and, the first time this is
/// called in the process, starts the scan loop.
pub(super) fn register(inner: Arc<PoolInner>) {
    let registry = REGISTRY.get_or_init(|| Registry {
        pools: Mutex::new(Vec::new()),
    });
    registry.pools.lock().unwrap().push(Arc::downgrade(&inner));

    if STARTED.set(()).is_ok() {
        tokio::spawn(scan_loop());
    }
}

async fn scan_loop() {
    loop {
        tokio::time::sleep(SCAN_INTERVAL).await;

        let Some(registry) = REGISTRY.get() else {
            continue;
        };

        let pools: Vec<Arc<PoolInner>> = {
            let mut guard = registry.pools.lock().unwrap();
            guard.retain(|weak| weak.strong_count() > 0);
            guard.iter().filter_map(Weak::upgrade).collect()
        };

        for inner in pools {
            if !inner.closed.load(Ordering::Acquire) {
                scan_one(&inner);
            }
        }
    }
}

fn scan_one(inner: &Arc<PoolInner>) {
    let leaked: Vec<Arc<super::slot::SlotState>> = {
        let slots = inner.slots.lock().unwrap();
        slots.iter().flatten().filter(|s| s.is_leaked()).cloned().collect()
    };

    for slot in leaked {
        inner.metrics.record_leak();
        tracing::warn!(
            host = %inner.config.host,
            "reclaiming connection held past max occupy time"
        );
        // Closing the channel fires its `on_closed` callback, which nulls
        // the slot and starts a rescue pass -- the same path a genuine
        // socket failure takes.
        slot.channel.close();
    }
}
