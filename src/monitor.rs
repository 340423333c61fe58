//! Thread-safe counters for bytes, latencies and error classes
//! ("Monitors/facility" in spec.md §2).
//!
//! This crate does not ship an external metrics sink (out of scope per
//! spec.md §1); [`Metrics`] is the hook point a caller-supplied collector
//! would read from.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct Metrics {
    pub bytes_read: AtomicU64,
    pub bytes_written: AtomicU64,
    pub commands_ok: AtomicU64,
    pub commands_server_error: AtomicU64,
    pub commands_timed_out: AtomicU64,
    pub channels_closed: AtomicU64,
    pub pool_acquired: AtomicU64,
    pub pool_released: AtomicU64,
    pub pool_exhausted: AtomicU64,
    pub leaks_detected: AtomicU64,
}

impl Metrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            commands_ok: self.commands_ok.load(Ordering::Relaxed),
            commands_server_error: self.commands_server_error.load(Ordering::Relaxed),
            commands_timed_out: self.commands_timed_out.load(Ordering::Relaxed),
            channels_closed: self.channels_closed.load(Ordering::Relaxed),
            pool_acquired: self.pool_acquired.load(Ordering::Relaxed),
            pool_released: self.pool_released.load(Ordering::Relaxed),
            pool_exhausted: self.pool_exhausted.load(Ordering::Relaxed),
            leaks_detected: self.leaks_detected.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_bytes_read(&self, n: u64) {
        self.bytes_read.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn record_bytes_written(&self, n: u64) {
        self.bytes_written.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn record_command_result<T>(&self, result: &crate::error::Result<T>) {
        match result {
            Ok(_) => {
                self.commands_ok.fetch_add(1, Ordering::Relaxed);
            }
            Err(crate::error::Error::Server { .. }) => {
                self.commands_server_error.fetch_add(1, Ordering::Relaxed);
            }
            Err(crate::error::Error::Timeout(_)) => {
                self.commands_timed_out.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {}
        }
    }

    pub(crate) fn record_channel_closed(&self) {
        self.channels_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pool_acquired(&self) {
        self.pool_acquired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pool_released(&self) {
        self.pool_released.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pool_exhausted(&self) {
        self.pool_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_leak(&self) {
        self.leaks_detected.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub commands_ok: u64,
    pub commands_server_error: u64,
    pub commands_timed_out: u64,
    pub channels_closed: u64,
    pub pool_acquired: u64,
    pub pool_released: u64,
    pub pool_exhausted: u64,
    pub leaks_detected: u64,
}
