//! The channel: one socket, one I/O worker, one command queue, one waiting
//! queue (spec.md §4.5).

mod kill;
mod worker;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};

use crate::command::{CommandBody, QueuedCommand};
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::handshake::{self, ConnectionInfo};
use crate::monitor::Metrics;
use crate::packet::Packet;

/// One of `{UNINITIALIZED, NORMAL, CLOSED}` (spec.md §3). Transitions are
/// monotonic; `CLOSED` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelState {
    Uninitialized = 0,
    Normal = 1,
    Closed = 2,
}

impl From<u8> for ChannelState {
    fn from(v: u8) -> Self {
        match v {
            0 => ChannelState::Uninitialized,
            1 => ChannelState::Normal,
            _ => ChannelState::Closed,
        }
    }
}

type OnClosed = Box<dyn Fn() + Send + Sync>;

struct Inner {
    host: String,
    config: ConnectionConfig,
    info: ConnectionInfo,
    state: AtomicU8,
    /// Serialises transitions to `CLOSED` so the callback fires exactly
    /// once (spec.md §5 "state-change methods hold a channel-level mutex").
    close_lock: Mutex<()>,
    on_closed: Mutex<Option<OnClosed>>,
    close_notify: Arc<Notify>,
    submit_tx: mpsc::UnboundedSender<QueuedCommand>,
    metrics: Arc<Metrics>,
}

/// One long-lived, full-duplex conversation with a single server.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<Inner>,
}

impl Channel {
    /// Opens a TCP connection, performs the handshake, and spawns the I/O
    /// worker. `NORMAL` is entered exactly once, here, on success.
    pub async fn connect(config: ConnectionConfig, metrics: Arc<Metrics>) -> Result<Channel> {
        config.validate()?;

        let addr = format!("{}:{}", config.host, config.port);
        let connect_fut = TcpStream::connect(&addr);
        let mut stream = tokio::time::timeout(config.socket.connect_timeout, connect_fut)
            .await
            .map_err(|_| Error::SocketBuild {
                host: config.host.clone(),
                source: std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"),
            })?
            .map_err(|e| Error::SocketBuild {
                host: config.host.clone(),
                source: e,
            })?;

        let info = handshake::perform(&mut stream, &config).await?;

        let (submit_tx, submit_rx) = mpsc::unbounded_channel();
        let close_notify = Arc::new(Notify::new());

        let inner = Arc::new(Inner {
            host: config.host.clone(),
            config: config.clone(),
            info,
            state: AtomicU8::new(ChannelState::Normal as u8),
            close_lock: Mutex::new(()),
            on_closed: Mutex::new(None),
            close_notify: close_notify.clone(),
            submit_tx,
            metrics: metrics.clone(),
        });

        let worker_inner = inner.clone();
        tokio::spawn(async move {
            worker::run(worker_inner, stream, submit_rx, close_notify).await;
        });

        Ok(Channel { inner })
    }

    pub fn state(&self) -> ChannelState {
        ChannelState::from(self.inner.state.load(Ordering::Acquire))
    }

    pub fn connection_info(&self) -> &ConnectionInfo {
        &self.inner.info
    }

    pub fn host(&self) -> &str {
        &self.inner.host
    }

    /// Registers a callback fired exactly once, the moment this channel
    /// transitions to `CLOSED`. Used by the pool to learn a slot needs
    /// rescuing.
    pub fn on_closed(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.inner.on_closed.lock().unwrap() = Some(Box::new(callback));
    }

    /// Submission contract (spec.md §4.5): rejects submissions unless
    /// `NORMAL`; enqueues the command; awaits completion up to
    /// `timeout`; on timeout, closes the channel and spawns a kill task.
    pub async fn send(&self, body: Box<dyn CommandBody>, timeout: Duration) -> Result<Vec<Packet>> {
        if self.state() != ChannelState::Normal {
            return Err(Error::Closed);
        }

        let (queued, handle) = QueuedCommand::new(body);
        if self.inner.submit_tx.send(queued).is_err() {
            return Err(Error::Closed);
        }

        let result = handle.wait(timeout).await;
        self.inner.metrics.record_command_result(&result);

        if let Err(Error::Timeout(_)) = &result {
            self.close();
            kill::spawn(self.inner.config.clone(), self.inner.info.connection_id);
        }

        result
    }

    /// Explicit close: idempotent, serialised by `close_lock`. Releases the
    /// socket (by waking the worker, which owns it) and drains both queues,
    /// completing every queued command with `ClosedState`.
    pub fn close(&self) {
        let _guard = self.inner.close_lock.lock().unwrap();
        let previous = self.inner.state.swap(ChannelState::Closed as u8, Ordering::AcqRel);
        if previous == ChannelState::Closed as u8 {
            return; // already closed; idempotent
        }

        self.inner.metrics.record_channel_closed();
        self.inner.close_notify.notify_waiters();

        if let Some(cb) = self.inner.on_closed.lock().unwrap().take() {
            cb();
        }

        tracing::warn!(
            host = %self.inner.host,
            connection_id = self.inner.info.connection_id,
            "channel closed"
        );
    }
}
