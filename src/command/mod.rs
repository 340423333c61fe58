//! Command objects (spec.md §4.4): encode a request, consume a sequence of
//! response packets, and expose a completion future with a timeout.

mod ping;
mod query;
mod quit;

pub use ping::Ping;
pub use query::Query;
pub use quit::Quit;

use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::packet::Packet;
use crate::protocol::Capabilities;

/// The protocol-level behavior of one request/response exchange. Kept
/// separate from the channel-facing bookkeeping ([`QueuedCommand`]) so each
/// command only has to describe its own wire shape.
pub trait CommandBody: Send {
    /// Pre-serialized packet payload, opcode included, ready to be framed
    /// by the channel starting at sequence id 0.
    fn request_bytes(&self) -> &[u8];

    /// Whether the server sends anything back (`Quit` does not).
    fn expects_response(&self) -> bool {
        true
    }

    /// Called once per response packet, in arrival order. Returns `Ok(true)`
    /// once the command has seen everything it needs, `Ok(false)` to keep
    /// waiting, or an error that terminates the command (and, if it's not
    /// a [`Error::Server`], the owning channel too).
    fn feed(&mut self, capabilities: Capabilities, packet: &Packet) -> Result<bool>;
}

/// Channel-internal wrapper: accumulates response packets, tracks the
/// `has_response_pending` flag, and owns the one-shot completion signal.
/// The response list is appended to only by the I/O worker (spec.md §3).
pub(crate) struct QueuedCommand {
    body: Box<dyn CommandBody>,
    responses: Vec<Packet>,
    done: Option<oneshot::Sender<Result<Vec<Packet>>>>,
}

impl QueuedCommand {
    pub(crate) fn new(
        body: Box<dyn CommandBody>,
    ) -> (Self, CommandHandle) {
        let (tx, rx) = oneshot::channel();
        (
            QueuedCommand {
                body,
                responses: Vec::new(),
                done: Some(tx),
            },
            CommandHandle { rx },
        )
    }

    pub(crate) fn request_bytes(&self) -> &[u8] {
        self.body.request_bytes()
    }

    pub(crate) fn expects_response(&self) -> bool {
        self.body.expects_response()
    }

    /// Feeds one packet to the command. Returns `true` once complete.
    pub(crate) fn feed(&mut self, capabilities: Capabilities, packet: Packet) -> bool {
        let outcome = self.body.feed(capabilities, &packet);
        self.responses.push(packet);

        match outcome {
            Ok(true) => {
                self.complete_ok();
                true
            }
            Ok(false) => false,
            Err(err) => {
                self.complete_err(err);
                true
            }
        }
    }

    pub(crate) fn complete_ok(&mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.send(Ok(std::mem::take(&mut self.responses)));
        }
    }

    pub(crate) fn complete_err(&mut self, err: Error) {
        if let Some(done) = self.done.take() {
            let _ = done.send(Err(err));
        }
    }

    /// Marks the command unusable, e.g. because the channel closed while it
    /// was still in the submission or waiting queue. Idempotent.
    pub(crate) fn close(&mut self) {
        self.complete_err(Error::Closed);
    }
}

/// What the caller is handed back at submission time: a future with a
/// timeout, per spec.md §4.4(d).
pub struct CommandHandle {
    rx: oneshot::Receiver<Result<Vec<Packet>>>,
}

impl CommandHandle {
    /// Awaits completion up to `timeout` (a zero duration is treated as "no
    /// wait", matching the pool's own zero-means-infinite convention being
    /// the caller's responsibility to avoid -- this method always honors
    /// the duration given).
    pub async fn wait(self, timeout: Duration) -> Result<Vec<Packet>> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_canceled)) => Err(Error::Closed),
            Err(_elapsed) => Err(Error::Timeout(timeout)),
        }
    }
}
