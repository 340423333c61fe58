//! Error and Result types.
//!
//! Mirrors the taxonomy in the design: every fallible operation in this
//! crate returns [`Result<T>`], and every channel-fatal variant is one the
//! pool knows how to recover from at the slot level.

use std::io;

/// A specialized `Result` type for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error taxonomy produced by the channel and pool.
///
/// Variant names are intentionally abstract (not tied to any one upstream
/// exception hierarchy); see the design notes on normalising two historical
/// "null vs illegal argument" variants into one [`Error::InvalidArgument`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller passed a null/out-of-range argument. Raised at the boundary,
    /// never logged as a server fault.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Failure while establishing or maintaining the TCP connection.
    #[error("failed to open connection to {host}: {source}")]
    SocketBuild {
        host: String,
        #[source]
        source: io::Error,
    },

    /// The peer closed the stream or sent bytes we couldn't parse as the
    /// protocol we expect.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// An `ERR` packet returned by the server. Delivered to the caller as
    /// an ordinary result, not a channel fault -- the channel stays healthy.
    #[error("server error {code} ({sql_state}): {message}")]
    Server {
        code: u16,
        sql_state: String,
        message: String,
    },

    /// A command did not complete before its deadline.
    #[error("command timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Submission or await against a channel/command that is already closed.
    #[error("channel is closed")]
    Closed,

    /// The pool could not hand out a connection within its checkout budget.
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// Any other I/O failure surfaced while the channel's worker was
    /// running. Always fatal for that channel.
    #[error("unexpected I/O error: {0}")]
    Unexpected(#[from] io::Error),
}

impl Error {
    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        Error::MalformedPacket(msg.into())
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// True for errors that must cause the owning channel to transition to
    /// `CLOSED` (everything except [`Error::Server`], which leaves the
    /// channel healthy).
    pub fn is_channel_fatal(&self) -> bool {
        !matches!(self, Error::Server { .. } | Error::InvalidArgument(_))
    }
}

/// Formats a [`Error::MalformedPacket`] with a `format!`-style message,
/// mirroring the teacher's `protocol_err!` helper.
macro_rules! err_protocol {
    ($($arg:tt)*) => {
        $crate::error::Error::protocol(format!($($arg)*))
    };
}

pub(crate) use err_protocol;
