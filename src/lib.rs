//! A native MySQL Client/Server wire-protocol channel and connection pool.
//!
//! This crate owns exactly two things, mirrored directly in its module
//! layout: a single-socket, single-worker [`channel::Channel`] that speaks
//! protocol version 10 over one TCP connection, and a [`pool::Pool`] of
//! fixed size that keeps a set of channels alive, rescues the ones that
//! die, and reclaims the ones a caller forgets to release.
//!
//! It does not parse SQL, decode result sets into typed values, or expose
//! connection-string parsing -- those live in a higher-level crate built on
//! top of this one.

mod auth;
mod codec;
mod command;
mod handshake;
mod packet;
mod protocol;

pub mod channel;
pub mod config;
pub mod error;
pub mod listener;
pub mod monitor;
pub mod pool;

pub use channel::{Channel, ChannelState};
pub use command::{CommandBody, CommandHandle, Ping, Query, Quit};
pub use config::{ConnectionConfig, PoolConfig, SocketConfig};
pub use error::{Error, Result};
pub use handshake::ConnectionInfo;
pub use listener::{NoopListener, PoolListener};
pub use monitor::{Metrics, MetricsSnapshot};
pub use packet::Packet;
pub use pool::{Pool, PoolConnection};
pub use protocol::{Capabilities, Status};
