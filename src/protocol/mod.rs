//! Wire-format types for the MySQL Client/Server protocol, version 10.
//!
//! As in the teacher's `mysql::protocol` module, there is more to the wire
//! format than any one command needs; this module stays trimmed to exactly
//! what the channel and handshake driver use.

mod capabilities;
mod status;

pub mod eof;
pub mod err;
pub mod handshake;
pub mod handshake_response;
pub mod ok;
pub mod row;

pub use capabilities::Capabilities;
pub use status::Status;
