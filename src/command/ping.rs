//! `COM_PING` (opcode `0x0E`): empty request body, terminates on one `OK`
//! packet.

use crate::command::CommandBody;
use crate::error::{err_protocol, Result};
use crate::packet::Packet;
use crate::protocol::err::ErrPacket;
use crate::protocol::Capabilities;

pub struct Ping {
    request: [u8; 1],
}

impl Default for Ping {
    fn default() -> Self {
        Ping { request: [0x0E] }
    }
}

impl Ping {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandBody for Ping {
    fn request_bytes(&self) -> &[u8] {
        &self.request
    }

    fn feed(&mut self, _capabilities: Capabilities, packet: &Packet) -> Result<bool> {
        match packet.first_byte() {
            Some(0x00) => Ok(true),
            Some(0xFF) => {
                let err = ErrPacket::decode(&packet.payload)?;
                Err(crate::error::Error::Server {
                    code: err.error_code,
                    sql_state: err.sql_state,
                    message: err.error_message,
                })
            }
            other => Err(err_protocol!(
                "expected OK or ERR in response to COM_PING, got {:?}",
                other
            )),
        }
    }
}
