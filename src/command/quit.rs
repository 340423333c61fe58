//! `COM_QUIT` (opcode `0x01`): fire-and-forget, no response expected.

use crate::command::CommandBody;
use crate::error::Result;
use crate::packet::Packet;
use crate::protocol::Capabilities;

pub struct Quit {
    request: [u8; 1],
}

impl Default for Quit {
    fn default() -> Self {
        Quit { request: [0x01] }
    }
}

impl Quit {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandBody for Quit {
    fn request_bytes(&self) -> &[u8] {
        &self.request
    }

    fn expects_response(&self) -> bool {
        false
    }

    fn feed(&mut self, _capabilities: Capabilities, _packet: &Packet) -> Result<bool> {
        // Never called: `expects_response` is false, so the channel never
        // enqueues this command onto the waiting queue.
        Ok(true)
    }
}
