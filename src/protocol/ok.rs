//! The `OK` packet (and, with `deprecate-EOF` negotiated, its reuse as the
//! result-set terminator).

use crate::codec::PayloadReader;
use crate::error::Result;
use crate::protocol::{Capabilities, Status};

#[derive(Debug, Clone)]
pub struct OkPacket {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status: Status,
    pub warnings: u16,
}

impl OkPacket {
    pub fn decode(payload: &[u8], capabilities: Capabilities) -> Result<Self> {
        let mut r = PayloadReader::new(payload);

        let _header = r.get_u8()?; // 0x00 or 0xFE

        let affected_rows = r.get_uint_lenenc()?;
        let last_insert_id = r.get_uint_lenenc()?;

        let status = if capabilities.contains(Capabilities::PROTOCOL_41) {
            Status::from_bits_truncate(r.get_uint(2)? as u16)
        } else {
            Status::default()
        };

        let warnings = if capabilities.contains(Capabilities::PROTOCOL_41) && r.has_remaining() {
            r.get_uint(2)? as u16
        } else {
            0
        };

        Ok(OkPacket {
            affected_rows,
            last_insert_id,
            status,
            warnings,
        })
    }

    /// Is `payload` shaped like an OK packet? Used by the Query state
    /// machine to distinguish a terminal OK (first byte `0x00`, or `0xFE`
    /// with `deprecate-EOF` on and length >= 7) from an EOF packet.
    pub fn looks_like_ok(payload: &[u8], deprecate_eof: bool) -> bool {
        match payload.first() {
            Some(0x00) => true,
            Some(0xFE) if deprecate_eof && payload.len() >= 7 => true,
            _ => false,
        }
    }
}
