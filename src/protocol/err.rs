//! The `ERR` packet.
//!
//! First byte `0xFF`; 2-byte error code; if the next byte is `#`, the
//! following five bytes are the SQLSTATE and the remainder is the message;
//! otherwise there is no SQLSTATE and the remainder is the whole message.

use crate::codec::PayloadReader;
use crate::error::{err_protocol, Result};

#[derive(Debug, Clone)]
pub struct ErrPacket {
    pub error_code: u16,
    pub sql_state: String,
    pub error_message: String,
}

impl ErrPacket {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut r = PayloadReader::new(payload);

        let header = r.get_u8()?;
        if header != 0xFF {
            return Err(err_protocol!("expected 0xFF; received {:#x}", header));
        }

        let error_code = r.get_uint(2)? as u16;

        let (sql_state, error_message) = if r.has_remaining() {
            let marker = r.get_bytes(1)?[0];
            if marker == b'#' {
                let sql_state = std::str::from_utf8(r.get_bytes(5)?)
                    .map_err(|e| err_protocol!("invalid UTF-8 in SQLSTATE: {}", e))?
                    .to_owned();
                (sql_state, r.get_str_eof()?.to_owned())
            } else {
                // No SQLSTATE marker: the byte we consumed is the start of
                // the message.
                let mut message = String::from(marker as char);
                message.push_str(r.get_str_eof()?);
                (String::new(), message)
            }
        } else {
            (String::new(), String::new())
        };

        Ok(ErrPacket {
            error_code,
            sql_state,
            error_message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERR_HANDSHAKE_UNKNOWN_DB: &[u8] = b"\xff\x19\x04#42000Unknown database 'unknown'";

    #[test]
    fn it_decodes_an_err_packet() {
        let p = ErrPacket::decode(ERR_HANDSHAKE_UNKNOWN_DB).unwrap();
        assert_eq!(p.error_code, 1049);
        assert_eq!(p.sql_state, "42000");
        assert_eq!(p.error_message, "Unknown database 'unknown'");
    }

    #[test]
    fn it_rejects_wrong_header_byte() {
        assert!(ErrPacket::decode(b"\x00\x19\x04#42000oops").is_err());
    }
}
