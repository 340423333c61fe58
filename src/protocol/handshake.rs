//! The server greeting packet (`Handshake`), read exactly once at the start
//! of a connection, and the outcome it's turned into.

use crate::codec::PayloadReader;
use crate::error::{err_protocol, Result};
use crate::protocol::Capabilities;

/// The unparsed halves of the 20-byte authentication challenge: the server
/// sends the first 8 bytes in the fixed header, then (for protocol 41+
/// servers) the rest after the fixed fields, per the published layout.
#[derive(Debug)]
pub struct Handshake {
    pub protocol_version: u8,
    pub server_version: String,
    pub connection_id: u32,
    pub auth_plugin_data: Vec<u8>,
    pub capabilities: Capabilities,
    pub character_set: u8,
    pub status: crate::protocol::Status,
    pub auth_plugin_name: String,
}

impl Handshake {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut r = PayloadReader::new(payload);

        let protocol_version = r.get_u8()?;
        if protocol_version != 10 {
            return Err(err_protocol!(
                "unsupported protocol version {}, expected 10",
                protocol_version
            ));
        }

        let server_version = r.get_str_nul()?.to_owned();
        let connection_id = r.get_uint(4)? as u32;

        let mut auth_plugin_data = r.get_bytes(8)?.to_vec();
        let _filler = r.get_u8()?; // always 0x00

        let capabilities_lower = r.get_uint(2)? as u64;

        let character_set = if r.has_remaining() { r.get_u8()? } else { 0 };
        let status = if r.has_remaining() {
            crate::protocol::Status::from_bits_truncate(r.get_uint(2)? as u16)
        } else {
            crate::protocol::Status::default()
        };
        let capabilities_upper = if r.has_remaining() { r.get_uint(2)? as u64 } else { 0 };
        let capabilities = Capabilities::from_bits_truncate((capabilities_upper << 16) | capabilities_lower);

        let auth_plugin_data_len = if r.has_remaining() { r.get_u8()? } else { 0 };

        // 10 reserved bytes.
        if r.remaining() >= 10 {
            r.seek(r.position() + 10)?;
        }

        if capabilities.contains(Capabilities::SECURE_CONNECTION) {
            let rest_len = (auth_plugin_data_len as usize).saturating_sub(8).max(13);
            let rest = r.get_bytes(rest_len.min(r.remaining()))?;
            // The second part is NUL-terminated (or padded to 13 bytes);
            // trim any trailing NUL before appending.
            let end = memchr::memchr(0, rest).unwrap_or(rest.len());
            auth_plugin_data.extend_from_slice(&rest[..end]);
        }

        let auth_plugin_name = if capabilities.contains(Capabilities::PLUGIN_AUTH) && r.has_remaining() {
            r.get_str_nul().unwrap_or("mysql_native_password").to_owned()
        } else {
            "mysql_native_password".to_owned()
        };

        Ok(Handshake {
            protocol_version,
            server_version,
            connection_id,
            auth_plugin_data,
            capabilities,
            character_set,
            status,
            auth_plugin_name,
        })
    }

    /// Parses `server_version` into `(major, minor, patch)`, defaulting
    /// unparseable components to `0` rather than failing the handshake --
    /// this is informational only.
    pub fn parsed_version(&self) -> (u32, u32, u32) {
        let core = self
            .server_version
            .split(|c: char| !c.is_ascii_digit() && c != '.')
            .next()
            .unwrap_or("");
        let mut parts = core.split('.').map(|p| p.parse::<u32>().unwrap_or(0));
        (
            parts.next().unwrap_or(0),
            parts.next().unwrap_or(0),
            parts.next().unwrap_or(0),
        )
    }
}
