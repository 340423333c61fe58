//! The client's Handshake Response 41, written once per connection.

use crate::codec::PayloadWriter;
use crate::protocol::Capabilities;

pub struct HandshakeResponse<'a> {
    pub capabilities: Capabilities,
    pub max_packet_size: u32,
    pub character_set: u8,
    pub username: &'a str,
    pub auth_response: &'a [u8],
    pub database: Option<&'a str>,
    pub auth_plugin_name: &'a str,
}

impl HandshakeResponse<'_> {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = PayloadWriter::with_capacity(
            32 + self.username.len() + self.auth_response.len() + 32,
        );

        w.put_uint(self.capabilities.bits() & 0xFFFF_FFFF, 4);
        w.put_uint(self.max_packet_size as u64, 4);
        w.put_u8(self.character_set);
        w.put_bytes(&[0u8; 23]); // reserved

        w.put_str_nul(self.username);

        // length-prefixed auth response (1-byte length; the response is at
        // most 32 bytes for every plugin this crate supports).
        w.put_u8(self.auth_response.len() as u8);
        w.put_bytes(self.auth_response);

        if let Some(db) = self.database {
            w.put_str_nul(db);
        }

        if self.capabilities.contains(Capabilities::PLUGIN_AUTH) {
            w.put_str_nul(self.auth_plugin_name);
        }

        w.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_encodes_username_and_auth_response() {
        let resp = HandshakeResponse {
            capabilities: Capabilities::baseline(true) | Capabilities::PLUGIN_AUTH,
            max_packet_size: 16_777_216,
            character_set: 45,
            username: "root",
            auth_response: &[1, 2, 3],
            database: Some("test"),
            auth_plugin_name: "mysql_native_password",
        };

        let bytes = resp.encode();
        assert!(bytes.windows(4).any(|w| w == b"root"));
        assert!(bytes.windows(4).any(|w| w == b"test"));
        assert!(bytes
            .windows(b"mysql_native_password".len())
            .any(|w| w == b"mysql_native_password"));
    }
}
