//! The handshake driver (spec.md §4.3): blocks on exactly one read (the
//! server greeting), then writes the client response and reads exactly one
//! reply packet.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::auth;
use crate::config::ConnectionConfig;
use crate::error::{err_protocol, Error, Result};
use crate::packet;
use crate::protocol::err::ErrPacket;
use crate::protocol::handshake::Handshake;
use crate::protocol::handshake_response::HandshakeResponse;
use crate::protocol::Capabilities;

/// Everything learned about the server once the handshake completes.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub connection_id: u32,
    pub server_version: String,
    pub server_version_parts: (u32, u32, u32),
    pub server_character_set: u8,
    pub capabilities: Capabilities,
    pub character_set: u8,
    pub database: String,
}

/// Performs the initial server-greeting/client-response exchange over
/// `stream` and returns the resulting [`ConnectionInfo`].
pub async fn perform<S>(stream: &mut S, config: &ConnectionConfig) -> Result<ConnectionInfo>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let greeting_packet = timed_read(stream, config)
        .await?
        .ok_or_else(|| err_protocol!("connection closed before the server greeting"))?;

    let greeting = Handshake::decode(&greeting_packet.payload)?;

    let plugin = auth::lookup(&greeting.auth_plugin_name)?;
    let auth_response = plugin.encode(&config.password, &greeting.auth_plugin_data);

    let want_database = !config.database.is_empty();
    let mut capabilities =
        Capabilities::baseline(want_database) & greeting.capabilities | Capabilities::PLUGIN_AUTH;
    capabilities = capabilities | Capabilities::from_bits_truncate(config.capability_flags);

    let response = HandshakeResponse {
        capabilities,
        max_packet_size: 16 * 1024 * 1024,
        character_set: config.character_set,
        username: &config.username,
        auth_response: &auth_response,
        database: want_database.then_some(config.database.as_str()),
        auth_plugin_name: &greeting.auth_plugin_name,
    };

    let mut sequence_id = greeting_packet.sequence_id.wrapping_add(1);
    timed_write(stream, config, &mut sequence_id, &response.encode()).await?;

    let reply = timed_read(stream, config)
        .await?
        .ok_or_else(|| err_protocol!("connection closed before the handshake reply"))?;

    match reply.first_byte() {
        Some(0xFF) => {
            let err = ErrPacket::decode(&reply.payload)?;
            Err(Error::Server {
                code: err.error_code,
                sql_state: err.sql_state,
                message: err.error_message,
            })
        }
        _ => Ok(ConnectionInfo {
            connection_id: greeting.connection_id,
            server_version: greeting.server_version.clone(),
            server_version_parts: greeting.parsed_version(),
            server_character_set: greeting.character_set,
            capabilities,
            character_set: config.character_set,
            database: config.database.clone(),
        }),
    }
}

async fn timed_read<S>(stream: &mut S, config: &ConnectionConfig) -> Result<Option<packet::Packet>>
where
    S: AsyncRead + Unpin,
{
    match config.socket.read_timeout {
        Some(d) => tokio::time::timeout(d, packet::read_packet(stream))
            .await
            .unwrap_or(Err(Error::Timeout(d))),
        None => packet::read_packet(stream).await,
    }
}

async fn timed_write<S>(
    stream: &mut S,
    config: &ConnectionConfig,
    sequence_id: &mut u8,
    payload: &[u8],
) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    match config.socket.write_timeout {
        Some(d) => tokio::time::timeout(d, packet::write_packet(stream, sequence_id, payload))
            .await
            .unwrap_or(Err(Error::Timeout(d))),
        None => packet::write_packet(stream, sequence_id, payload).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Status;
    use tokio::io::duplex;

    fn greeting_bytes(connection_id: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(10);
        buf.extend_from_slice(b"8.0.34\0");
        buf.extend_from_slice(&connection_id.to_le_bytes());
        buf.extend_from_slice(&[1u8; 8]);
        buf.push(0);

        let caps = Capabilities::baseline(true) | Capabilities::PLUGIN_AUTH;
        buf.extend_from_slice(&((caps.bits() & 0xFFFF) as u16).to_le_bytes());
        buf.push(45);
        buf.extend_from_slice(&Status::default().bits().to_le_bytes());
        buf.extend_from_slice(&(((caps.bits() >> 16) & 0xFFFF) as u16).to_le_bytes());
        buf.push(21);
        buf.extend_from_slice(&[0u8; 10]);
        buf.extend_from_slice(&[1u8; 12]);
        buf.push(0);
        buf.extend_from_slice(b"mysql_native_password\0");
        buf
    }

    fn frame(seq: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let len = payload.len();
        out.push((len & 0xFF) as u8);
        out.push(((len >> 8) & 0xFF) as u8);
        out.push(((len >> 16) & 0xFF) as u8);
        out.push(seq);
        out.extend_from_slice(payload);
        out
    }

    #[tokio::test]
    async fn it_completes_a_handshake_against_an_ok_reply() {
        let (mut client, mut server) = duplex(4096);

        let config = ConnectionConfig::new("localhost", "root", "");

        let server_task = tokio::spawn(async move {
            use tokio::io::{AsyncReadExt, AsyncWriteExt};

            server.write_all(&frame(0, &greeting_bytes(99))).await.unwrap();

            // Drain the client's handshake response (we don't need its
            // content for this test).
            let mut header = [0u8; 4];
            server.read_exact(&mut header).await.unwrap();
            let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
            let mut payload = vec![0u8; len];
            server.read_exact(&mut payload).await.unwrap();

            // OK packet.
            server.write_all(&frame(2, &[0x00, 0x00, 0x00, 0x02, 0x00, 0x00])).await.unwrap();
        });

        let info = perform(&mut client, &config).await.unwrap();
        assert_eq!(info.connection_id, 99);
        assert_eq!(info.server_version, "8.0.34");

        server_task.await.unwrap();
    }
}
