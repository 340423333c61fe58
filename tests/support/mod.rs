//! Hand-rolled wire-format helpers for a fake MySQL server, shared by the
//! integration tests. Deliberately independent of the crate's own (private)
//! `packet`/`codec` modules, the way a black-box integration test should be.

#![allow(dead_code)]

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub fn frame(seq: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + payload.len());
    let len = payload.len();
    out.push((len & 0xFF) as u8);
    out.push(((len >> 8) & 0xFF) as u8);
    out.push(((len >> 16) & 0xFF) as u8);
    out.push(seq);
    out.extend_from_slice(payload);
    out
}

pub fn greeting_bytes(connection_id: u32) -> Vec<u8> {
    // Capabilities: PROTOCOL_41 | PLUGIN_AUTH | SECURE_CONNECTION |
    // TRANSACTIONS | LONG_PASSWORD | LONG_FLAG | CONNECT_WITH_DB.
    const CAPS: u64 = (1 << 9) | (1 << 19) | (1 << 15) | (1 << 13) | 1 | (1 << 2) | (1 << 3);

    let mut buf = Vec::new();
    buf.push(10); // protocol version
    buf.extend_from_slice(b"8.0.34\0");
    buf.extend_from_slice(&connection_id.to_le_bytes());
    buf.extend_from_slice(&[1u8; 8]); // auth-plugin-data-part-1
    buf.push(0); // filler
    buf.extend_from_slice(&((CAPS & 0xFFFF) as u16).to_le_bytes());
    buf.push(45); // character set
    buf.extend_from_slice(&0u16.to_le_bytes()); // status
    buf.extend_from_slice(&(((CAPS >> 16) & 0xFFFF) as u16).to_le_bytes());
    buf.push(21); // auth-plugin-data-len
    buf.extend_from_slice(&[0u8; 10]); // reserved
    buf.extend_from_slice(&[1u8; 12]); // auth-plugin-data-part-2
    buf.push(0);
    buf.extend_from_slice(b"mysql_native_password\0");
    buf
}

pub fn ok_packet(status: u16) -> Vec<u8> {
    let mut payload = vec![0x00, 0x00, 0x00];
    payload.extend_from_slice(&status.to_le_bytes());
    payload.extend_from_slice(&0u16.to_le_bytes()); // warnings
    payload
}

pub fn eof_packet(status: u16) -> Vec<u8> {
    let mut payload = vec![0xFE, 0x00, 0x00];
    payload.extend_from_slice(&status.to_le_bytes());
    payload
}

pub async fn read_packet(stream: &mut TcpStream) -> (u8, Vec<u8>) {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await.expect("read header");
    let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.expect("read payload");
    (header[3], payload)
}

pub async fn write_frame(stream: &mut TcpStream, seq: u8, payload: &[u8]) {
    stream.write_all(&frame(seq, payload)).await.expect("write frame");
}

/// Performs the server side of a handshake: sends the greeting, reads (and
/// discards) the client's response, and replies with OK. Returns the next
/// free sequence id for the caller's own exchanges.
pub async fn do_handshake(stream: &mut TcpStream, connection_id: u32) -> u8 {
    write_frame(stream, 0, &greeting_bytes(connection_id)).await;
    let (_seq, _response) = read_packet(stream).await;
    write_frame(stream, 2, &ok_packet(0)).await;
    3
}

pub async fn bind_loopback() -> (TcpListener, std::net::SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    (listener, addr)
}
