//! Packet framer.
//!
//! Reads and writes length-prefixed protocol packets with a rolling
//! sequence id, respecting split (`0xFFFFFF`-length) and compressed-zero
//! -length packets per spec.md §4.2.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{err_protocol, Result};

/// Maximum payload that fits in a single header (2^24 - 1).
pub const MAX_PAYLOAD_LEN: usize = 0xFF_FFFF;

/// A framed unit of the protocol: the concatenated payload of one or more
/// wire packets plus the sequence id of the first fragment.
#[derive(Debug, Clone)]
pub struct Packet {
    pub sequence_id: u8,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn first_byte(&self) -> Option<u8> {
        self.payload.first().copied()
    }
}

/// Reads one logical packet from `stream`, concatenating continuation
/// fragments. Returns `Ok(None)` on a clean end-of-stream, which the
/// channel treats as a fatal, close-triggering condition.
pub async fn read_packet<S>(stream: &mut S) -> Result<Option<Packet>>
where
    S: AsyncRead + Unpin,
{
    let mut sequence_id = None;
    let mut payload = Vec::new();

    loop {
        let mut header = [0u8; 4];
        match read_exact_or_eof(stream, &mut header).await? {
            None if payload.is_empty() && sequence_id.is_none() => return Ok(None),
            None => return Err(err_protocol!("end of stream mid-packet")),
            Some(()) => {}
        }

        let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
        let seq = header[3];

        if sequence_id.is_none() {
            sequence_id = Some(seq);
        }

        let mut fragment = vec![0u8; len];
        stream
            .read_exact(&mut fragment)
            .await
            .map_err(crate::error::Error::Unexpected)?;
        payload.extend_from_slice(&fragment);

        if len < MAX_PAYLOAD_LEN {
            break;
        }
    }

    Ok(Some(Packet {
        sequence_id: sequence_id.expect("set on first header read"),
        payload,
    }))
}

async fn read_exact_or_eof<S>(stream: &mut S, buf: &mut [u8]) -> Result<Option<()>>
where
    S: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream
            .read(&mut buf[filled..])
            .await
            .map_err(crate::error::Error::Unexpected)?;
        if n == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(err_protocol!("end of stream mid-header"))
            };
        }
        filled += n;
    }
    Ok(Some(()))
}

/// Writes `payload` as one or more wire packets starting at `sequence_id`,
/// splitting at [`MAX_PAYLOAD_LEN`] boundaries and terminating with a short
/// (possibly zero-length) packet, mirroring the inverse of [`read_packet`].
pub async fn write_packet<S>(stream: &mut S, sequence_id: &mut u8, payload: &[u8]) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let mut offset = 0;
    loop {
        let remaining = payload.len() - offset;
        let chunk_len = remaining.min(MAX_PAYLOAD_LEN);
        let chunk = &payload[offset..offset + chunk_len];

        let mut header = [0u8; 4];
        header[0] = (chunk_len & 0xFF) as u8;
        header[1] = ((chunk_len >> 8) & 0xFF) as u8;
        header[2] = ((chunk_len >> 16) & 0xFF) as u8;
        header[3] = *sequence_id;

        stream.write_all(&header).await.map_err(crate::error::Error::Unexpected)?;
        stream.write_all(chunk).await.map_err(crate::error::Error::Unexpected)?;

        *sequence_id = sequence_id.wrapping_add(1);
        offset += chunk_len;

        if chunk_len < MAX_PAYLOAD_LEN {
            break;
        }
    }
    stream.flush().await.map_err(crate::error::Error::Unexpected)?;
    Ok(())
}
