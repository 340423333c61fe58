//! Little-endian fixed and length-encoded int/string reader and writer over
//! a packet payload buffer.
//!
//! Mirrors `sqlx-mysql`'s `io::buf_ext` module but folds the read and write
//! halves into one pair of traits so the rest of the crate has a single
//! import instead of `BufExt`/`BufMutExt`.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{err_protocol, Error, Result};

/// Cursor over an immutable packet payload.
///
/// All reads that would exceed the payload bound fail with
/// [`Error::MalformedPacket`]; the codec never allocates beyond the size of
/// the item being decoded.
pub struct PayloadReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Absolute seek.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.buf.len() {
            return Err(err_protocol!(
                "seek to {} out of bounds for payload of length {}",
                pos,
                self.buf.len()
            ));
        }
        self.pos = pos;
        Ok(())
    }

    pub fn has_remaining(&self) -> bool {
        self.pos < self.buf.len()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(err_protocol!(
                "unexpected end of packet: wanted {} bytes, only {} remaining",
                n,
                self.remaining()
            ));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// A single unsigned byte.
    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Fixed-length little-endian unsigned integer, 1 to 8 bytes. An 8-byte
    /// read whose high bit is set is rejected to stay within signed 64-bit
    /// range, matching the contract in spec.md §4.1.
    pub fn get_uint(&mut self, len: usize) -> Result<u64> {
        assert!((1..=8).contains(&len), "int width must be 1..=8");
        let bytes = self.take(len)?;
        let value = LittleEndian::read_uint(bytes, len);
        if len == 8 && value & (1 << 63) != 0 {
            return Err(err_protocol!(
                "8-byte integer {:#x} has the high bit set",
                value
            ));
        }
        Ok(value)
    }

    /// Length-encoded integer. `0xFB` is the NULL sentinel and is rejected
    /// here; callers that need to distinguish NULL should peek with
    /// [`PayloadReader::get_uint_lenenc_or_null`] instead.
    pub fn get_uint_lenenc(&mut self) -> Result<u64> {
        self.get_uint_lenenc_or_null()?
            .ok_or_else(|| err_protocol!("unexpected NULL sentinel in length-encoded integer"))
    }

    /// Length-encoded integer which may be the NULL sentinel (`0xFB`).
    pub fn get_uint_lenenc_or_null(&mut self) -> Result<Option<u64>> {
        Ok(match self.get_u8()? {
            0xFB => None,
            0xFC => Some(self.get_uint(2)?),
            0xFD => Some(self.get_uint(3)?),
            0xFE => Some(self.get_uint(8)?),
            value => Some(value as u64),
        })
    }

    /// Fixed-length byte slice.
    pub fn get_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    /// Remainder of the packet, as bytes.
    pub fn get_rest(&mut self) -> &'a [u8] {
        let rest = &self.buf[self.pos..];
        self.pos = self.buf.len();
        rest
    }

    /// NUL-terminated string.
    pub fn get_str_nul(&mut self) -> Result<&'a str> {
        let rest = &self.buf[self.pos..];
        let end = memchr::memchr(0, rest)
            .ok_or_else(|| err_protocol!("expected NUL-terminated string, found none"))?;
        let s = std::str::from_utf8(&rest[..end])
            .map_err(|e| err_protocol!("invalid UTF-8 in string: {}", e))?;
        self.pos += end + 1;
        Ok(s)
    }

    /// Length-encoded string.
    pub fn get_str_lenenc(&mut self) -> Result<&'a str> {
        let len = self.get_uint_lenenc()? as usize;
        let bytes = self.get_bytes(len)?;
        std::str::from_utf8(bytes).map_err(|e| err_protocol!("invalid UTF-8 in string: {}", e))
    }

    /// Rest-of-packet string.
    pub fn get_str_eof(&mut self) -> Result<&'a str> {
        let bytes = self.get_rest();
        std::str::from_utf8(bytes).map_err(|e| err_protocol!("invalid UTF-8 in string: {}", e))
    }
}

/// Pre-sized payload writer, symmetric with [`PayloadReader`].
pub struct PayloadWriter {
    buf: Vec<u8>,
}

impl PayloadWriter {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_uint(&mut self, v: u64, len: usize) {
        assert!((1..=8).contains(&len), "int width must be 1..=8");
        let start = self.buf.len();
        self.buf.resize(start + len, 0);
        LittleEndian::write_uint(&mut self.buf[start..], v, len);
    }

    pub fn put_uint_lenenc(&mut self, v: u64) {
        if v < 0xFB {
            self.put_u8(v as u8);
        } else if v <= 0xFFFF {
            self.put_u8(0xFC);
            self.put_uint(v, 2);
        } else if v <= 0xFF_FFFF {
            self.put_u8(0xFD);
            self.put_uint(v, 3);
        } else {
            self.put_u8(0xFE);
            self.put_uint(v, 8);
        }
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn put_str_nul(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
    }

    pub fn put_str_lenenc(&mut self, s: &str) {
        self.put_uint_lenenc(s.len() as u64);
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn put_str_eof(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }
}
