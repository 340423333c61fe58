//! Recognising the legacy `EOF` packet used (when `deprecate-EOF` is not
//! negotiated) to separate column metadata from rows, and again to
//! terminate the row sequence.

pub fn looks_like_eof(payload: &[u8]) -> bool {
    matches!(payload.first(), Some(0xFE)) && payload.len() < 9
}
