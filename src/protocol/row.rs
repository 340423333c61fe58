//! A text-protocol row packet.
//!
//! Decoding into typed values is out of scope (spec.md §1); the one piece
//! of the row format the channel itself cares about is the NULL sentinel,
//! since a row whose first length-encoded integer is `0xFB` represents SQL
//! `NULL` for that column and must not be mistaken for a length.

/// Peeks the first column of `payload` and reports whether it is the NULL
/// sentinel, without consuming/decoding the rest of the row.
pub fn first_column_is_null(payload: &[u8]) -> bool {
    payload.first() == Some(&0xFB)
}
