//! `COM_QUERY` (opcode `0x03`): the hardest command in spec.md §4.4 -- a
//! small state machine that reads a (possibly repeated) result set.

use crate::codec::PayloadReader;
use crate::command::CommandBody;
use crate::error::{err_protocol, Error, Result};
use crate::packet::Packet;
use crate::protocol::err::ErrPacket;
use crate::protocol::{eof, Capabilities, Status};

#[derive(Debug)]
enum State {
    /// Waiting for the first packet of a result set: ERR, OK, or a
    /// column-count packet.
    AwaitingFirst,
    /// Reading column-definition packets; `remaining` counts down to 0.
    ColumnDefs { remaining: u64 },
    /// `deprecate-EOF` is off: one EOF packet separates metadata from rows.
    AwaitingEofBeforeRows,
    /// Reading row packets until the terminator.
    Rows,
}

pub struct Query {
    request: Vec<u8>,
    state: State,
}

impl Query {
    pub fn new(sql: &str) -> Self {
        let mut request = Vec::with_capacity(1 + sql.len());
        request.push(0x03);
        request.extend_from_slice(sql.as_bytes());

        Query {
            request,
            state: State::AwaitingFirst,
        }
    }
}

fn status_from_eof(payload: &[u8]) -> Result<Status> {
    // EOF packet: header(1) + warnings(2) + status(2).
    let mut r = PayloadReader::new(payload);
    let _header = r.get_u8()?;
    let _warnings = r.get_uint(2)?;
    Ok(Status::from_bits_truncate(r.get_uint(2)? as u16))
}

impl CommandBody for Query {
    fn request_bytes(&self) -> &[u8] {
        &self.request
    }

    fn feed(&mut self, capabilities: Capabilities, packet: &Packet) -> Result<bool> {
        let deprecate_eof = capabilities.contains(Capabilities::DEPRECATE_EOF);
        let payload = &packet.payload;

        match self.state {
            State::AwaitingFirst => match payload.first() {
                Some(0xFF) => {
                    let err = ErrPacket::decode(payload)?;
                    Err(Error::Server {
                        code: err.error_code,
                        sql_state: err.sql_state,
                        message: err.error_message,
                    })
                }
                Some(0x00) => {
                    let ok = crate::protocol::ok::OkPacket::decode(payload, capabilities)?;
                    if ok.status.contains(Status::MORE_RESULTS_EXISTS) {
                        self.state = State::AwaitingFirst;
                        Ok(false)
                    } else {
                        Ok(true)
                    }
                }
                Some(_) => {
                    let mut r = PayloadReader::new(payload);
                    let column_count = r.get_uint_lenenc()?;
                    self.state = if column_count == 0 {
                        if deprecate_eof {
                            State::Rows
                        } else {
                            State::AwaitingEofBeforeRows
                        }
                    } else {
                        State::ColumnDefs {
                            remaining: column_count,
                        }
                    };
                    Ok(false)
                }
                None => Err(err_protocol!("empty packet while awaiting column count")),
            },

            State::ColumnDefs { remaining } => {
                let remaining = remaining
                    .checked_sub(1)
                    .ok_or_else(|| err_protocol!("received more column definitions than advertised"))?;

                self.state = if remaining == 0 {
                    if deprecate_eof {
                        State::Rows
                    } else {
                        State::AwaitingEofBeforeRows
                    }
                } else {
                    State::ColumnDefs { remaining }
                };
                Ok(false)
            }

            State::AwaitingEofBeforeRows => {
                if !eof::looks_like_eof(payload) {
                    return Err(err_protocol!(
                        "expected EOF packet separating metadata from rows"
                    ));
                }
                self.state = State::Rows;
                Ok(false)
            }

            State::Rows => {
                if payload.first() == Some(&0xFF) {
                    let err = ErrPacket::decode(payload)?;
                    return Err(Error::Server {
                        code: err.error_code,
                        sql_state: err.sql_state,
                        message: err.error_message,
                    });
                }

                let terminal_status = if !deprecate_eof && eof::looks_like_eof(payload) {
                    Some(status_from_eof(payload)?)
                } else if deprecate_eof
                    && crate::protocol::ok::OkPacket::looks_like_ok(payload, true)
                {
                    Some(crate::protocol::ok::OkPacket::decode(payload, capabilities)?.status)
                } else {
                    None
                };

                match terminal_status {
                    Some(status) if status.contains(Status::MORE_RESULTS_EXISTS) => {
                        self.state = State::AwaitingFirst;
                        Ok(false)
                    }
                    Some(_) => Ok(true),
                    None => Ok(false), // an ordinary row packet
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(payload: Vec<u8>) -> Packet {
        Packet {
            sequence_id: 0,
            payload,
        }
    }

    fn eof_packet(status: u16) -> Packet {
        let mut payload = vec![0xFE, 0x00, 0x00];
        payload.extend_from_slice(&status.to_le_bytes());
        packet(payload)
    }

    const CAPS_WITH_EOF: u64 = 0; // deprecate-EOF off
    fn caps(deprecate_eof: bool) -> Capabilities {
        if deprecate_eof {
            Capabilities::DEPRECATE_EOF
        } else {
            Capabilities::from_bits_truncate(CAPS_WITH_EOF)
        }
    }

    #[test]
    fn select_1_round_trip_with_legacy_eof() {
        let mut q = Query::new("SELECT 1");
        let c = caps(false);

        // column count = 1
        assert!(!q.feed(c, &packet(vec![1])).unwrap());
        // one column definition (opaque payload, any bytes)
        assert!(!q.feed(c, &packet(vec![0; 20])).unwrap());
        // EOF separating metadata from rows
        assert!(!q.feed(c, &eof_packet(0)).unwrap());
        // one row: single column "1"
        assert!(!q.feed(c, &packet(vec![1, b'1'])).unwrap());
        // terminating EOF, no more results
        assert!(q.feed(c, &eof_packet(0)).unwrap());
    }

    #[test]
    fn query_with_no_result_set_completes_on_ok() {
        let mut q = Query::new("UPDATE t SET x = 1");
        let c = caps(false);
        let mut ok_payload = vec![0x00, 0x01, 0x00];
        ok_payload.extend_from_slice(&0u16.to_le_bytes()); // status
        assert!(q.feed(c, &packet(ok_payload)).unwrap());
    }

    #[test]
    fn err_at_any_stage_terminates_with_error() {
        let mut q = Query::new("SELECT 1");
        let c = caps(false);
        let err_payload = b"\xff\x19\x04#42000boom".to_vec();
        assert!(q.feed(c, &packet(err_payload)).is_err());
    }

    #[test]
    fn more_results_exists_reenters_column_count_stage() {
        let mut q = Query::new("CALL proc()");
        let c = caps(false);

        assert!(!q.feed(c, &packet(vec![1])).unwrap());
        assert!(!q.feed(c, &packet(vec![0; 20])).unwrap());
        assert!(!q.feed(c, &eof_packet(0)).unwrap());
        assert!(!q.feed(c, &packet(vec![1, b'1'])).unwrap());
        // terminator carries MORE_RESULTS_EXISTS -> loop for a second result set
        assert!(!q.feed(c, &eof_packet(0x0008)).unwrap());

        // second result set: no rows, straight OK
        let mut ok_payload = vec![0x00, 0x00, 0x00];
        ok_payload.extend_from_slice(&0u16.to_le_bytes());
        assert!(q.feed(c, &packet(ok_payload)).unwrap());
    }

    #[test]
    fn deprecate_eof_uses_ok_packet_as_terminator() {
        let mut q = Query::new("SELECT 1");
        let c = caps(true);

        assert!(!q.feed(c, &packet(vec![1])).unwrap());
        assert!(!q.feed(c, &packet(vec![0; 20])).unwrap());
        assert!(!q.feed(c, &packet(vec![1, b'1'])).unwrap());

        let mut ok_payload = vec![0x00, 0x00, 0x00];
        ok_payload.extend_from_slice(&0u16.to_le_bytes());
        ok_payload.extend_from_slice(&0u16.to_le_bytes()); // warnings
        assert!(q.feed(c, &packet(ok_payload)).unwrap());
    }

    #[test]
    fn null_column_sentinel_is_detected_in_row_payload() {
        assert!(crate::protocol::row::first_column_is_null(&[0xFB]));
        assert!(!crate::protocol::row::first_column_is_null(&[0x01, b'1']));
    }
}
