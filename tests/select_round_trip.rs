//! Boundary scenario 2: a `SELECT 1` round-trip against a fake server that
//! speaks exactly one legacy-EOF result set.

mod support;

use std::time::Duration;

use sqlx_mysql_channel::{Channel, ConnectionConfig, Query};

#[tokio::test]
async fn select_1_returns_the_expected_packet_sequence() {
    let (listener, addr) = support::bind_loopback().await;

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        support::do_handshake(&mut stream, 7).await;

        let (_seq, payload) = support::read_packet(&mut stream).await;
        assert_eq!(payload[0], 0x03, "expected COM_QUERY");
        assert_eq!(&payload[1..], b"SELECT 1");

        support::write_frame(&mut stream, 0, &[1]).await; // column count = 1
        support::write_frame(&mut stream, 1, &[0u8; 20]).await; // one column def
        support::write_frame(&mut stream, 2, &support::eof_packet(0)).await;
        support::write_frame(&mut stream, 3, &[1, b'1']).await; // one row
        support::write_frame(&mut stream, 4, &support::eof_packet(0)).await; // terminator
    });

    let mut config = ConnectionConfig::new(addr.ip().to_string(), "root", "");
    config.port = addr.port();

    let metrics = std::sync::Arc::new(sqlx_mysql_channel::Metrics::default());
    let channel = Channel::connect(config, metrics).await.expect("connect");

    let packets = channel
        .send(Box::new(Query::new("SELECT 1")), Duration::from_secs(2))
        .await
        .expect("query succeeds");

    // Every packet the worker reads while this command is at the head of
    // the waiting queue is accumulated, including the column-count packet
    // itself: [count, column def, EOF, row, terminating EOF].
    assert_eq!(packets.len(), 5);
    assert_eq!(packets[0].payload, vec![1]);
    assert_eq!(packets[1].payload, vec![0u8; 20]);
    assert_eq!(packets[3].payload, vec![1, b'1']);
}
