//! Boundary scenario 3: a command that never gets a response times out,
//! closes its channel, and triggers a kill task that issues
//! `KILL <connection_id>` over a second connection.

mod support;

use std::time::{Duration, Instant};

use sqlx_mysql_channel::{Channel, ChannelState, ConnectionConfig, Query};
use tokio::sync::oneshot;

#[tokio::test]
async fn timeout_closes_the_channel_and_spawns_a_kill_task() {
    let (listener, addr) = support::bind_loopback().await;
    let (kill_seen_tx, kill_seen_rx) = oneshot::channel();

    tokio::spawn(async move {
        // First accepted connection: the one the test itself uses. It
        // completes the handshake, reads the query, and then stalls.
        let (mut primary, _) = listener.accept().await.expect("accept primary");
        tokio::spawn(async move {
            support::do_handshake(&mut primary, 42).await;
            let (_seq, payload) = support::read_packet(&mut primary).await;
            assert_eq!(payload[0], 0x03);
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(primary);
        });

        // Second accepted connection: the kill task's sibling channel.
        let (mut secondary, _) = listener.accept().await.expect("accept secondary");
        support::do_handshake(&mut secondary, 99).await;
        let (_seq, payload) = support::read_packet(&mut secondary).await;
        assert_eq!(payload[0], 0x03, "expected COM_QUERY for KILL");
        assert_eq!(&payload[1..], b"KILL 42");
        support::write_frame(&mut secondary, 3, &support::ok_packet(0)).await;
        let _ = kill_seen_tx.send(());
    });

    let mut config = ConnectionConfig::new(addr.ip().to_string(), "root", "");
    config.port = addr.port();

    let metrics = std::sync::Arc::new(sqlx_mysql_channel::Metrics::default());
    let channel = Channel::connect(config.clone(), metrics.clone())
        .await
        .expect("connect");

    let started = Instant::now();
    let result = channel
        .send(Box::new(Query::new("SELECT SLEEP(10)")), Duration::from_millis(100))
        .await;
    let elapsed = started.elapsed();

    assert!(result.is_err());
    assert!(
        elapsed < Duration::from_millis(500),
        "timeout should fire close to the 100ms budget, took {elapsed:?}"
    );
    assert_eq!(channel.state(), ChannelState::Closed);

    tokio::time::timeout(Duration::from_secs(5), kill_seen_rx)
        .await
        .expect("kill task should reach the server within 5s")
        .expect("kill task sender dropped unexpectedly");
}
