//! Boundary scenario 6: many concurrent callers submitting to the same
//! channel still get back exactly one correctly-correlated response each,
//! because the worker drains one command's response before dequeuing the
//! next submission.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx_mysql_channel::{Channel, ConnectionConfig, Ping};

const TASKS: usize = 8;
const PINGS_PER_TASK: usize = 100;
const TOTAL: usize = TASKS * PINGS_PER_TASK;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_pings_are_all_answered_in_order() {
    let (listener, addr) = support::bind_loopback().await;

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        support::do_handshake(&mut stream, 1).await;

        for _ in 0..TOTAL {
            let (_seq, payload) = support::read_packet(&mut stream).await;
            assert_eq!(payload, vec![0x0E], "expected COM_PING");
            support::write_frame(&mut stream, 1, &support::ok_packet(0)).await;
        }
    });

    let mut config = ConnectionConfig::new(addr.ip().to_string(), "root", "");
    config.port = addr.port();

    let metrics = Arc::new(sqlx_mysql_channel::Metrics::default());
    let channel = Channel::connect(config, metrics).await.expect("connect");

    let ok_packets = Arc::new(AtomicUsize::new(0));
    let mut tasks = Vec::new();

    for _ in 0..TASKS {
        let channel = channel.clone();
        let ok_packets = ok_packets.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..PINGS_PER_TASK {
                let packets = channel
                    .send(Box::new(Ping::new()), Duration::from_secs(5))
                    .await
                    .expect("ping succeeds");
                ok_packets.fetch_add(packets.len(), Ordering::SeqCst);
            }
        }));
    }

    for task in tasks {
        task.await.expect("task panicked");
    }

    assert_eq!(ok_packets.load(Ordering::SeqCst), TOTAL);
}
