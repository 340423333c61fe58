//! The I/O worker loop (spec.md §4.5): the only task that ever touches the
//! socket or the waiting queue.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};

use super::Inner;
use crate::command::{CommandBody, Ping, QueuedCommand};
use crate::error::{Error, Result};
use crate::packet;

pub(super) async fn run(
    inner: Arc<Inner>,
    mut stream: TcpStream,
    mut submit_rx: mpsc::UnboundedReceiver<QueuedCommand>,
    close_notify: Arc<Notify>,
) {
    let mut waiting: VecDeque<QueuedCommand> = VecDeque::new();
    let heartbeat = inner.config.heartbeat_interval();

    'outer: loop {
        let current = tokio::select! {
            biased;
            _ = close_notify.notified() => break 'outer,
            dequeued = dequeue_next(&mut submit_rx, heartbeat) => match dequeued {
                Next::Command(cmd) => cmd,
                Next::HeartbeatDue => synthesize_ping(&inner),
                Next::SenderDropped => break 'outer,
            },
        };

        let Some(mut current) = current else {
            continue;
        };

        let request = current.request_bytes().to_vec();
        let mut sequence_id = 0u8;
        let write_result = match inner.config.socket.write_timeout {
            Some(d) => tokio::time::timeout(d, packet::write_packet(&mut stream, &mut sequence_id, &request))
                .await
                .unwrap_or(Err(Error::Timeout(d))),
            None => packet::write_packet(&mut stream, &mut sequence_id, &request).await,
        };
        if let Err(e) = write_result {
            current.complete_err(clone_err(&e));
            close_and_drain(&inner, &mut waiting, &mut submit_rx);
            break 'outer;
        }
        inner.metrics.record_bytes_written(request.len() as u64);

        if current.expects_response() {
            waiting.push_back(current);
        }

        loop {
            if waiting.is_empty() {
                break;
            }

            let read_result = tokio::select! {
                biased;
                _ = close_notify.notified() => {
                    close_and_drain(&inner, &mut waiting, &mut submit_rx);
                    break 'outer;
                }
                result = read_with_timeout(&inner, &mut stream) => result,
            };

            match read_result {
                Ok(Some(packet)) => {
                    inner.metrics.record_bytes_read(packet.payload.len() as u64);
                    let capabilities = inner.info.capabilities;
                    let front = waiting.front_mut().expect("just checked non-empty");
                    if front.feed(capabilities, packet) {
                        waiting.pop_front();
                    }
                }
                Ok(None) => {
                    close_and_drain(&inner, &mut waiting, &mut submit_rx);
                    break 'outer;
                }
                Err(Error::Unexpected(ref io_err))
                    if io_err.kind() == std::io::ErrorKind::Interrupted =>
                {
                    continue;
                }
                Err(e) => {
                    tracing::warn!(host = %inner.host, error = %e, "I/O worker read failed");
                    close_and_drain(&inner, &mut waiting, &mut submit_rx);
                    break 'outer;
                }
            }
        }
    }

    // The worker is the socket's sole owner; dropping `stream` here
    // releases it. Make sure every path out of this function has already
    // transitioned the channel to CLOSED and drained both queues.
    close_and_drain(&inner, &mut waiting, &mut submit_rx);
}

async fn read_with_timeout(
    inner: &Arc<Inner>,
    stream: &mut TcpStream,
) -> Result<Option<packet::Packet>> {
    match inner.config.socket.read_timeout {
        Some(d) => tokio::time::timeout(d, packet::read_packet(stream))
            .await
            .unwrap_or(Err(Error::Timeout(d))),
        None => packet::read_packet(stream).await,
    }
}

enum Next {
    Command(Option<QueuedCommand>),
    HeartbeatDue,
    SenderDropped,
}

async fn dequeue_next(
    rx: &mut mpsc::UnboundedReceiver<QueuedCommand>,
    heartbeat: Option<std::time::Duration>,
) -> Next {
    match heartbeat {
        Some(period) => tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(cmd) => Next::Command(Some(cmd)),
                None => Next::SenderDropped,
            },
            _ = tokio::time::sleep(period) => Next::HeartbeatDue,
        },
        None => match rx.recv().await {
            Some(cmd) => Next::Command(Some(cmd)),
            None => Next::SenderDropped,
        },
    }
}

/// Synthesizes a `Ping` command in place of a real dequeue, and spawns the
/// watcher task that closes the channel if the ping hasn't completed within
/// 5 seconds (spec.md §4.5, step 1).
fn synthesize_ping(inner: &Arc<Inner>) -> Option<QueuedCommand> {
    let (queued, handle) = QueuedCommand::new(Box::new(Ping::new()) as Box<dyn CommandBody>);

    let watched_inner = inner.clone();
    tokio::spawn(async move {
        if handle.wait(std::time::Duration::from_secs(5)).await.is_err() {
            tracing::warn!(
                host = %watched_inner.host,
                connection_id = watched_inner.info.connection_id,
                "heartbeat ping did not complete in time; closing channel"
            );
            super::Channel { inner: watched_inner }.close();
        }
    });

    Some(queued)
}

fn clone_err(e: &Error) -> Error {
    match e {
        Error::Server { code, sql_state, message } => Error::Server {
            code: *code,
            sql_state: sql_state.clone(),
            message: message.clone(),
        },
        Error::Timeout(d) => Error::Timeout(*d),
        Error::Closed => Error::Closed,
        Error::PoolExhausted => Error::PoolExhausted,
        Error::InvalidArgument(s) => Error::InvalidArgument(s.clone()),
        Error::MalformedPacket(s) => Error::MalformedPacket(s.clone()),
        Error::SocketBuild { host, source } => Error::SocketBuild {
            host: host.clone(),
            source: std::io::Error::new(source.kind(), source.to_string()),
        },
        Error::Unexpected(e) => Error::Unexpected(std::io::Error::new(e.kind(), e.to_string())),
    }
}

/// Transitions to `CLOSED` (if not already) and completes every command
/// left in the waiting and submission queues with `ClosedState`.
fn close_and_drain(
    inner: &Arc<Inner>,
    waiting: &mut VecDeque<QueuedCommand>,
    submit_rx: &mut mpsc::UnboundedReceiver<QueuedCommand>,
) {
    super::Channel { inner: inner.clone() }.close();

    while let Some(mut cmd) = waiting.pop_front() {
        cmd.close();
    }

    while let Ok(mut cmd) = submit_rx.try_recv() {
        cmd.close();
    }
}
