//! The kill task (spec.md §4.5, §9 glossary): a best-effort auxiliary
//! connection opened solely to ask the server to tear down a session this
//! client has abandoned after a command timeout.

use std::time::Duration;

use crate::command::Query;
use crate::config::ConnectionConfig;
use crate::monitor::Metrics;

const KILL_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a temporary channel to the same host with the same credentials
/// and issues `KILL <connection_id>`, logging the outcome either way. Fire
/// -and-forget: the caller whose command timed out has already moved on.
pub(super) fn spawn(config: ConnectionConfig, connection_id: u32) {
    tokio::spawn(async move {
        let metrics = std::sync::Arc::new(Metrics::default());
        let host = config.host.clone();

        let channel = match super::Channel::connect(config, metrics).await {
            Ok(channel) => channel,
            Err(e) => {
                tracing::warn!(host, connection_id, error = %e, "kill task failed to connect");
                return;
            }
        };

        let sql = format!("KILL {connection_id}");
        let result = channel
            .send(Box::new(Query::new(&sql)), KILL_TIMEOUT)
            .await;

        match result {
            Ok(_) => tracing::info!(host, connection_id, "kill task succeeded"),
            Err(e) => tracing::warn!(host, connection_id, error = %e, "kill task failed"),
        }

        channel.close();
    });
}
