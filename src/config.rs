//! The configuration surface consumed by the core (spec.md §6).

use std::time::Duration;

use crate::error::{Error, Result};

/// Immutable connection-level configuration.
///
/// Invariant: `host` is non-empty, `username` is non-empty.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    /// Session character-set id; default 45 (utf8mb4).
    pub character_set: u8,
    /// Extra capability bits to request, on top of the baseline set.
    pub capability_flags: u64,
    /// Heartbeat interval in seconds; `<= 0` disables heartbeats.
    pub ping_period_secs: i64,
    pub socket: SocketConfig,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 3306,
            database: String::new(),
            username: username.into(),
            password: password.into(),
            character_set: 45,
            capability_flags: 0,
            ping_period_secs: 30,
            socket: SocketConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::invalid_argument("host must not be empty"));
        }
        if self.username.is_empty() {
            return Err(Error::invalid_argument("username must not be empty"));
        }
        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        if self.ping_period_secs <= 0 {
            None
        } else {
            Some(Duration::from_secs(self.ping_period_secs as u64))
        }
    }
}

/// Socket-level timeouts and buffer sizing. The core only ever needs a
/// byte-stream with timeouts (spec.md §1); this struct is the input an
/// implementer's socket wrapper is built from.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub read_buffer_size: usize,
    pub write_buffer_size: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: None,
            write_timeout: None,
            read_buffer_size: 16 * 1024,
            write_buffer_size: 16 * 1024,
        }
    }
}

/// Pool-level configuration (spec.md §6).
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Fixed slot count; must be > 0.
    pub pool_size: usize,
    /// `0` = infinite.
    pub checkout_timeout: Duration,
    /// `0` = infinite; input to the leak detector.
    pub max_occupy_time: Duration,
    /// Per-command timeout; `0` = infinite.
    pub command_timeout: Duration,
    pub slow_execution_threshold: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: 10,
            checkout_timeout: Duration::from_secs(30),
            max_occupy_time: Duration::ZERO,
            command_timeout: Duration::from_secs(30),
            slow_execution_threshold: Duration::from_millis(500),
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::invalid_argument("poolSize must be > 0"));
        }
        Ok(())
    }
}
