//! Declarative configuration shared by the ovsgate crates.
//!
//! Configuration is a plain serde structure: where the database socket
//! lives, which database to address, how often the listener polls for
//! inbound data, how long a blocking call waits, and how the process logs.
//! Defaults target a stock Open vSwitch installation so most deployments
//! construct [`Config::default`] and override nothing.

mod defaults;
mod endpoint;
mod logging;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_BLOCK_TIMEOUT_MS, DEFAULT_DATABASE, DEFAULT_LOG_FILTER, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_SOCKET_PATH, default_endpoint,
};
pub use endpoint::{DbEndpoint, EndpointParseError};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration for a database client.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Socket endpoint the database listens on.
    pub endpoint: DbEndpoint,
    /// Database name addressed by every transact and monitor request.
    pub database: String,
    /// Listener poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Deadline for blocking submissions in milliseconds.
    pub block_timeout_ms: u64,
    /// Log filter expression handed to the telemetry subscriber.
    pub log_filter: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            database: DEFAULT_DATABASE.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            block_timeout_ms: DEFAULT_BLOCK_TIMEOUT_MS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Builds a configuration addressing the given endpoint, leaving every
    /// other field at its default.
    #[must_use]
    pub fn with_endpoint(endpoint: DbEndpoint) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }

    /// Interval the listener waits for inbound data before re-checking the
    /// shutdown flag.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Deadline applied to blocking submissions.
    #[must_use]
    pub const fn block_timeout(&self) -> Duration {
        Duration::from_millis(self.block_timeout_ms)
    }
}
