//! Default values targeting a stock Open vSwitch installation.

use crate::endpoint::DbEndpoint;

/// Well-known path of the OVSDB unix socket.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/openvswitch/db.sock";

/// Database name addressed by default.
pub const DEFAULT_DATABASE: &str = "Open_vSwitch";

/// Listener poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Blocking-submission deadline in milliseconds.
pub const DEFAULT_BLOCK_TIMEOUT_MS: u64 = 3000;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Computes the default database endpoint.
#[must_use]
pub fn default_endpoint() -> DbEndpoint {
    DbEndpoint::unix(DEFAULT_SOCKET_PATH)
}
