//! Error types surfaced by the agent API.

use thiserror::Error;

use ovsgate_db::DbError;
use ovsgate_types::OvsTable;

/// Errors returned by [`crate::OvsAgent`] entry points.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Establishing the database connection failed.
    #[error("failed to connect to the database: {source}")]
    Connect {
        #[source]
        source: DbError,
    },
    /// Writing a submission to the transport failed; the transaction was
    /// rolled back.
    #[error("failed to submit request {rid}: {source}")]
    Submit {
        rid: String,
        #[source]
        source: DbError,
    },
    /// Registering a monitor subscription failed.
    #[error("failed to monitor table {table}: {source}")]
    Monitor {
        table: OvsTable,
        #[source]
        source: DbError,
    },
    /// Cancelling a monitor subscription failed.
    #[error("failed to cancel monitor {monitor_id}: {source}")]
    MonitorCancel {
        monitor_id: String,
        #[source]
        source: DbError,
    },
    /// Shutting the database client down failed.
    #[error("database shutdown failed: {source}")]
    Shutdown {
        #[source]
        source: DbError,
    },
}
