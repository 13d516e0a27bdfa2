//! Error types surfaced by the database client.

use std::io;

use thiserror::Error;

use ovsgate_types::UnknownTable;

/// Errors raised while connecting to, writing to, or reading from the
/// database socket. Transport errors are fatal to the connection.
#[derive(Debug, Error)]
pub enum DbError {
    /// Resolving a TCP endpoint failed.
    #[error("failed to resolve database address {endpoint}: {source}")]
    Resolve {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    /// A TCP endpoint resolved to no usable address.
    #[error("no addresses resolved for {endpoint}")]
    ResolveEmpty { endpoint: String },
    /// Establishing the connection failed.
    #[error("failed to connect to database at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    /// Switching the stream into non-blocking mode failed.
    #[error("failed to enable non-blocking mode: {source}")]
    NonBlocking {
        #[source]
        source: io::Error,
    },
    /// Cloning the stream for the listener failed.
    #[error("failed to clone the database stream: {source}")]
    CloneStream {
        #[source]
        source: io::Error,
    },
    /// Writing a request failed.
    #[error("failed to write to the database socket: {source}")]
    Write {
        #[source]
        source: io::Error,
    },
    /// Reading from the socket failed.
    #[error("failed to read from the database socket: {source}")]
    Read {
        #[source]
        source: io::Error,
    },
    /// Waiting for socket readiness failed.
    #[error("failed to wait for socket readiness: {source}")]
    Poll {
        #[source]
        source: io::Error,
    },
    /// The database closed the connection.
    #[error("database connection closed by peer")]
    Disconnected,
    /// The listener thread panicked.
    #[error("database listener thread panicked")]
    ListenerPanic,
}

/// Errors raised while decoding inbound wire messages.
///
/// These are local to the offending message: the listener logs them and
/// keeps processing, per the protocol-error taxonomy.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The message is not a JSON object.
    #[error("message is not a JSON object")]
    NotAnObject,
    /// The message carries no `id` field at all.
    #[error("message carries no 'id' field")]
    MissingId,
    /// A null-id message used a method other than `update`.
    #[error("unsupported notification method '{0}'")]
    UnsupportedMethod(String),
    /// A field did not have the expected shape.
    #[error("malformed {context}")]
    Malformed { context: &'static str },
    /// The message named a table this client does not track.
    #[error(transparent)]
    UnknownTable(#[from] UnknownTable),
}

impl CodecError {
    pub(crate) const fn malformed(context: &'static str) -> Self {
        Self::Malformed { context }
    }
}
