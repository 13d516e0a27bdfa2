//! Feedback rows correlating completions back to configuration requests.

use crate::status::OvsStatus;

/// A `Feedback` row: the outcome of applying one `Gateway_Config` row.
///
/// `req_uuid` is the server-assigned identifier of the configuration row the
/// feedback answers, which is how completions find their transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feedback {
    /// Server-assigned identifier of the request being answered.
    pub req_uuid: String,
    /// Outcome of applying the configuration.
    pub status: OvsStatus,
}

impl Feedback {
    /// Builds a feedback row answering the given request identifier.
    #[must_use]
    pub fn new(req_uuid: impl Into<String>, status: OvsStatus) -> Self {
        Self {
            req_uuid: req_uuid.into(),
            status,
        }
    }
}
