//! Status codes reported by agent operations and callbacks.

use std::fmt;

/// Outcome of an agent operation, callback, or database interaction.
///
/// The numeric codes travel in `Feedback` rows, so the mapping is part of
/// the wire contract and must stay stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OvsStatus {
    /// Operation completed successfully.
    Success,
    /// Outcome not yet known (operation still pending).
    #[default]
    Unknown,
    /// Operation failed.
    Failed,
    /// Operation did not complete within its deadline.
    TimedOut,
    /// Waiting on a timed operation failed for a reason other than the
    /// deadline elapsing.
    TimedWaitError,
}

impl OvsStatus {
    /// Wire code carried in `Feedback` rows.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Success => 0,
            Self::Unknown => 1,
            Self::Failed => 2,
            Self::TimedOut => 3,
            Self::TimedWaitError => 4,
        }
    }

    /// Decodes a wire code; unrecognised codes map to [`OvsStatus::Unknown`]
    /// so a newer peer never aborts row decoding.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Success,
            2 => Self::Failed,
            3 => Self::TimedOut,
            4 => Self::TimedWaitError,
            _ => Self::Unknown,
        }
    }

    /// Whether the status represents a finished, successful operation.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for OvsStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "success",
            Self::Unknown => "unknown",
            Self::Failed => "failed",
            Self::TimedOut => "timed out",
            Self::TimedWaitError => "timed wait error",
        };
        formatter.write_str(label)
    }
}
