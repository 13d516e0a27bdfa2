//! Identifiers for the database tables the agent exchanges.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Database tables understood by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OvsTable {
    /// Gateway configuration requests submitted by components.
    GatewayConfig,
    /// Completion feedback written by the agent applying a configuration.
    Feedback,
}

impl OvsTable {
    /// Table name as it appears on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GatewayConfig => "Gateway_Config",
            Self::Feedback => "Feedback",
        }
    }
}

impl fmt::Display for OvsTable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

impl FromStr for OvsTable {
    type Err = UnknownTable;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "Gateway_Config" => Ok(Self::GatewayConfig),
            "Feedback" => Ok(Self::Feedback),
            other => Err(UnknownTable(other.to_string())),
        }
    }
}

/// Raised when a wire message names a table this client does not track.
#[derive(Debug, Error)]
#[error("unknown database table '{0}'")]
pub struct UnknownTable(pub String);
