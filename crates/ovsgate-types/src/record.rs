//! Tagged union over the row shapes the database exchanges.

use crate::feedback::Feedback;
use crate::gateway::GatewayConfig;
use crate::tables::OvsTable;

/// A typed row belonging to one of the tracked tables.
///
/// The variant is resolved once, when a wire message's table name is parsed;
/// every later consumer matches on the tag instead of re-inspecting strings.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRecord {
    /// A `Gateway_Config` row.
    GatewayConfig(GatewayConfig),
    /// A `Feedback` row.
    Feedback(Feedback),
}

impl TableRecord {
    /// Table the record belongs to.
    #[must_use]
    pub const fn table(&self) -> OvsTable {
        match self {
            Self::GatewayConfig(_) => OvsTable::GatewayConfig,
            Self::Feedback(_) => OvsTable::Feedback,
        }
    }
}

impl From<GatewayConfig> for TableRecord {
    fn from(config: GatewayConfig) -> Self {
        Self::GatewayConfig(config)
    }
}

impl From<Feedback> for TableRecord {
    fn from(feedback: Feedback) -> Self {
        Self::Feedback(feedback)
    }
}
