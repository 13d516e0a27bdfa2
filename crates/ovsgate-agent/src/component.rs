//! Identities of the components sharing the database.

use std::fmt;

// Spreads each component's request ids into a distinct range.
const STARTING_ID_MULTIPLIER: u32 = 1000;

/// System components that interact with the gateway database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    /// Test application.
    TestApp,
    /// The gateway agent itself.
    Agent,
    /// Bridge utilities component.
    BridgeUtils,
    /// Mesh agent component.
    MeshAgent,
}

impl ComponentId {
    /// Numeric component code.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::TestApp => 1,
            Self::Agent => 2,
            Self::BridgeUtils => 3,
            Self::MeshAgent => 4,
        }
    }

    /// Seed for this component's request-id generator.
    ///
    /// Partitioning by multiplier keeps concurrent clients out of each
    /// other's id ranges without a central allocator; it is a heuristic,
    /// not a guarantee.
    #[must_use]
    pub const fn id_seed(self) -> u32 {
        self.code() * STARTING_ID_MULTIPLIER
    }

    /// Human-readable component label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::TestApp => "TestApp",
            Self::Agent => "OvsAgent",
            Self::BridgeUtils => "BridgeUtils",
            Self::MeshAgent => "MeshAgent",
        }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}
