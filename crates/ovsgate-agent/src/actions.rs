//! Policy seam between decoded configuration rows and host networking.

use ovsgate_types::{GatewayConfig, OvsStatus};

/// Applies a gateway configuration row to the host.
///
/// Implementations translate the row into whatever bridge, VLAN, GRE, port,
/// or flow changes it calls for and report the outcome. The agent invokes
/// `apply` on its listener thread, once per decoded `Gateway_Config` row, and
/// answers the database with a `Feedback` row carrying the returned status.
pub trait GatewayActions: Send + Sync + 'static {
    /// Realises one configuration row and reports the outcome.
    fn apply(&self, config: &GatewayConfig) -> OvsStatus;
}
