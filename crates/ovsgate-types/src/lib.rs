//! Domain types shared across the ovsgate workspace.
//!
//! The database exchanges rows for two tables: `Gateway_Config`, describing
//! a network interface the gateway should realise, and `Feedback`, reporting
//! the outcome of a previously submitted configuration. The types here carry
//! those rows between the wire codec, the correlation layers, and callers,
//! together with the status and table identifiers both sides agree on.

mod feedback;
mod gateway;
mod record;
mod status;
mod tables;

pub use feedback::Feedback;
pub use gateway::{
    DEFAULT_MTU, DEFAULT_VLAN_ID, GatewayConfig, InterfaceCommand, InterfaceType,
};
pub use record::TableRecord;
pub use status::OvsStatus;
pub use tables::{OvsTable, UnknownTable};
