//! Caller-facing agent API over the gateway configuration database.
//!
//! Components submit [`TableRecord`](ovsgate_types::TableRecord)s through an
//! [`OvsAgent`]; each submission becomes a transaction that spans the insert
//! request, the server's uuid acknowledgement, and the eventual `Feedback`
//! notification reporting the applied outcome. Submissions run fire-and-forget
//! or block the calling thread until completion or timeout; either way the
//! completion callback observes the final status alongside the submitted
//! payload, and both database rows the transaction produced are cleaned up.
//!
//! The agent side of the conversation lives here too:
//! [`OvsAgent::serve_gateway_config`] watches the configuration table,
//! applies each row through a [`GatewayActions`] policy handler, and answers
//! with a `Feedback` row.

mod actions;
mod agent;
mod component;
mod errors;
pub mod telemetry;
mod transactions;

pub use actions::GatewayActions;
pub use agent::{BlockMode, OvsAgent};
pub use component::ComponentId;
pub use errors::AgentError;
pub use transactions::CompletionCallback;

pub use ovsgate_db::{MonitorCallback, RowUpdate};
