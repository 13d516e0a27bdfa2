//! Client engine for the gateway configuration database.
//!
//! The database speaks JSON-RPC over a stream socket. This crate owns that
//! conversation: a [`DbClient`] writes transact and monitor requests, while a
//! background listener thread reads whatever the database sends back and
//! routes each message by its `id` field — responses to the receipt table
//! that resolves them exactly once, table-change notifications to the
//! monitor table that fans them out to long-lived subscriptions.
//!
//! Correlation state is shared between the listener thread and arbitrary
//! calling threads, so every table operation takes a mutex and callbacks are
//! always invoked after the lock is released.

mod client;
mod codec;
mod errors;
mod ids;
mod listener;
mod monitors;
mod receipts;
mod socket;

pub use client::{ConnectionObserver, DbClient, LoggingObserver};
pub use codec::{DeleteKey, Receipt, ReceiptKind};
pub use errors::{CodecError, DbError};
pub use ids::RequestIdGenerator;
pub use monitors::{MonitorCallback, RowUpdate};
pub use receipts::ReceiptCallback;
