//! Wire codec for the database's JSON-RPC dialect.
//!
//! Outbound envelopes are built as compact JSON strings; inbound messages
//! decode into an [`Envelope`] classified by the `id` field, then into typed
//! receipts and per-table row records.

mod envelope;
mod receipt;
mod rows;

pub use envelope::DeleteKey;
pub(crate) use envelope::{
    Envelope, delete_request, insert_request, monitor_cancel_request, monitor_request,
};
pub use receipt::{Receipt, ReceiptKind};
pub(crate) use rows::decode_row_change;
