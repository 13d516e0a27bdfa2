//! Typed receipts decoded from response messages.

use std::fmt;

use serde_json::Value;

use crate::errors::CodecError;

/// Kind of request a pending receipt is waiting on.
///
/// The kind is fixed when the request is registered and selects the decoder
/// applied to the eventual response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptKind {
    /// Transact insert — the response carries a server-assigned uuid.
    Insert,
    /// Monitor registration — the response is an opaque success marker.
    Monitor,
    /// Monitor cancellation — the response is an opaque success marker.
    MonitorCancel,
    /// Transact delete — the response carries the removed row count.
    Delete,
}

impl fmt::Display for ReceiptKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Insert => "insert",
            Self::Monitor => "monitor",
            Self::MonitorCancel => "monitor-cancel",
            Self::Delete => "delete",
        };
        formatter.write_str(label)
    }
}

/// Decoded result of a response message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receipt {
    /// The server accepted the insert and assigned the row an identifier.
    Insert { uuid: String },
    /// The monitor registration was acknowledged.
    Monitor,
    /// The monitor cancellation was acknowledged.
    MonitorCancel,
    /// The delete removed `count` rows.
    Delete { count: i64 },
}

impl Receipt {
    /// Decodes a raw `result` value according to the request kind.
    pub(crate) fn decode(kind: ReceiptKind, result: &Value) -> Result<Self, CodecError> {
        match kind {
            ReceiptKind::Insert => decode_insert(result),
            ReceiptKind::Monitor => Ok(Self::Monitor),
            ReceiptKind::MonitorCancel => Ok(Self::MonitorCancel),
            ReceiptKind::Delete => decode_delete(result),
        }
    }

    /// Server-assigned identifier for insert receipts.
    #[must_use]
    pub fn uuid(&self) -> Option<&str> {
        match self {
            Self::Insert { uuid } => Some(uuid.as_str()),
            _ => None,
        }
    }
}

// Insert results look like [{"uuid": ["uuid", "<server-id>"]}].
fn decode_insert(result: &Value) -> Result<Receipt, CodecError> {
    let first = result
        .get(0)
        .ok_or(CodecError::malformed("insert result"))?;
    let pair = first
        .get("uuid")
        .and_then(Value::as_array)
        .ok_or(CodecError::malformed("insert result uuid"))?;
    match pair.as_slice() {
        [tag, uuid] if tag.as_str() == Some("uuid") => {
            let uuid = uuid
                .as_str()
                .ok_or(CodecError::malformed("insert result uuid"))?;
            Ok(Receipt::Insert {
                uuid: uuid.to_string(),
            })
        }
        _ => Err(CodecError::malformed("insert result uuid")),
    }
}

// Delete results look like [{"count": <n>}].
fn decode_delete(result: &Value) -> Result<Receipt, CodecError> {
    let count = result
        .get(0)
        .and_then(|entry| entry.get("count"))
        .and_then(Value::as_i64)
        .ok_or(CodecError::malformed("delete result count"))?;
    Ok(Receipt::Delete { count })
}
