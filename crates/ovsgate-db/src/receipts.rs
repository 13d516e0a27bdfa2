//! Pending-response correlation table.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, warn};

use crate::codec::{Receipt, ReceiptKind};

const RECEIPT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::receipts");

/// Callback invoked exactly once when a pending request resolves.
pub type ReceiptCallback = Box<dyn FnOnce(&str, &Receipt) + Send + 'static>;

struct PendingReceipt {
    kind: ReceiptKind,
    callback: ReceiptCallback,
}

/// Single-use request records keyed by wire id.
///
/// Entries are matched exactly once against an inbound response and removed;
/// an entry whose response never arrives stays until `remove` or `clear`.
/// The mutex covers each lookup/mutate only — callbacks run off-lock so a
/// callback may re-enter the table.
pub(crate) struct ReceiptTable {
    entries: Mutex<HashMap<String, PendingReceipt>>,
}

impl ReceiptTable {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    // Entries are plain data, so a poisoned table keeps serving.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, PendingReceipt>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a pending request. A duplicate wire id replaces the stale
    /// entry, keeping at most one receipt per id.
    pub(crate) fn register(&self, rid: &str, kind: ReceiptKind, callback: ReceiptCallback) {
        debug!(target: RECEIPT_TARGET, rid, %kind, "registering receipt");
        let previous = self
            .entries()
            .insert(rid.to_string(), PendingReceipt { kind, callback });
        if let Some(previous) = previous {
            warn!(
                target: RECEIPT_TARGET,
                rid,
                kind = %previous.kind,
                "overwriting stale receipt for reused wire id"
            );
        }
    }

    /// Resolves a response: removes the matching entry, decodes the result
    /// according to its kind, and invokes the callback. Returns whether a
    /// match was found; a miss is a logged correlation warning only.
    pub(crate) fn resolve(&self, rid: &str, result: &Value) -> bool {
        let Some(entry) = self.entries().remove(rid) else {
            warn!(
                target: RECEIPT_TARGET,
                rid, "response for a request this client no longer tracks"
            );
            return false;
        };

        match Receipt::decode(entry.kind, result) {
            Ok(receipt) => {
                debug!(target: RECEIPT_TARGET, rid, kind = %entry.kind, "resolving receipt");
                (entry.callback)(rid, &receipt);
            }
            Err(error) => {
                warn!(
                    target: RECEIPT_TARGET,
                    rid,
                    kind = %entry.kind,
                    %error,
                    "discarding receipt with undecodable result"
                );
            }
        }
        true
    }

    /// Removes a pending entry without invoking its callback (caller
    /// abandoned the request). Returns whether an entry existed.
    pub(crate) fn remove(&self, rid: &str) -> bool {
        self.entries().remove(rid).is_some()
    }

    /// Discards every pending entry.
    pub(crate) fn clear(&self) {
        let mut entries = self.entries();
        if !entries.is_empty() {
            debug!(
                target: RECEIPT_TARGET,
                pending = entries.len(),
                "clearing pending receipts"
            );
        }
        entries.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries().len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    fn counting_callback(count: &Arc<AtomicUsize>) -> ReceiptCallback {
        let count = Arc::clone(count);
        Box::new(move |_, _| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn resolve_invokes_the_callback_exactly_once() {
        let table = ReceiptTable::new();
        let count = Arc::new(AtomicUsize::new(0));
        table.register("41", ReceiptKind::Delete, counting_callback(&count));

        let result = json!([{"count": 1}]);
        assert!(table.resolve("41", &result));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // A second resolve for the same id is a correlation miss.
        assert!(!table.resolve("41", &result));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn resolve_only_matches_the_registered_id() {
        let table = ReceiptTable::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        table.register("1", ReceiptKind::Delete, counting_callback(&first));
        table.register("2", ReceiptKind::Delete, counting_callback(&second));

        assert!(table.resolve("2", &json!([{"count": 0}])));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn duplicate_registration_replaces_the_stale_entry() {
        let table = ReceiptTable::new();
        let stale = Arc::new(AtomicUsize::new(0));
        let fresh = Arc::new(AtomicUsize::new(0));
        table.register("7", ReceiptKind::Insert, counting_callback(&stale));
        table.register("7", ReceiptKind::Insert, counting_callback(&fresh));

        assert!(table.resolve("7", &json!([{"uuid": ["uuid", "abc"]}])));
        assert_eq!(stale.load(Ordering::SeqCst), 0);
        assert_eq!(fresh.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn undecodable_results_consume_the_entry_without_a_callback() {
        let table = ReceiptTable::new();
        let count = Arc::new(AtomicUsize::new(0));
        table.register("9", ReceiptKind::Insert, counting_callback(&count));

        assert!(table.resolve("9", &json!("not an insert result")));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn remove_discards_without_invoking() {
        let table = ReceiptTable::new();
        let count = Arc::new(AtomicUsize::new(0));
        table.register("3", ReceiptKind::Monitor, counting_callback(&count));

        assert!(table.remove("3"));
        assert!(!table.remove("3"));
        assert!(!table.resolve("3", &json!({})));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn clear_discards_everything() {
        let table = ReceiptTable::new();
        let count = Arc::new(AtomicUsize::new(0));
        table.register("1", ReceiptKind::Monitor, counting_callback(&count));
        table.register("2", ReceiptKind::Delete, counting_callback(&count));

        table.clear();
        assert_eq!(table.len(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
