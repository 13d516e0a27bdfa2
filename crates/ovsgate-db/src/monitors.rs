//! Long-lived subscription correlation table.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use ovsgate_types::{OvsTable, TableRecord};

const MONITOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::monitors");

/// One decoded row from a table-change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct RowUpdate {
    /// Table the row belongs to.
    pub table: OvsTable,
    /// Server-assigned identifier of the changed row.
    pub row_uuid: String,
    /// The decoded row.
    pub record: TableRecord,
}

/// Callback invoked once per matching row update, for as long as the
/// subscription is registered.
pub type MonitorCallback = Arc<dyn Fn(&RowUpdate) + Send + Sync + 'static>;

/// Registry of live subscriptions keyed by monitor id.
///
/// Unlike receipts, entries persist across dispatches until explicitly
/// removed. Callbacks are cloned out of the lock before they run.
pub(crate) struct MonitorTable {
    entries: Mutex<HashMap<String, MonitorCallback>>,
}

impl MonitorTable {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, MonitorCallback>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a subscription. At most one callback per monitor id; a
    /// duplicate replaces the previous registration.
    pub(crate) fn add(&self, monitor_id: &str, callback: MonitorCallback) {
        debug!(target: MONITOR_TARGET, monitor_id, "registering monitor");
        if self
            .entries()
            .insert(monitor_id.to_string(), callback)
            .is_some()
        {
            warn!(
                target: MONITOR_TARGET,
                monitor_id, "replacing existing monitor registration"
            );
        }
    }

    /// Removes a subscription. Returns whether one was registered.
    pub(crate) fn remove(&self, monitor_id: &str) -> bool {
        debug!(target: MONITOR_TARGET, monitor_id, "removing monitor");
        self.entries().remove(monitor_id).is_some()
    }

    /// Dispatches one row update to the subscription, leaving it registered.
    ///
    /// An unknown monitor id is dropped with a warning — the server may
    /// still be flushing notifications for a cancelled subscription.
    pub(crate) fn dispatch(&self, monitor_id: &str, update: &RowUpdate) -> bool {
        let callback = self.entries().get(monitor_id).map(Arc::clone);
        let Some(callback) = callback else {
            warn!(
                target: MONITOR_TARGET,
                monitor_id,
                table = %update.table,
                "dropping update for unknown monitor"
            );
            return false;
        };
        callback(update);
        true
    }

    /// Discards every subscription.
    pub(crate) fn clear(&self) {
        self.entries().clear();
    }
}
