//! Transaction lifecycle tracking.
//!
//! A transaction spans one submitted record from insert request to final
//! completion. Entries live in an unbounded map keyed by request id and are
//! re-keyed to the server-assigned uuid once the insert is acknowledged;
//! completion looks the entry up by that uuid. The entry exclusively owns
//! the submitted payload, which is released exactly once on whichever path
//! destroys the entry — completion, timeout abandonment, or failure.
//!
//! The table is shared between the listener thread and calling threads. The
//! mutex covers each lookup/mutate; callbacks and waiter signalling always
//! happen after it is released.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use ovsgate_types::{OvsStatus, TableRecord};

const TRANSACTION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transactions");

/// Callback invoked once with the final status and a borrowed view of the
/// submitted payload.
pub type CompletionCallback = Box<dyn FnOnce(OvsStatus, &TableRecord) + Send + 'static>;

/// Lifecycle states of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransactionState {
    /// Submitted, awaiting the insert acknowledgement.
    Init,
    /// Server assigned a uuid; awaiting the feedback notification.
    UuidReceived,
}

/// Wait slot a blocking caller suspends on.
///
/// Each blocking transaction owns its own slot, so concurrent blocking
/// callers never share a signal.
pub(crate) struct WaitSlot {
    status: Mutex<Option<OvsStatus>>,
    signal: Condvar,
}

impl WaitSlot {
    pub(crate) fn new() -> Self {
        Self {
            status: Mutex::new(None),
            signal: Condvar::new(),
        }
    }

    /// Publishes the final status and wakes the waiting caller.
    pub(crate) fn notify(&self, status: OvsStatus) {
        let mut slot = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(status);
        self.signal.notify_all();
    }

    /// Suspends until a status is published or the timeout elapses.
    pub(crate) fn wait(&self, timeout: Duration) -> Option<OvsStatus> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        while slot.is_none() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let (guard, _) = self
                .signal
                .wait_timeout(slot, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            slot = guard;
        }
        *slot
    }
}

struct Transaction {
    uuid: Option<String>,
    state: TransactionState,
    callback: Option<CompletionCallback>,
    record: TableRecord,
    waiter: Option<Arc<WaitSlot>>,
}

/// Parts of a finished transaction handed back for off-lock settlement.
pub(crate) struct FinishedTransaction {
    pub(crate) callback: Option<CompletionCallback>,
    pub(crate) record: TableRecord,
    pub(crate) waiter: Option<Arc<WaitSlot>>,
}

impl FinishedTransaction {
    /// Invokes the completion callback and wakes the waiter.
    pub(crate) fn settle(self, status: OvsStatus) {
        if let Some(callback) = self.callback {
            callback(status, &self.record);
        }
        if let Some(waiter) = self.waiter {
            waiter.notify(status);
        }
    }
}

/// Table of outstanding transactions keyed by request id.
pub(crate) struct TransactionTable {
    entries: Mutex<HashMap<u32, Transaction>>,
}

impl TransactionTable {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<u32, Transaction>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new transaction owning `record`.
    pub(crate) fn insert(
        &self,
        rid: u32,
        record: TableRecord,
        callback: Option<CompletionCallback>,
        waiter: Option<Arc<WaitSlot>>,
    ) {
        debug!(target: TRANSACTION_TARGET, rid, table = %record.table(), "tracking transaction");
        self.entries().insert(
            rid,
            Transaction {
                uuid: None,
                state: TransactionState::Init,
                callback,
                record,
                waiter,
            },
        );
    }

    /// Records the server-assigned uuid for a pending transaction.
    ///
    /// Returns whether the transaction was found; a miss is a correlation
    /// warning, not an error.
    pub(crate) fn record_uuid(&self, rid: &str, uuid: &str) -> bool {
        let Ok(rid) = rid.parse::<u32>() else {
            warn!(target: TRANSACTION_TARGET, rid, "non-numeric request id in receipt");
            return false;
        };
        let mut entries = self.entries();
        let Some(transaction) = entries.get_mut(&rid) else {
            warn!(
                target: TRANSACTION_TARGET,
                rid, uuid, "uuid for a transaction this client no longer tracks"
            );
            return false;
        };
        transaction.uuid = Some(uuid.to_string());
        transaction.state = TransactionState::UuidReceived;
        debug!(target: TRANSACTION_TARGET, rid, uuid, "transaction acknowledged");
        true
    }

    /// Removes the transaction carrying `uuid` and hands its parts back for
    /// settlement. `None` marks a late or foreign completion.
    pub(crate) fn complete(&self, uuid: &str) -> Option<FinishedTransaction> {
        let mut entries = self.entries();
        let rid = entries
            .iter()
            .find(|(_, transaction)| transaction.uuid.as_deref() == Some(uuid))
            .map(|(rid, _)| *rid)?;
        let transaction = entries.remove(&rid)?;
        debug!(target: TRANSACTION_TARGET, rid, uuid, "transaction complete");
        Some(FinishedTransaction {
            callback: transaction.callback,
            record: transaction.record,
            waiter: transaction.waiter,
        })
    }

    /// Drops a transaction without settling it (timeout abandonment or
    /// submission rollback). Returns whether an entry existed.
    pub(crate) fn remove(&self, rid: u32) -> bool {
        let removed = self.entries().remove(&rid).is_some();
        if removed {
            debug!(target: TRANSACTION_TARGET, rid, "transaction abandoned");
        }
        removed
    }

    /// Fails every outstanding transaction, invoking callbacks and waking
    /// blocked callers with `status`. Returns how many were failed.
    pub(crate) fn fail_all(&self, status: OvsStatus) -> usize {
        let drained: Vec<Transaction> = {
            let mut entries = self.entries();
            entries.drain().map(|(_, transaction)| transaction).collect()
        };
        let failed = drained.len();
        for transaction in drained {
            FinishedTransaction {
                callback: transaction.callback,
                record: transaction.record,
                waiter: transaction.waiter,
            }
            .settle(status);
        }
        failed
    }

    /// Number of outstanding transactions.
    pub(crate) fn len(&self) -> usize {
        self.entries().len()
    }

    #[cfg(test)]
    pub(crate) fn state_of(&self, rid: u32) -> Option<TransactionState> {
        self.entries().get(&rid).map(|transaction| transaction.state)
    }
}
