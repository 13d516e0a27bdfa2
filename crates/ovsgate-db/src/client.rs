//! Caller-facing database client.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use ovsgate_config::Config;
use ovsgate_types::{OvsTable, TableRecord};

use crate::codec::{self, DeleteKey, ReceiptKind};
use crate::errors::DbError;
use crate::ids::RequestIdGenerator;
use crate::listener::{Listener, ListenerHandle};
use crate::monitors::{MonitorCallback, MonitorTable};
use crate::receipts::{ReceiptCallback, ReceiptTable};
use crate::socket::DbSocket;

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");

/// Observes fatal connection events raised by the listener.
///
/// The callback runs on the listener thread after the correlation tables
/// have been cleared; implementations fail over whatever caller-side state
/// still references the connection.
pub trait ConnectionObserver: Send + Sync + 'static {
    /// The connection failed and the listener stopped.
    fn connection_lost(&self, error: &DbError);
}

/// Observer that only logs the lost connection.
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl ConnectionObserver for LoggingObserver {
    fn connection_lost(&self, error: &DbError) {
        warn!(target: CLIENT_TARGET, %error, "database connection lost");
    }
}

/// Client for one database connection.
///
/// Writes happen on the calling thread behind a mutex; a background
/// listener owns a clone of the stream and resolves responses and update
/// notifications against the shared correlation tables.
pub struct DbClient {
    database: String,
    writer: Mutex<DbSocket>,
    receipts: Arc<ReceiptTable>,
    monitors: Arc<MonitorTable>,
    ids: RequestIdGenerator,
    listener: Mutex<Option<ListenerHandle>>,
}

impl DbClient {
    /// Connects to the configured endpoint and starts the listener.
    ///
    /// `id_seed` partitions the wire-id space between logical clients of the
    /// same database; see [`RequestIdGenerator`].
    pub fn connect(
        config: &Config,
        id_seed: u32,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Result<Self, DbError> {
        let socket = DbSocket::connect(&config.endpoint)?;
        let reader = socket.try_clone()?;

        let receipts = Arc::new(ReceiptTable::new());
        let monitors = Arc::new(MonitorTable::new());
        let listener = Listener {
            socket: reader,
            receipts: Arc::clone(&receipts),
            monitors: Arc::clone(&monitors),
            observer,
            poll_interval: config.poll_interval(),
        }
        .spawn();

        info!(
            target: CLIENT_TARGET,
            endpoint = %config.endpoint,
            database = %config.database,
            "connected to database"
        );
        Ok(Self {
            database: config.database.clone(),
            writer: Mutex::new(socket),
            receipts,
            monitors,
            ids: RequestIdGenerator::new(id_seed),
            listener: Mutex::new(Some(listener)),
        })
    }

    /// Issues the next wire request id.
    #[must_use]
    pub fn next_request_id(&self) -> u32 {
        self.ids.next_id()
    }

    /// Sends an insert for the record, resolving `callback` with the
    /// server-assigned uuid once the database replies.
    ///
    /// The receipt is registered before the write so a fast reply cannot
    /// race the registration; a failed write rolls it back.
    pub fn insert(
        &self,
        rid: &str,
        record: &TableRecord,
        callback: Option<ReceiptCallback>,
    ) -> Result<(), DbError> {
        let payload = codec::insert_request(&self.database, rid, record);
        self.receipts.register(
            rid,
            ReceiptKind::Insert,
            callback.unwrap_or_else(logging_receipt),
        );
        if let Err(error) = self.send(&payload) {
            self.receipts.remove(rid);
            return Err(error);
        }
        debug!(
            target: CLIENT_TARGET,
            rid,
            table = %record.table(),
            bytes = payload.len(),
            "insert submitted"
        );
        Ok(())
    }

    /// Subscribes to change notifications for the table. Returns the monitor
    /// id; `callback` fires once per decoded row until the subscription is
    /// cancelled.
    pub fn monitor(
        &self,
        table: OvsTable,
        callback: MonitorCallback,
        receipt: Option<ReceiptCallback>,
    ) -> Result<String, DbError> {
        let monitor_id = self.ids.next_id().to_string();
        let rid = self.ids.next_id().to_string();
        let payload = codec::monitor_request(&self.database, &rid, &monitor_id, table);

        self.receipts.register(
            &rid,
            ReceiptKind::Monitor,
            receipt.unwrap_or_else(logging_receipt),
        );
        self.monitors.add(&monitor_id, callback);
        if let Err(error) = self.send(&payload) {
            self.receipts.remove(&rid);
            self.monitors.remove(&monitor_id);
            return Err(error);
        }
        debug!(
            target: CLIENT_TARGET,
            rid = %rid,
            monitor_id = %monitor_id,
            table = %table,
            "monitor submitted"
        );
        Ok(monitor_id)
    }

    /// Cancels a monitor subscription.
    ///
    /// The local registration is removed immediately; notifications the
    /// server already had in flight are dropped by the monitor table.
    pub fn monitor_cancel(
        &self,
        monitor_id: &str,
        receipt: Option<ReceiptCallback>,
    ) -> Result<(), DbError> {
        let rid = self.ids.next_id().to_string();
        let payload = codec::monitor_cancel_request(&rid, monitor_id);

        self.receipts.register(
            &rid,
            ReceiptKind::MonitorCancel,
            receipt.unwrap_or_else(logging_receipt),
        );
        if let Err(error) = self.send(&payload) {
            self.receipts.remove(&rid);
            return Err(error);
        }
        self.monitors.remove(monitor_id);
        debug!(target: CLIENT_TARGET, rid = %rid, monitor_id, "monitor cancel submitted");
        Ok(())
    }

    /// Deletes the rows matching `key` from the table.
    pub fn delete(
        &self,
        table: OvsTable,
        key: &DeleteKey,
        receipt: Option<ReceiptCallback>,
    ) -> Result<(), DbError> {
        let rid = self.ids.next_id().to_string();
        let payload = codec::delete_request(&self.database, &rid, table, key);

        self.receipts.register(
            &rid,
            ReceiptKind::Delete,
            receipt.unwrap_or_else(logging_receipt),
        );
        if let Err(error) = self.send(&payload) {
            self.receipts.remove(&rid);
            return Err(error);
        }
        debug!(target: CLIENT_TARGET, rid = %rid, table = %table, "delete submitted");
        Ok(())
    }

    /// Stops the listener, clears the correlation tables, and drops the
    /// connection. Idempotent.
    pub fn shutdown(&self) -> Result<(), DbError> {
        let handle = self.listener_slot().take();
        if let Some(handle) = handle {
            handle.shutdown();
            handle.join()?;
            info!(target: CLIENT_TARGET, "database listener stopped");
        }
        self.receipts.clear();
        self.monitors.clear();
        Ok(())
    }

    fn send(&self, payload: &str) -> Result<(), DbError> {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send_all(payload.as_bytes())
    }

    fn listener_slot(&self) -> MutexGuard<'_, Option<ListenerHandle>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for DbClient {
    fn drop(&mut self) {
        if let Err(error) = self.shutdown() {
            warn!(target: CLIENT_TARGET, %error, "shutdown during drop failed");
        }
    }
}

// Stands in when the caller does not care about the receipt.
fn logging_receipt() -> ReceiptCallback {
    Box::new(|rid, receipt| {
        debug!(target: CLIENT_TARGET, rid, ?receipt, "unclaimed receipt resolved");
    })
}
