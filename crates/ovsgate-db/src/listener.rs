//! Background listener that reads and dispatches inbound messages.
//!
//! One worker thread owns the read half of the connection for its lifetime.
//! Each cycle waits for inbound data with a bounded timeout (so the shutdown
//! flag is observed between polls), appends whatever arrived to a persistent
//! accumulator, then greedily decodes complete JSON documents from the
//! front. A trailing partial document stays in the accumulator until later
//! reads complete it, so messages split across reads decode correctly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use serde_json::{Deserializer, Map, Value};
use tracing::{debug, error, info, warn};

use ovsgate_types::OvsTable;

use crate::client::ConnectionObserver;
use crate::codec::{self, Envelope};
use crate::errors::DbError;
use crate::monitors::{MonitorTable, RowUpdate};
use crate::receipts::ReceiptTable;
use crate::socket::DbSocket;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::listener");

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Handle to the background listener thread.
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Requests shutdown; the listener drains its current cycle and stops.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the listener thread to stop.
    pub(crate) fn join(mut self) -> Result<(), DbError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| DbError::ListenerPanic),
            None => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

/// Dispatch worker owning the read half of the connection.
pub(crate) struct Listener {
    pub(crate) socket: DbSocket,
    pub(crate) receipts: Arc<ReceiptTable>,
    pub(crate) monitors: Arc<MonitorTable>,
    pub(crate) observer: Arc<dyn ConnectionObserver>,
    pub(crate) poll_interval: Duration,
}

impl Listener {
    /// Spawns the listener thread and returns its handle.
    pub(crate) fn spawn(self) -> ListenerHandle {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = thread::spawn(move || self.run(&flag));
        ListenerHandle {
            shutdown,
            handle: Some(handle),
        }
    }

    fn run(mut self, shutdown: &AtomicBool) {
        info!(target: LISTENER_TARGET, "database listener active");
        let mut pending = Vec::new();
        let mut chunk = [0_u8; READ_CHUNK_SIZE];

        while !shutdown.load(Ordering::SeqCst) {
            match self.socket.poll_read(&mut chunk, self.poll_interval) {
                Ok(0) => {}
                Ok(count) => {
                    debug!(target: LISTENER_TARGET, bytes = count, "read inbound data");
                    pending.extend_from_slice(&chunk[..count]);
                    self.drain(&mut pending);
                }
                Err(error) => {
                    error!(
                        target: LISTENER_TARGET,
                        %error,
                        "connection failed, stopping listener"
                    );
                    self.receipts.clear();
                    self.monitors.clear();
                    self.observer.connection_lost(&error);
                    return;
                }
            }
        }

        debug!(target: LISTENER_TARGET, "listener draining after shutdown request");
    }

    /// Decodes and dispatches every complete document in the accumulator.
    fn drain(&self, pending: &mut Vec<u8>) {
        let mut consumed = 0;
        let mut messages = Vec::new();
        {
            let mut stream = Deserializer::from_slice(pending).into_iter::<Value>();
            loop {
                match stream.next() {
                    Some(Ok(message)) => {
                        consumed = stream.byte_offset();
                        messages.push(message);
                    }
                    Some(Err(error)) if error.is_eof() => {
                        // Partial document: keep the tail for the next read.
                        break;
                    }
                    Some(Err(error)) => {
                        warn!(
                            target: LISTENER_TARGET,
                            %error,
                            discarded = pending.len(),
                            "protocol error, discarding buffered data"
                        );
                        consumed = pending.len();
                        break;
                    }
                    None => {
                        consumed = pending.len();
                        break;
                    }
                }
            }
        }
        pending.drain(..consumed);

        for message in messages {
            self.dispatch(message);
        }
    }

    fn dispatch(&self, message: Value) {
        match Envelope::decode(message) {
            Ok(Envelope::Response { id, result, error }) => {
                if let Some(error) = error {
                    warn!(
                        target: LISTENER_TARGET,
                        rid = %id,
                        %error,
                        "response carries an error"
                    );
                }
                self.receipts.resolve(&id, &result);
            }
            Ok(Envelope::Update { monitor_id, tables }) => {
                self.dispatch_update(&monitor_id, tables);
            }
            Err(error) => {
                warn!(target: LISTENER_TARGET, %error, "dropping undecodable message");
            }
        }
    }

    /// Splits an update notification into one dispatch per changed row.
    fn dispatch_update(&self, monitor_id: &str, tables: Map<String, Value>) {
        for (table_name, table_rows) in tables {
            let table = match table_name.parse::<OvsTable>() {
                Ok(table) => table,
                Err(error) => {
                    warn!(target: LISTENER_TARGET, %error, "skipping untracked table");
                    continue;
                }
            };
            let Some(table_rows) = table_rows.as_object() else {
                warn!(
                    target: LISTENER_TARGET,
                    table = %table,
                    "skipping update with malformed rows"
                );
                continue;
            };

            for (row_uuid, change) in table_rows {
                match codec::decode_row_change(table, change) {
                    Ok(Some(record)) => {
                        let update = RowUpdate {
                            table,
                            row_uuid: row_uuid.clone(),
                            record,
                        };
                        self.monitors.dispatch(monitor_id, &update);
                    }
                    Ok(None) => {
                        debug!(
                            target: LISTENER_TARGET,
                            table = %table,
                            row = %row_uuid,
                            "acknowledging delete notification"
                        );
                    }
                    Err(error) => {
                        // One bad row must not abort its siblings.
                        warn!(
                            target: LISTENER_TARGET,
                            table = %table,
                            row = %row_uuid,
                            %error,
                            "skipping undecodable row"
                        );
                    }
                }
            }
        }
    }
}
