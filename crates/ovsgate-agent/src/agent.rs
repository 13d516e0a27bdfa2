//! Agent facade tying transactions to the database client.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use ovsgate_config::Config;
use ovsgate_db::{
    ConnectionObserver, DbClient, DbError, DeleteKey, MonitorCallback, ReceiptCallback,
};
use ovsgate_types::{Feedback, OvsStatus, OvsTable, TableRecord};

use crate::actions::GatewayActions;
use crate::component::ComponentId;
use crate::errors::AgentError;
use crate::transactions::{CompletionCallback, TransactionTable, WaitSlot};

const AGENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::agent");

/// Whether a submission suspends the calling thread until completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockMode {
    /// Return immediately; completion is delivered by callback later.
    #[default]
    NonBlocking,
    /// Suspend until completion or the configured timeout.
    Blocking,
}

/// Caller-facing handle for one component's database session.
///
/// The agent owns the database client, the transaction table, and the
/// lazily registered `Feedback` monitor that carries completions back.
pub struct OvsAgent {
    component: ComponentId,
    config: Config,
    db: Arc<DbClient>,
    transactions: Arc<TransactionTable>,
    feedback_monitor: Arc<Mutex<Option<String>>>,
}

impl OvsAgent {
    /// Connects to the database and prepares the session for submissions.
    pub fn connect(component: ComponentId, config: Config) -> Result<Self, AgentError> {
        let transactions = Arc::new(TransactionTable::new());
        let observer = Arc::new(DisconnectHandler {
            transactions: Arc::clone(&transactions),
        });
        let db = DbClient::connect(&config, component.id_seed(), observer)
            .map_err(|source| AgentError::Connect { source })?;

        info!(target: AGENT_TARGET, component = %component, "agent session established");
        Ok(Self {
            component,
            config,
            db: Arc::new(db),
            transactions,
            feedback_monitor: Arc::new(Mutex::new(None)),
        })
    }

    /// Component this session belongs to.
    #[must_use]
    pub const fn component(&self) -> ComponentId {
        self.component
    }

    /// Number of transactions still awaiting completion.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.transactions.len()
    }

    /// Submits a record for insertion and tracks it to completion.
    ///
    /// The transaction owns a copy of `record` until it finishes; the
    /// completion callback borrows that copy together with the final status.
    /// In blocking mode the call suspends until completion or
    /// [`Config::block_timeout`], returning [`OvsStatus::TimedOut`] when the
    /// deadline elapses — the local entry is removed then, and a completion
    /// that still arrives later is tolerated and dropped.
    pub fn submit(
        &self,
        record: TableRecord,
        mode: BlockMode,
        callback: Option<CompletionCallback>,
    ) -> Result<OvsStatus, AgentError> {
        let rid = self.db.next_request_id();
        let rid_text = rid.to_string();
        let waiter = matches!(mode, BlockMode::Blocking).then(|| Arc::new(WaitSlot::new()));

        self.transactions
            .insert(rid, record.clone(), callback, waiter.clone());

        let receipt = self.insert_receipt();
        if let Err(source) = self.db.insert(&rid_text, &record, Some(receipt)) {
            self.transactions.remove(rid);
            return Err(AgentError::Submit {
                rid: rid_text,
                source,
            });
        }
        info!(
            target: AGENT_TARGET,
            rid,
            table = %record.table(),
            blocking = matches!(mode, BlockMode::Blocking),
            "configuration submitted"
        );

        let Some(waiter) = waiter else {
            return Ok(OvsStatus::Unknown);
        };
        match waiter.wait(self.config.block_timeout()) {
            Some(status) => Ok(status),
            None => {
                warn!(target: AGENT_TARGET, rid, "blocking submission timed out");
                self.transactions.remove(rid);
                Ok(OvsStatus::TimedOut)
            }
        }
    }

    /// Subscribes `callback` to change notifications for the table.
    pub fn monitor(
        &self,
        table: OvsTable,
        callback: MonitorCallback,
    ) -> Result<String, AgentError> {
        self.db
            .monitor(table, callback, None)
            .map_err(|source| AgentError::Monitor { table, source })
    }

    /// Cancels a monitor subscription previously returned by
    /// [`OvsAgent::monitor`] or [`OvsAgent::serve_gateway_config`].
    pub fn monitor_cancel(&self, monitor_id: &str) -> Result<(), AgentError> {
        self.db
            .monitor_cancel(monitor_id, None)
            .map_err(|source| AgentError::MonitorCancel {
                monitor_id: monitor_id.to_string(),
                source,
            })
    }

    /// Serves the configuration table: every decoded row is applied through
    /// `handler` and answered with a `Feedback` row carrying the outcome,
    /// keyed by the configuration row's server-assigned identifier.
    pub fn serve_gateway_config(
        &self,
        handler: Arc<dyn GatewayActions>,
    ) -> Result<String, AgentError> {
        let db = Arc::clone(&self.db);
        let callback: MonitorCallback = Arc::new(move |update| {
            let TableRecord::GatewayConfig(config) = &update.record else {
                warn!(
                    target: AGENT_TARGET,
                    table = %update.table,
                    "gateway monitor received a non-configuration row"
                );
                return;
            };
            debug!(
                target: AGENT_TARGET,
                if_name = %config.if_name,
                command = %config.if_cmd,
                row = %update.row_uuid,
                "applying gateway configuration"
            );
            let status = handler.apply(config);

            let feedback = TableRecord::from(Feedback::new(update.row_uuid.clone(), status));
            let rid = db.next_request_id().to_string();
            if let Err(error) = db.insert(&rid, &feedback, None) {
                warn!(
                    target: AGENT_TARGET,
                    %error,
                    row = %update.row_uuid,
                    "failed to report feedback"
                );
            }
        });

        self.db
            .monitor(OvsTable::GatewayConfig, callback, None)
            .map_err(|source| AgentError::Monitor {
                table: OvsTable::GatewayConfig,
                source,
            })
    }

    /// Tears the session down: cancels the feedback monitor, fails every
    /// outstanding transaction (waking blocked callers with an error), and
    /// stops the database client.
    pub fn shutdown(&self) -> Result<(), AgentError> {
        let monitor = self.feedback_slot().take();
        if let Some(monitor_id) = monitor {
            if let Err(error) = self.db.monitor_cancel(&monitor_id, None) {
                warn!(
                    target: AGENT_TARGET,
                    %error,
                    monitor_id = %monitor_id,
                    "failed to cancel the feedback monitor"
                );
            }
        }

        let failed = self.transactions.fail_all(OvsStatus::Failed);
        if failed > 0 {
            warn!(target: AGENT_TARGET, failed, "failed outstanding transactions at shutdown");
        }

        self.db
            .shutdown()
            .map_err(|source| AgentError::Shutdown { source })
    }

    /// Receipt callback that promotes the transaction once the server
    /// acknowledges the insert, then makes sure completions can reach us.
    fn insert_receipt(&self) -> ReceiptCallback {
        let db = Arc::clone(&self.db);
        let transactions = Arc::clone(&self.transactions);
        let feedback_monitor = Arc::clone(&self.feedback_monitor);
        Box::new(move |rid, receipt| {
            let Some(uuid) = receipt.uuid() else {
                warn!(target: AGENT_TARGET, rid, "insert resolved with a non-insert receipt");
                return;
            };
            if !transactions.record_uuid(rid, uuid) {
                return;
            }
            ensure_feedback_monitor(&db, &transactions, &feedback_monitor);
        })
    }

    fn feedback_slot(&self) -> MutexGuard<'_, Option<String>> {
        self.feedback_monitor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registers the `Feedback` monitor the first time a transaction needs it.
fn ensure_feedback_monitor(
    db: &Arc<DbClient>,
    transactions: &Arc<TransactionTable>,
    slot: &Arc<Mutex<Option<String>>>,
) {
    let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if guard.is_some() {
        return;
    }

    let callback = feedback_callback(Arc::clone(db), Arc::clone(transactions));
    match db.monitor(OvsTable::Feedback, callback, None) {
        Ok(monitor_id) => {
            info!(target: AGENT_TARGET, monitor_id = %monitor_id, "feedback monitor registered");
            *guard = Some(monitor_id);
        }
        Err(error) => {
            warn!(target: AGENT_TARGET, %error, "failed to register the feedback monitor");
        }
    }
}

/// Completion path: a feedback row finishes its transaction, the caller is
/// settled, and both database rows the transaction produced are deleted.
fn feedback_callback(db: Arc<DbClient>, transactions: Arc<TransactionTable>) -> MonitorCallback {
    Arc::new(move |update| {
        let TableRecord::Feedback(feedback) = &update.record else {
            warn!(
                target: AGENT_TARGET,
                table = %update.table,
                "feedback monitor received a non-feedback row"
            );
            return;
        };

        let Some(finished) = transactions.complete(&feedback.req_uuid) else {
            // Late completion after a timeout, or another client's traffic.
            warn!(
                target: AGENT_TARGET,
                req_uuid = %feedback.req_uuid,
                "completion for an untracked transaction"
            );
            return;
        };
        debug!(
            target: AGENT_TARGET,
            req_uuid = %feedback.req_uuid,
            status = %feedback.status,
            "transaction completed by feedback"
        );

        // Callback first, then row cleanup, then wake the blocked caller so
        // a blocking submit returns only after the deletes are on the wire.
        if let Some(callback) = finished.callback {
            callback(feedback.status, &finished.record);
        }

        if let Err(error) = db.delete(
            OvsTable::GatewayConfig,
            &DeleteKey::Uuid(feedback.req_uuid.clone()),
            None,
        ) {
            warn!(
                target: AGENT_TARGET,
                %error,
                req_uuid = %feedback.req_uuid,
                "failed to delete the configuration row"
            );
        }
        if let Err(error) = db.delete(
            OvsTable::Feedback,
            &DeleteKey::column("req_uuid", feedback.req_uuid.as_str()),
            None,
        ) {
            warn!(
                target: AGENT_TARGET,
                %error,
                req_uuid = %feedback.req_uuid,
                "failed to delete the feedback row"
            );
        }

        if let Some(waiter) = finished.waiter {
            waiter.notify(feedback.status);
        }
    })
}

/// Fails caller-side state when the listener loses the connection.
struct DisconnectHandler {
    transactions: Arc<TransactionTable>,
}

impl ConnectionObserver for DisconnectHandler {
    fn connection_lost(&self, error: &DbError) {
        warn!(
            target: AGENT_TARGET,
            %error,
            "database connection lost, failing outstanding transactions"
        );
        self.transactions.fail_all(OvsStatus::Failed);
    }
}
