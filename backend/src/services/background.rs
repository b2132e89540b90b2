//! Best-effort side effects of the request pipeline.
//!
//! Tasks are delivered at most once: a full queue drops the task with a
//! warning and a failing task is only logged. Nothing here may block or fail
//! a request.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    error::SessionRejection,
    models::{audit_log::AuditEntry, session::session_handle},
    repositories::session::SessionStore,
    services::audit_log::AuditLog,
};

#[derive(Debug, Clone)]
pub enum BackgroundTask {
    TouchSession {
        session_id: String,
        at: DateTime<Utc>,
    },
    DeactivateSession {
        session_id: String,
        reason: SessionRejection,
    },
    Audit(AuditEntry),
}

impl BackgroundTask {
    fn kind(&self) -> &'static str {
        match self {
            BackgroundTask::TouchSession { .. } => "touch_session",
            BackgroundTask::DeactivateSession { .. } => "deactivate_session",
            BackgroundTask::Audit(_) => "audit",
        }
    }
}

#[derive(Clone)]
pub struct BackgroundQueue {
    sender: mpsc::Sender<BackgroundTask>,
}

impl BackgroundQueue {
    /// Starts the worker and returns the queue handle. The worker exits once
    /// every handle has been dropped.
    pub fn spawn(
        store: Arc<dyn SessionStore>,
        audit_log: Arc<dyn AuditLog>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel(capacity.max(1));
        let worker = BackgroundWorker { store, audit_log };
        let handle = tokio::spawn(async move {
            while let Some(task) = receiver.recv().await {
                worker.handle(task).await;
            }
            tracing::debug!("Background queue closed");
        });
        (Self { sender }, handle)
    }

    /// Queues a task without waiting. Returns false when it was dropped.
    pub fn enqueue(&self, task: BackgroundTask) -> bool {
        let kind = task.kind();
        match self.sender.try_send(task) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(task = kind, "Background queue full, dropping task");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(task = kind, "Background queue closed, dropping task");
                false
            }
        }
    }

    pub fn audit(&self, entry: AuditEntry) -> bool {
        self.enqueue(BackgroundTask::Audit(entry))
    }
}

pub struct BackgroundWorker {
    store: Arc<dyn SessionStore>,
    audit_log: Arc<dyn AuditLog>,
}

impl BackgroundWorker {
    pub fn new(store: Arc<dyn SessionStore>, audit_log: Arc<dyn AuditLog>) -> Self {
        Self { store, audit_log }
    }

    pub async fn handle(&self, task: BackgroundTask) {
        match task {
            BackgroundTask::TouchSession { session_id, at } => {
                if let Err(err) = self.store.update_activity(&session_id, at).await {
                    tracing::warn!(
                        error = %err,
                        session = %session_handle(&session_id),
                        "Failed to update session activity"
                    );
                }
            }
            BackgroundTask::DeactivateSession { session_id, reason } => {
                match self.store.deactivate(&session_id).await {
                    Ok(_) => tracing::debug!(
                        session = %session_handle(&session_id),
                        reason = reason.as_str(),
                        "Deactivated invalid session"
                    ),
                    Err(err) => tracing::warn!(
                        error = %err,
                        session = %session_handle(&session_id),
                        reason = reason.as_str(),
                        "Failed to deactivate invalid session"
                    ),
                }
            }
            BackgroundTask::Audit(entry) => {
                let event_type = entry.event.as_str();
                if let Err(err) = self.audit_log.record(entry).await {
                    tracing::warn!(
                        error = ?err,
                        event_type = %event_type,
                        "Failed to record audit log"
                    );
                }
            }
        }
    }
}
