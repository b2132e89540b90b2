//! Per-request session validation, independent of the HTTP layer.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::{
    error::SessionRejection,
    models::{
        session::{session_handle, Session},
        user::UserSummary,
    },
    repositories::session::SessionStore,
    services::{
        background::{BackgroundQueue, BackgroundTask},
        session_policy::{ExtensionDecision, ExtensionPolicy},
    },
};

/// A session that passed every check for the current request.
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    /// State after any extension applied by this validation.
    pub session: Session,
    pub user: UserSummary,
    /// True when the expiry moved and the client credential must be refreshed.
    pub extended: bool,
}

#[derive(Clone)]
pub struct SessionValidator {
    store: Arc<dyn SessionStore>,
    policy: ExtensionPolicy,
    queue: BackgroundQueue,
}

impl SessionValidator {
    pub fn new(store: Arc<dyn SessionStore>, policy: ExtensionPolicy, queue: BackgroundQueue) -> Self {
        Self {
            store,
            policy,
            queue,
        }
    }

    /// Runs the validity checks and the sliding extension for `token`.
    ///
    /// Storage faults fail closed. Sessions found expired or owned by an
    /// inactive identity are deactivated in the background.
    pub async fn validate(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<ValidatedSession, SessionRejection> {
        let record = match self.store.get(token).await {
            Ok(Some(record)) => record,
            Ok(None) => return Err(SessionRejection::NotFound),
            Err(err) => {
                tracing::error!(error = %err, "Session lookup failed, rejecting request");
                return Err(SessionRejection::StorageFault);
            }
        };
        let mut session = record.session;

        if !session.is_active {
            return Err(SessionRejection::Deactivated);
        }
        if session.expires_at <= now {
            self.deactivate_in_background(&session, SessionRejection::Expired);
            return Err(SessionRejection::Expired);
        }
        let user = match record.user {
            Some(user) if user.active => user,
            _ => {
                self.deactivate_in_background(&session, SessionRejection::IdentityInactive);
                return Err(SessionRejection::IdentityInactive);
            }
        };

        let extended = match self.policy.decide(now, session.expires_at) {
            ExtensionDecision::Keep => {
                self.queue.enqueue(BackgroundTask::TouchSession {
                    session_id: session.session_id.clone(),
                    at: now,
                });
                false
            }
            ExtensionDecision::Extend { new_expires_at } => {
                match self
                    .store
                    .extend(&session.session_id, self.policy.extension_window, now)
                    .await
                {
                    Ok(true) => {
                        session.expires_at = session.expires_at.max(new_expires_at);
                        session.last_activity = session.last_activity.max(now);
                        tracing::debug!(
                            session = %session_handle(&session.session_id),
                            expires_at = %session.expires_at,
                            "Extended session"
                        );
                        true
                    }
                    // Deactivated between the read and the write.
                    Ok(false) => return Err(SessionRejection::Deactivated),
                    Err(err) => {
                        tracing::error!(error = %err, "Session extension failed, rejecting request");
                        return Err(SessionRejection::StorageFault);
                    }
                }
            }
            ExtensionDecision::Terminal => return Err(SessionRejection::Expired),
        };

        Ok(ValidatedSession {
            session,
            user,
            extended,
        })
    }

    fn deactivate_in_background(&self, session: &Session, reason: SessionRejection) {
        self.queue.enqueue(BackgroundTask::DeactivateSession {
            session_id: session.session_id.clone(),
            reason,
        });
    }
}
