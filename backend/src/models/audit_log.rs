use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Session lifecycle events worth keeping an audit trail of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    LoginSuccess,
    LoginFailure,
    Logout,
    LogoutAll,
    SessionRevoke,
    AdminSessionRevokeAll,
    SessionCleanup,
}

impl AuditEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEvent::LoginSuccess => "login_success",
            AuditEvent::LoginFailure => "login_failure",
            AuditEvent::Logout => "logout",
            AuditEvent::LogoutAll => "logout_all",
            AuditEvent::SessionRevoke => "session_revoke",
            AuditEvent::AdminSessionRevokeAll => "admin_session_revoke_all",
            AuditEvent::SessionCleanup => "session_cleanup",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub occurred_at: DateTime<Utc>,
    pub actor_id: Option<String>,
    pub event: AuditEvent,
    /// Session handle or user id the event is about.
    pub target_id: Option<String>,
    pub success: bool,
    pub metadata: Option<Value>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
}

impl AuditEntry {
    pub fn new(event: AuditEvent, occurred_at: DateTime<Utc>) -> Self {
        Self {
            occurred_at,
            actor_id: None,
            event,
            target_id: None,
            success: true,
            metadata: None,
            ip: None,
            user_agent: None,
            request_id: None,
        }
    }

    pub fn result(&self) -> &'static str {
        if self.success {
            "success"
        } else {
            "failure"
        }
    }
}
