use axum::http::{header::USER_AGENT, HeaderMap};

use crate::{
    middleware::request_id::RequestId,
    models::audit_log::{AuditEntry, AuditEvent},
    state::AppState,
};

/// Caller details recorded on sessions and audit entries.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientMeta {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip: extract_ip(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

fn extract_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        return value
            .split(',')
            .next()
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty());
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|agent| agent.trim().to_string())
        .filter(|agent| !agent.is_empty())
}

/// Starts an audit entry stamped with the caller's details. Handlers fill
/// in actor and target, then queue it with `state.background.audit`.
pub(crate) fn audit_entry(
    state: &AppState,
    event: AuditEvent,
    meta: &ClientMeta,
    request_id: &RequestId,
) -> AuditEntry {
    let mut entry = AuditEntry::new(event, state.clock.now());
    entry.ip = meta.ip.clone();
    entry.user_agent = meta.user_agent.clone();
    entry.request_id = Some(request_id.0.clone());
    entry
}
