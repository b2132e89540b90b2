use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    handlers::common::{audit_entry, ClientMeta},
    middleware::request_id::RequestId,
    models::{
        audit_log::AuditEvent,
        session::{session_handle, SessionContext, SessionResponse},
    },
    state::AppState,
    utils::envelope::ApiResponse,
};

pub async fn list_sessions(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<Json<Value>, AppError> {
    let sessions = state
        .store
        .list_active_for_user(ctx.user.id, state.clock.now())
        .await?;
    let responses: Vec<SessionResponse> = sessions
        .into_iter()
        .map(|session| SessionResponse::from_session(session, Some(&ctx.session.session_id)))
        .collect();
    Ok(ApiResponse::ok(json!({ "sessions": responses })).synced(&ctx))
}

/// Revokes one of the caller's other sessions, addressed by its handle.
pub async fn revoke_session(
    State(state): State<AppState>,
    ctx: SessionContext,
    request_id: RequestId,
    headers: HeaderMap,
    Path(handle): Path<String>,
) -> Result<Json<Value>, AppError> {
    let handle = handle.trim();
    if handle.is_empty() {
        return Err(AppError::BadRequest("Session ID is required".into()));
    }

    let sessions = state
        .store
        .list_active_for_user(ctx.user.id, state.clock.now())
        .await?;
    let session = sessions
        .into_iter()
        .find(|session| session_handle(&session.session_id) == handle)
        .ok_or_else(|| AppError::NotFound("Session not found".into()))?;

    if session.session_id == ctx.session.session_id {
        return Err(AppError::BadRequest(
            "Cannot revoke current session; use logout instead".into(),
        ));
    }

    state.store.deactivate(&session.session_id).await?;

    let mut entry = audit_entry(
        &state,
        AuditEvent::SessionRevoke,
        &ClientMeta::from_headers(&headers),
        &request_id,
    );
    entry.actor_id = Some(ctx.user.id.to_string());
    entry.target_id = Some(handle.to_string());
    entry.metadata = Some(json!({ "reason": "user_revoke" }));
    state.background.audit(entry);

    Ok(ApiResponse::ok(json!({ "id": handle }))
        .with_message("Session revoked")
        .synced(&ctx))
}
