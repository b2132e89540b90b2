use axum::{
    extract::{Path, State},
    http::{header::SET_COOKIE, HeaderMap},
    response::{AppendHeaders, IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::str::FromStr;

use crate::{
    error::AppError,
    handlers::common::{audit_entry, ClientMeta},
    middleware::request_id::RequestId,
    models::{
        audit_log::AuditEvent,
        session::{SessionContext, SessionResponse},
    },
    state::AppState,
    types::UserId,
    utils::{cookies::build_clear_session_cookie, envelope::ApiResponse},
};

pub async fn session_stats(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<Json<Value>, AppError> {
    let stats = state.store.stats(state.clock.now()).await?;
    Ok(ApiResponse::ok(stats).synced(&ctx))
}

pub async fn cleanup_sessions(
    State(state): State<AppState>,
    ctx: SessionContext,
    request_id: RequestId,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let removed = state.sweeper().sweep().await?;

    let mut entry = audit_entry(
        &state,
        AuditEvent::SessionCleanup,
        &ClientMeta::from_headers(&headers),
        &request_id,
    );
    entry.actor_id = Some(ctx.user.id.to_string());
    entry.metadata = Some(json!({ "removed": removed }));
    state.background.audit(entry);

    Ok(ApiResponse::ok(json!({ "removed": removed }))
        .with_message("Expired sessions purged")
        .synced(&ctx))
}

pub async fn list_user_sessions(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let user_id = parse_user_id(&user_id)?;
    let sessions = state
        .store
        .list_active_for_user(user_id, state.clock.now())
        .await?;
    let responses: Vec<SessionResponse> = sessions
        .into_iter()
        .map(|session| SessionResponse::from_session(session, Some(&ctx.session.session_id)))
        .collect();
    Ok(ApiResponse::ok(json!({ "userId": user_id, "sessions": responses })).synced(&ctx))
}

/// Deactivates every session of a user. Revoking one's own sessions also
/// clears the caller's cookie.
pub async fn revoke_user_sessions(
    State(state): State<AppState>,
    ctx: SessionContext,
    request_id: RequestId,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    let user_id = parse_user_id(&user_id)?;
    let revoked = state.store.deactivate_all_for_user(user_id).await?;

    let mut entry = audit_entry(
        &state,
        AuditEvent::AdminSessionRevokeAll,
        &ClientMeta::from_headers(&headers),
        &request_id,
    );
    entry.actor_id = Some(ctx.user.id.to_string());
    entry.target_id = Some(user_id.to_string());
    entry.metadata = Some(json!({ "revoked": revoked }));
    state.background.audit(entry);
    tracing::info!(
        admin_id = %ctx.user.id,
        user_id = %user_id,
        revoked,
        "Revoked all sessions of user"
    );

    let body = ApiResponse::ok(json!({ "userId": user_id, "revoked": revoked }))
        .with_message("Sessions revoked");
    if user_id == ctx.user.id {
        return Ok((
            AppendHeaders([(SET_COOKIE, build_clear_session_cookie(state.cookie_options()))]),
            Json(body),
        )
            .into_response());
    }
    Ok(body.synced(&ctx).into_response())
}

fn parse_user_id(raw: &str) -> Result<UserId, AppError> {
    UserId::from_str(raw.trim()).map_err(|_| AppError::BadRequest("Invalid user ID".into()))
}
