use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    response::{AppendHeaders, IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::common::{audit_entry, ClientMeta},
    middleware::{request_id::RequestId, session::MaybeSession},
    models::{
        audit_log::AuditEvent,
        session::{session_handle, DeviceType, NewSession, SessionContext},
        user::{LoginRequest, LoginResponse, SessionStatusResponse},
    },
    state::AppState,
    utils::{
        cookies::{build_clear_session_cookie, build_session_cookie},
        device::classify_device,
        envelope::ApiResponse,
        token::generate_session_token,
    },
};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

pub async fn login(
    State(state): State<AppState>,
    request_id: RequestId,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    payload.validate()?;
    state.login_limiter.check(&payload.username)?;

    let meta = ClientMeta::from_headers(&headers);
    let user_id = state
        .identity
        .authenticate(&payload.username, &payload.password)
        .await?;
    let Some(user_id) = user_id else {
        let mut entry = audit_entry(&state, AuditEvent::LoginFailure, &meta, &request_id);
        entry.success = false;
        entry.metadata = Some(json!({ "username": payload.username.trim() }));
        state.background.audit(entry);
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    let hinted_device = payload
        .device_type
        .as_deref()
        .and_then(|hint| hint.trim().parse::<DeviceType>().ok());
    let device_type = classify_device(payload.device_type.as_deref(), meta.user_agent.as_deref());
    let now = state.clock.now();
    let created = state
        .store
        .create(
            NewSession {
                session_id: generate_session_token(),
                user_id,
                ip_address: meta.ip.clone(),
                user_agent: meta.user_agent.clone(),
                device_type,
                ttl: state.config.session_ttl(),
            },
            now,
        )
        .await?;
    let session = created.session;
    let user = match created.user {
        Some(user) if user.active => user,
        _ => {
            // Identity was disabled between authentication and creation.
            state.store.deactivate(&session.session_id).await?;
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
    };

    let mut entry = audit_entry(&state, AuditEvent::LoginSuccess, &meta, &request_id);
    entry.actor_id = Some(user.id.to_string());
    entry.target_id = Some(session_handle(&session.session_id));
    entry.metadata = Some(json!({ "device_type": device_type.as_str() }));
    state.background.audit(entry);
    tracing::info!(
        user_id = %user.id,
        session = %session_handle(&session.session_id),
        device_type = %device_type,
        "User logged in"
    );

    // Native clients that declared themselves use the header transport.
    let session_token = matches!(hinted_device, Some(DeviceType::Mobile | DeviceType::Desktop))
        .then(|| session.session_id.clone());
    let cookie = build_session_cookie(
        &session.session_id,
        std::time::Duration::from_secs(state.config.session_ttl_seconds),
        state.cookie_options(),
    );
    let body = ApiResponse::ok(LoginResponse {
        user,
        session_info: session.info(now),
        session_token,
    });
    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Json(body)).into_response())
}

/// Session status check used by clients on startup. Never fails for a missing or stale
/// session.
pub async fn session_status(MaybeSession(ctx): MaybeSession) -> Response {
    match ctx {
        Some(ctx) => ApiResponse::ok(SessionStatusResponse {
            authenticated: true,
            user: Some(ctx.user.clone()),
        })
        .synced(&ctx)
        .into_response(),
        None => Json(ApiResponse::ok(SessionStatusResponse {
            authenticated: false,
            user: None,
        }))
        .into_response(),
    }
}

pub async fn me(ctx: SessionContext) -> Json<Value> {
    ApiResponse::ok(json!({ "user": ctx.user })).synced(&ctx)
}

pub async fn logout(
    State(state): State<AppState>,
    ctx: SessionContext,
    request_id: RequestId,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    state.store.deactivate(&ctx.session.session_id).await?;

    let mut entry = audit_entry(
        &state,
        AuditEvent::Logout,
        &ClientMeta::from_headers(&headers),
        &request_id,
    );
    entry.actor_id = Some(ctx.user.id.to_string());
    entry.target_id = Some(session_handle(&ctx.session.session_id));
    state.background.audit(entry);

    let body = ApiResponse::ok(Value::Null).with_message("Logged out");
    Ok((
        AppendHeaders([(SET_COOKIE, build_clear_session_cookie(state.cookie_options()))]),
        Json(body),
    )
        .into_response())
}

pub async fn logout_all(
    State(state): State<AppState>,
    ctx: SessionContext,
    request_id: RequestId,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let revoked = state.store.deactivate_all_for_user(ctx.user.id).await?;

    let mut entry = audit_entry(
        &state,
        AuditEvent::LogoutAll,
        &ClientMeta::from_headers(&headers),
        &request_id,
    );
    entry.actor_id = Some(ctx.user.id.to_string());
    entry.metadata = Some(json!({ "revoked": revoked }));
    state.background.audit(entry);
    tracing::info!(user_id = %ctx.user.id, revoked, "Logged out of all sessions");

    let body = ApiResponse::ok(json!({ "revoked": revoked })).with_message("Logged out everywhere");
    Ok((
        AppendHeaders([(SET_COOKIE, build_clear_session_cookie(state.cookie_options()))]),
        Json(body),
    )
        .into_response())
}
