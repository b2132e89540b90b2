use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::SET_COOKIE, request::Parts, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::SecondsFormat;
use std::convert::Infallible;
use std::time::Duration;

use crate::{
    error::{AppError, SessionRejection},
    models::session::SessionContext,
    models::user::UserSummary,
    state::AppState,
    utils::{
        cookies::{
            build_clear_session_cookie, build_session_cookie, extract_session_token,
            sets_session_cookie, CookieOptions, TokenSource, SESSION_EXPIRES_HEADER_NAME,
        },
        seconds_until,
    },
};

/// Rejects requests without a valid session and attaches a
/// [`SessionContext`] and [`UserSummary`] to the rest.
pub async fn require_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some((token, source)) = extract_session_token(request.headers()) else {
        tracing::debug!(path = %request.uri().path(), "Request without session credential");
        return rejection_response(SessionRejection::Missing, state.cookie_options());
    };

    let ctx = match validate(&state, &token, source).await {
        Ok(ctx) => ctx,
        Err(reason) => {
            log_rejection(reason, request.uri().path());
            return rejection_response(reason, state.cookie_options());
        }
    };
    run_with_session(&state, ctx, request, next).await
}

/// Like [`require_session`] but never rejects. Without a valid session the
/// request continues anonymously; a dead session cookie is cleared on the way
/// out.
pub async fn optional_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some((token, source)) = extract_session_token(request.headers()) else {
        return next.run(request).await;
    };
    match validate(&state, &token, source).await {
        Ok(ctx) => run_with_session(&state, ctx, request, next).await,
        Err(reason) => {
            log_rejection(reason, request.uri().path());
            let mut response = next.run(request).await;
            if source == TokenSource::Cookie && !sets_session_cookie(response.headers()) {
                let cleared = build_clear_session_cookie(state.cookie_options());
                append_set_cookie(&mut response, &cleared);
            }
            response
        }
    }
}

/// Admin gate; must run inside [`require_session`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let Some(user) = request.extensions().get::<UserSummary>() else {
        return Err(AppError::MissingSession);
    };
    if !user.is_admin() {
        tracing::warn!(user_id = %user.id, path = %request.uri().path(), "Admin route denied");
        return Err(AppError::Forbidden("Admin privileges required".into()));
    }
    Ok(next.run(request).await)
}

async fn validate(
    state: &AppState,
    token: &str,
    source: TokenSource,
) -> Result<(SessionContext, bool), SessionRejection> {
    let now = state.clock.now();
    let validated = state.validator.validate(token, now).await?;
    Ok((
        SessionContext {
            session: validated.session,
            user: validated.user,
            token_source: source,
            validated_at: now,
        },
        validated.extended,
    ))
}

async fn run_with_session(
    state: &AppState,
    (ctx, extended): (SessionContext, bool),
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(ctx.user.clone());
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    // Handlers that write the cookie themselves (logout) have the last word.
    if extended && !sets_session_cookie(response.headers()) {
        refresh_credential(&ctx, state.cookie_options(), &mut response);
    }
    response
}

/// Hands the extended expiry back to the client over the transport the token
/// arrived on.
fn refresh_credential(ctx: &SessionContext, options: CookieOptions, response: &mut Response) {
    match ctx.token_source {
        TokenSource::Cookie => {
            let max_age = seconds_until(ctx.session.expires_at, ctx.validated_at);
            let cookie = build_session_cookie(
                &ctx.session.session_id,
                Duration::from_secs(max_age as u64),
                options,
            );
            append_set_cookie(response, &cookie);
        }
        TokenSource::Header => {
            let expires_at = ctx
                .session
                .expires_at
                .to_rfc3339_opts(SecondsFormat::Secs, true);
            if let Ok(value) = HeaderValue::from_str(&expires_at) {
                response
                    .headers_mut()
                    .insert(SESSION_EXPIRES_HEADER_NAME, value);
            }
        }
    }
}

fn rejection_response(reason: SessionRejection, options: CookieOptions) -> Response {
    let mut response = AppError::from(reason).into_response();
    append_set_cookie(&mut response, &build_clear_session_cookie(options));
    response
}

fn append_set_cookie(response: &mut Response, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(err) => tracing::error!(error = %err, "Failed to encode session cookie"),
    }
}

fn log_rejection(reason: SessionRejection, path: &str) {
    match reason {
        SessionRejection::StorageFault => {
            tracing::error!(reason = reason.as_str(), path = %path, "Session rejected")
        }
        _ => tracing::debug!(reason = reason.as_str(), path = %path, "Session rejected"),
    }
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or(AppError::MissingSession)
    }
}

/// Session of the caller when one was validated, for routes behind
/// [`optional_session`].
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<SessionContext>);

impl<S> FromRequestParts<S> for MaybeSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(parts.extensions.get::<SessionContext>().cloned()))
    }
}
