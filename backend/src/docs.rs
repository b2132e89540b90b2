#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use crate::{
    error::ErrorResponse,
    models::{
        session::{DeviceBreakdown, DeviceType, SessionInfo, SessionResponse, SessionStats},
        user::{LoginRequest, LoginResponse, SessionStatusResponse, UserRole, UserSummary},
    },
    utils::cookies::{SESSION_COOKIE_NAME, SESSION_HEADER_NAME},
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        login_doc,
        session_status_doc,
        me_doc,
        logout_doc,
        logout_all_doc,
        list_sessions_doc,
        revoke_session_doc,
        admin_session_stats_doc,
        admin_cleanup_sessions_doc,
        admin_list_user_sessions_doc,
        admin_revoke_user_sessions_doc
    ),
    components(
        schemas(
            // auth
            LoginRequest,
            LoginResponse,
            SessionStatusResponse,
            UserSummary,
            UserRole,
            // sessions
            SessionInfo,
            SessionResponse,
            DeviceType,
            SessionStats,
            DeviceBreakdown,
            ErrorResponse
        )
    ),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Auth", description = "Login, logout and session status"),
        (name = "Sessions", description = "The caller's own sessions"),
        (name = "Admin", description = "Session administration")
    ),
    security(("SessionCookie" = []), ("SessionHeader" = []))
)]
pub struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE_NAME))),
        );
        components.add_security_scheme(
            "SessionHeader",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(SESSION_HEADER_NAME))),
        );
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session created; the cookie is set", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 429, description = "Too many attempts for this username", body = ErrorResponse)
    ),
    tag = "Auth",
    security(())
)]
fn login_doc() {}

#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses((status = 200, description = "Whether the caller has a valid session", body = SessionStatusResponse)),
    tag = "Auth",
    security(())
)]
fn session_status_doc() {}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user with sessionInfo", body = serde_json::Value),
        (status = 401, description = "MISSING_SESSION or SESSION_EXPIRED", body = ErrorResponse)
    ),
    tag = "Auth"
)]
fn me_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Session deactivated and cookie cleared", body = serde_json::Value)),
    tag = "Auth"
)]
fn logout_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/logout-all",
    responses((status = 200, description = "Every session of the caller deactivated", body = serde_json::Value)),
    tag = "Auth"
)]
fn logout_all_doc() {}

#[utoipa::path(
    get,
    path = "/api/sessions",
    responses((status = 200, description = "Active sessions of the caller", body = serde_json::Value)),
    tag = "Sessions"
)]
fn list_sessions_doc() {}

#[utoipa::path(
    delete,
    path = "/api/sessions/{id}",
    params(("id" = String, Path, description = "Session handle from the session list")),
    responses(
        (status = 200, description = "Session revoked", body = serde_json::Value),
        (status = 400, description = "Current session; use logout", body = ErrorResponse),
        (status = 404, description = "No such session for the caller", body = ErrorResponse)
    ),
    tag = "Sessions"
)]
fn revoke_session_doc() {}

#[utoipa::path(
    get,
    path = "/api/admin/sessions/stats",
    responses(
        (status = 200, description = "Aggregate session counts", body = SessionStats),
        (status = 403, description = "Not an administrator", body = ErrorResponse),
        (status = 503, description = "Session storage unavailable", body = ErrorResponse)
    ),
    tag = "Admin"
)]
fn admin_session_stats_doc() {}

#[utoipa::path(
    post,
    path = "/api/admin/sessions/cleanup",
    responses((status = 200, description = "Expired and deactivated sessions purged", body = serde_json::Value)),
    tag = "Admin"
)]
fn admin_cleanup_sessions_doc() {}

#[utoipa::path(
    get,
    path = "/api/admin/users/{user_id}/sessions",
    params(("user_id" = String, Path, description = "User ID")),
    responses((status = 200, description = "Active sessions of the user", body = serde_json::Value)),
    tag = "Admin"
)]
fn admin_list_user_sessions_doc() {}

#[utoipa::path(
    post,
    path = "/api/admin/users/{user_id}/sessions/revoke",
    params(("user_id" = String, Path, description = "User ID")),
    responses((status = 200, description = "Every session of the user deactivated", body = serde_json::Value)),
    tag = "Admin"
)]
fn admin_revoke_user_sessions_doc() {}
