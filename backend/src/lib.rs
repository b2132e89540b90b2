pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;
pub mod types;
pub mod utils;

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::Config,
    docs::ApiDoc,
    state::AppState,
    utils::cookies::{SESSION_EXPIRES_HEADER_NAME, SESSION_HEADER_NAME},
};

/// Builds the full HTTP surface on top of `state`.
pub fn app_router(state: AppState) -> Router {
    // Build public routes (no session)
    let public_routes = Router::new().route("/api/auth/login", post(handlers::auth::login));

    let status_routes = Router::new()
        .route("/api/auth/session", get(handlers::auth::session_status))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_session,
        ));

    // Build user-protected routes (session required)
    let user_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/logout-all", post(handlers::auth::logout_all))
        .route("/api/sessions", get(handlers::sessions::list_sessions))
        .route(
            "/api/sessions/{id}",
            delete(handlers::sessions::revoke_session),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ));

    // Build admin-protected routes (session + admin role)
    let admin_routes = Router::new()
        .route(
            "/api/admin/sessions/stats",
            get(handlers::admin::session_stats),
        )
        .route(
            "/api/admin/sessions/cleanup",
            post(handlers::admin::cleanup_sessions),
        )
        .route(
            "/api/admin/users/{user_id}/sessions",
            get(handlers::admin::list_user_sessions),
        )
        .route(
            "/api/admin/users/{user_id}/sessions/revoke",
            post(handlers::admin::revoke_user_sessions),
        )
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ));

    let cors = cors_layer(&state.config);
    Router::new()
        .merge(public_routes)
        .merge(status_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api/docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(middleware::request_id))
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Credentialed CORS: cookies only flow to the configured origins.
fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allow_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(SESSION_HEADER_NAME),
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([
            HeaderName::from_static(SESSION_EXPIRES_HEADER_NAME),
            HeaderName::from_static("x-request-id"),
        ])
        .max_age(std::time::Duration::from_secs(24 * 60 * 60))
}
