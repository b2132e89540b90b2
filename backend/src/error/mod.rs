use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    /// No session credential was presented.
    MissingSession,
    /// Not found, expired, deactivated or owned by an inactive identity.
    SessionExpired,
    StorageUnavailable(anyhow::Error),
    TooManyRequests,
    InternalServerError(anyhow::Error),
    Validation(Vec<String>),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) | AppError::MissingSession | AppError::SessionExpired => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code clients branch on.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::MissingSession => "MISSING_SESSION",
            AppError::SessionExpired => "SESSION_EXPIRED",
            AppError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            AppError::TooManyRequests => "RATE_LIMITED",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code().to_string();
        let (error_message, details) = match self {
            AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::BadRequest(msg) => (msg, None),
            AppError::MissingSession => ("Authentication required".to_string(), None),
            AppError::SessionExpired => ("Session expired, please sign in again".to_string(), None),
            AppError::StorageUnavailable(err) => {
                tracing::error!("Session storage unavailable: {:?}", err);
                ("Session storage unavailable".to_string(), None)
            }
            AppError::TooManyRequests => (
                "Too many requests. Please try again later.".to_string(),
                None,
            ),
            AppError::InternalServerError(err) => {
                tracing::error!("Internal server error: {:?}", err);
                ("Internal server error".to_string(), None)
            }
            AppError::Validation(errors) => (
                "Validation failed".to_string(),
                Some(serde_json::json!({ "errors": errors })),
            ),
        };

        let body = Json(ErrorResponse {
            success: false,
            error: error_message,
            code,
            details,
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalServerError(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::StorageUnavailable(err.into())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let code = e.code.as_ref();
                    format!("{}: {}", field, code)
                })
            })
            .collect();
        AppError::Validation(messages)
    }
}

/// Failure of the session store itself.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session store query failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Why a session failed validation. Only used for logs: every variant except
/// `Missing` reaches the client as `SESSION_EXPIRED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionRejection {
    #[error("no session credential presented")]
    Missing,
    #[error("session not found")]
    NotFound,
    #[error("session deactivated")]
    Deactivated,
    #[error("session expired")]
    Expired,
    #[error("identity inactive or missing")]
    IdentityInactive,
    #[error("session storage fault")]
    StorageFault,
}

impl SessionRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionRejection::Missing => "missing",
            SessionRejection::NotFound => "not_found",
            SessionRejection::Deactivated => "deactivated",
            SessionRejection::Expired => "expired",
            SessionRejection::IdentityInactive => "identity_inactive",
            SessionRejection::StorageFault => "storage_fault",
        }
    }
}

impl From<SessionRejection> for AppError {
    fn from(rejection: SessionRejection) -> Self {
        match rejection {
            SessionRejection::Missing => AppError::MissingSession,
            _ => AppError::SessionExpired,
        }
    }
}
