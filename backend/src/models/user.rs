//! Identity summaries and authentication payloads.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use utoipa::ToSchema;
use validator::Validate;

use crate::{models::session::SessionInfo, types::UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema, Default)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
/// Roles understood by the session layer.
pub enum UserRole {
    /// Field auditor scanning and reporting on assets.
    #[default]
    Auditor,
    /// Administrator allowed to inspect and purge sessions.
    Admin,
}

impl UserRole {
    /// Returns the canonical snake_case representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Auditor => "auditor",
            UserRole::Admin => "admin",
        }
    }
}

impl Serialize for UserRole {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.to_ascii_lowercase().as_str() {
            "auditor" => Ok(UserRole::Auditor),
            "admin" => Ok(UserRole::Admin),
            other => Err(serde::de::Error::unknown_variant(other, &["auditor", "admin"])),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// The slice of an identity the session layer needs on every request.
pub struct UserSummary {
    #[schema(value_type = String)]
    pub id: UserId,
    pub display_name: String,
    pub role: UserRole,
    /// Inactive identities invalidate all of their sessions.
    pub active: bool,
}

impl UserSummary {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
/// Credentials submitted by a user attempting to authenticate.
pub struct LoginRequest {
    #[validate(length(min = 1, max = 128))]
    pub username: String,
    #[validate(length(min = 1, max = 1024))]
    pub password: String,
    /// Optional client classification hint (`web`, `mobile`, `desktop`).
    #[serde(default)]
    #[validate(length(max = 32))]
    pub device_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Payload returned after a successful login.
pub struct LoginResponse {
    pub user: UserSummary,
    pub session_info: SessionInfo,
    /// Only returned to non-browser clients, which send it back in the
    /// `X-Session-Id` header. Browsers rely on the HttpOnly cookie.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Answer of the optional session status check.
pub struct SessionStatusResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_deserializes_any_case() {
        let role: UserRole = serde_json::from_str("\"ADMIN\"").expect("role");
        assert_eq!(role, UserRole::Admin);
        assert!(serde_json::from_str::<UserRole>("\"owner\"").is_err());
    }

    #[test]
    fn login_request_requires_username_and_password() {
        let request = LoginRequest {
            username: String::new(),
            password: "secret".into(),
            device_type: None,
        };
        assert!(request.validate().is_err());

        let request = LoginRequest {
            username: "alice".into(),
            password: "secret".into(),
            device_type: Some("web".into()),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn user_summary_serializes_camel_case() {
        let summary = UserSummary {
            id: UserId::new(),
            display_name: "Alice".into(),
            role: UserRole::Auditor,
            active: true,
        };
        let json = serde_json::to_value(&summary).expect("serialize");
        assert_eq!(json["displayName"], "Alice");
        assert_eq!(json["role"], "auditor");
    }
}
