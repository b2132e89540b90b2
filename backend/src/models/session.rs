//! Models for server-held login sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::{
    models::user::UserSummary,
    types::UserId,
    utils::{cookies::TokenSource, time::seconds_until},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
/// Coarse client classification, kept for statistics only.
pub enum DeviceType {
    Web,
    Mobile,
    Desktop,
    Unknown,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Web => "web",
            DeviceType::Mobile => "mobile",
            DeviceType::Desktop => "desktop",
            DeviceType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "web" => Ok(DeviceType::Web),
            "mobile" => Ok(DeviceType::Mobile),
            "desktop" => Ok(DeviceType::Desktop),
            "unknown" => Ok(DeviceType::Unknown),
            other => Err(format!("unknown device type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
/// Database representation of a login session.
pub struct Session {
    /// Opaque token presented by the client; also the primary key.
    #[serde(skip_serializing)]
    pub session_id: String,
    /// Identity the session was issued to.
    #[schema(value_type = String)]
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_type: DeviceType,
    /// Cleared on logout or bulk invalidation, never set again.
    pub is_active: bool,
}

impl Session {
    /// Store-level validity: active and not yet past its expiry.
    ///
    /// Identity state is checked separately by the validator.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at > now
    }

    pub fn info(&self, now: DateTime<Utc>) -> SessionInfo {
        SessionInfo::new(self.expires_at, now)
    }
}

/// A session together with the identity it belongs to. `user` is `None`
/// when the identity no longer exists.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionWithUser {
    pub session: Session,
    pub user: Option<UserSummary>,
}

/// Everything needed to insert a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub session_id: String,
    pub user_id: UserId,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_type: DeviceType,
    pub ttl: chrono::Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Client-facing expiry hint used to resynchronise countdown timers.
pub struct SessionInfo {
    pub expires_at: DateTime<Utc>,
    /// Whole seconds until `expires_at`, never negative.
    pub expires_in: i64,
}

impl SessionInfo {
    pub fn new(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            expires_at,
            expires_in: seconds_until(expires_at, now),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeviceBreakdown {
    pub web: i64,
    pub mobile: i64,
    pub desktop: i64,
    pub unknown: i64,
}

impl DeviceBreakdown {
    pub fn add(&mut self, device: DeviceType, count: i64) {
        match device {
            DeviceType::Web => self.web += count,
            DeviceType::Mobile => self.mobile += count,
            DeviceType::Desktop => self.desktop += count,
            DeviceType::Unknown => self.unknown += count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Aggregate counts for operational dashboards.
pub struct SessionStats {
    /// Sessions that are active and not yet expired.
    pub active_count: i64,
    /// Every other stored session (expired or deactivated), pending cleanup.
    pub expired_count: i64,
    /// Active sessions per device classification.
    pub by_device_type: DeviceBreakdown,
}

/// A validated session attached to the request by the session middleware.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Session state after any extension performed for this request.
    pub session: Session,
    pub user: UserSummary,
    pub token_source: TokenSource,
    /// Time at which the request was validated.
    pub validated_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn info(&self) -> SessionInfo {
        self.session.info(self.validated_at)
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Session as shown to its owner or an administrator.
pub struct SessionResponse {
    /// Short, non-secret handle derived from the token.
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_type: DeviceType,
    pub is_current: bool,
}

impl SessionResponse {
    pub fn from_session(session: Session, current_session_id: Option<&str>) -> Self {
        let is_current = current_session_id
            .map(|current| current == session.session_id)
            .unwrap_or(false);
        Self {
            id: session_handle(&session.session_id),
            created_at: session.created_at,
            last_activity: session.last_activity,
            expires_at: session.expires_at,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            device_type: session.device_type,
            is_current,
        }
    }
}

/// Public handle for a session: the first 16 hex chars of the token.
///
/// Listing endpoints must never echo full tokens back.
pub fn session_handle(session_id: &str) -> String {
    session_id.chars().take(SESSION_HANDLE_LEN).collect()
}

pub const SESSION_HANDLE_LEN: usize = 16;
