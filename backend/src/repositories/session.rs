use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgPool};

use crate::{
    error::StoreError,
    models::{
        session::{DeviceType, NewSession, Session, SessionStats, SessionWithUser},
        user::{UserRole, UserSummary},
    },
    types::UserId,
};

/// Persistent keyed session records. The store is the single source of truth;
/// callers pass `now` so that every decision uses one clock reading.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts an active session expiring at `now + ttl`.
    async fn create(
        &self,
        new_session: NewSession,
        now: DateTime<Utc>,
    ) -> Result<SessionWithUser, StoreError>;

    async fn get(&self, session_id: &str) -> Result<Option<SessionWithUser>, StoreError>;

    /// Moves `last_activity` to `now`. Callers treat failures as non-fatal.
    async fn update_activity(&self, session_id: &str, now: DateTime<Utc>)
        -> Result<bool, StoreError>;

    /// Sets `expires_at = now + additional` unless that would move it
    /// backwards. Deactivated sessions are left untouched.
    async fn extend(
        &self,
        session_id: &str,
        additional: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Idempotent: true whenever the session exists.
    async fn deactivate(&self, session_id: &str) -> Result<bool, StoreError>;

    /// Deactivates every session of the user in one write.
    async fn deactivate_all_for_user(&self, user_id: UserId) -> Result<u64, StoreError>;

    async fn list_active_for_user(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Session>, StoreError>;

    /// Deletes sessions that expired before `now` or were deactivated.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn stats(&self, now: DateTime<Utc>) -> Result<SessionStats, StoreError>;
}

const SESSION_COLUMNS: &str = "session_id, user_id, created_at, last_activity, expires_at, \
     ip_address, user_agent, device_type, is_active";

const JOINED_COLUMNS: &str = "s.session_id, s.user_id, s.created_at, s.last_activity, \
     s.expires_at, s.ip_address, s.user_agent, s.device_type, s.is_active, \
     u.display_name AS user_display_name, LOWER(u.role) AS user_role, \
     u.is_active AS user_is_active";

#[derive(Debug, FromRow)]
struct SessionUserRow {
    #[sqlx(flatten)]
    session: Session,
    user_display_name: Option<String>,
    user_role: Option<UserRole>,
    user_is_active: Option<bool>,
}

impl From<SessionUserRow> for SessionWithUser {
    fn from(row: SessionUserRow) -> Self {
        let user = match (row.user_display_name, row.user_role, row.user_is_active) {
            (Some(display_name), Some(role), Some(active)) => Some(UserSummary {
                id: row.session.user_id,
                display_name,
                role,
                active,
            }),
            _ => None,
        };
        SessionWithUser {
            session: row.session,
            user,
        }
    }
}

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(
        &self,
        new_session: NewSession,
        now: DateTime<Utc>,
    ) -> Result<SessionWithUser, StoreError> {
        let expires_at = now + new_session.ttl;
        let query = format!(
            r#"
            WITH s AS (
                INSERT INTO sessions
                    (session_id, user_id, created_at, last_activity, expires_at,
                     ip_address, user_agent, device_type, is_active)
                VALUES ($1, $2, $3, $3, $4, $5, $6, $7, TRUE)
                RETURNING {SESSION_COLUMNS}
            )
            SELECT {JOINED_COLUMNS}
            FROM s
            LEFT JOIN users u ON u.id = s.user_id
            "#
        );
        let row = sqlx::query_as::<_, SessionUserRow>(&query)
            .bind(&new_session.session_id)
            .bind(new_session.user_id)
            .bind(now)
            .bind(expires_at)
            .bind(&new_session.ip_address)
            .bind(&new_session.user_agent)
            .bind(new_session.device_type)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionWithUser>, StoreError> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} FROM sessions s \
             LEFT JOIN users u ON u.id = s.user_id \
             WHERE s.session_id = $1"
        );
        let row = sqlx::query_as::<_, SessionUserRow>(&query)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn update_activity(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET last_activity = GREATEST(last_activity, $2)
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn extend(
        &self,
        session_id: &str,
        additional: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET expires_at = GREATEST(expires_at, $2),
                last_activity = GREATEST(last_activity, $3)
            WHERE session_id = $1 AND is_active = TRUE
            "#,
        )
        .bind(session_id)
        .bind(now + additional)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn deactivate(&self, session_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE sessions SET is_active = FALSE WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_all_for_user(&self, user_id: UserId) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE sessions SET is_active = FALSE WHERE user_id = $1 AND is_active = TRUE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list_active_for_user(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Session>, StoreError> {
        let query = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE user_id = $1 AND is_active = TRUE AND expires_at > $2 \
             ORDER BY last_activity DESC, created_at DESC, session_id"
        );
        let sessions = sqlx::query_as::<_, Session>(&query)
            .bind(user_id)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
        Ok(sessions)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < $1 OR is_active = FALSE")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn stats(&self, now: DateTime<Utc>) -> Result<SessionStats, StoreError> {
        let (active_count, expired_count): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE is_active AND expires_at > $1),
                COUNT(*) FILTER (WHERE NOT (is_active AND expires_at > $1))
            FROM sessions
            "#,
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let per_device: Vec<(DeviceType, i64)> = sqlx::query_as(
            r#"
            SELECT device_type, COUNT(*)
            FROM sessions
            WHERE is_active AND expires_at > $1
            GROUP BY device_type
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let mut stats = SessionStats {
            active_count,
            expired_count,
            ..SessionStats::default()
        };
        for (device, count) in per_device {
            stats.by_device_type.add(device, count);
        }
        Ok(stats)
    }
}
