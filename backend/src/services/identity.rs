//! Identity directory the session layer consults but does not own.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use std::sync::OnceLock;

use crate::{
    models::user::{UserRole, UserSummary},
    types::UserId,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Checks a username/password pair. `Ok(None)` means the credentials
    /// were wrong or the account is disabled.
    async fn authenticate(&self, username: &str, password: &str) -> anyhow::Result<Option<UserId>>;

    async fn get_user_summary(&self, user_id: UserId) -> anyhow::Result<Option<UserSummary>>;
}

#[derive(Debug, FromRow)]
struct CredentialRow {
    id: UserId,
    password_hash: String,
    is_active: bool,
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    id: UserId,
    display_name: String,
    role: UserRole,
    is_active: bool,
}

/// Identity directory backed by the `users` table.
#[derive(Clone)]
pub struct PgIdentityProvider {
    pool: PgPool,
}

impl PgIdentityProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityProvider for PgIdentityProvider {
    async fn authenticate(&self, username: &str, password: &str) -> anyhow::Result<Option<UserId>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, password_hash, is_active FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        // Unknown usernames pay for one verification too, so response time
        // does not reveal which accounts exist.
        let Some(row) = row else {
            verify_password(password, dummy_password_hash()?)?;
            return Ok(None);
        };
        let password_ok = verify_password(password, &row.password_hash)?;
        if !password_ok || !row.is_active {
            return Ok(None);
        }
        Ok(Some(row.id))
    }

    async fn get_user_summary(&self, user_id: UserId) -> anyhow::Result<Option<UserSummary>> {
        let row = sqlx::query_as::<_, SummaryRow>(
            "SELECT id, display_name, LOWER(role) AS role, is_active FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| UserSummary {
            id: row.id,
            display_name: row.display_name,
            role: row.role,
            active: row.is_active,
        }))
    }
}

/// Argon2 hash of a random throwaway password, verified against when the
/// username is unknown.
fn dummy_password_hash() -> anyhow::Result<&'static str> {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    if let Some(hash) = DUMMY_HASH.get() {
        return Ok(hash);
    }
    let hash = hash_password(&crate::utils::token::generate_session_token())?;
    Ok(DUMMY_HASH.get_or_init(|| hash))
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid password hash: {}", e))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification error: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("S3cr3t!").expect("hash should succeed");
        assert!(verify_password("S3cr3t!", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn dummy_hash_is_stable_and_matches_nothing() {
        let first = dummy_password_hash().expect("dummy hash");
        let second = dummy_password_hash().expect("dummy hash");
        assert_eq!(first, second);
        assert!(PasswordHash::new(first).is_ok());
        assert!(!verify_password("", first).unwrap());
        assert!(!verify_password("S3cr3t!", first).unwrap());
    }

    #[test]
    fn verify_rejects_malformed_hash() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
