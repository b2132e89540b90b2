use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    error::StoreError,
    models::session::{NewSession, Session, SessionStats, SessionWithUser},
    repositories::session::SessionStore,
    services::identity::IdentityProvider,
    types::UserId,
};

/// Process-local session store for single-node deployments and tests.
///
/// User summaries are resolved through the identity provider on every read,
/// so identity deactivation is observed immediately.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    identity: Arc<dyn IdentityProvider>,
}

impl InMemorySessionStore {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            identity,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn with_user(&self, session: Session) -> Result<SessionWithUser, StoreError> {
        let user = self
            .identity
            .get_user_summary(session.user_id)
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(SessionWithUser { session, user })
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(
        &self,
        new_session: NewSession,
        now: DateTime<Utc>,
    ) -> Result<SessionWithUser, StoreError> {
        // Resolve the owner first so a failed lookup leaves nothing behind.
        let user = self
            .identity
            .get_user_summary(new_session.user_id)
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        let session = Session {
            session_id: new_session.session_id,
            user_id: new_session.user_id,
            created_at: now,
            last_activity: now,
            expires_at: now + new_session.ttl,
            ip_address: new_session.ip_address,
            user_agent: new_session.user_agent,
            device_type: new_session.device_type,
            is_active: true,
        };
        {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&session.session_id) {
                return Err(StoreError::Unavailable("duplicate session id".into()));
            }
            sessions.insert(session.session_id.clone(), session.clone());
        }
        Ok(SessionWithUser { session, user })
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionWithUser>, StoreError> {
        let session = self.sessions.read().await.get(session_id).cloned();
        match session {
            Some(session) => self.with_user(session).await.map(Some),
            None => Ok(None),
        }
    }

    async fn update_activity(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(session_id) else {
            return Ok(false);
        };
        session.last_activity = session.last_activity.max(now);
        Ok(true)
    }

    async fn extend(
        &self,
        session_id: &str,
        additional: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(session_id).filter(|s| s.is_active) else {
            return Ok(false);
        };
        session.expires_at = session.expires_at.max(now + additional);
        session.last_activity = session.last_activity.max(now);
        Ok(true)
    }

    async fn deactivate(&self, session_id: &str) -> Result<bool, StoreError> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(session_id) else {
            return Ok(false);
        };
        session.is_active = false;
        Ok(true)
    }

    async fn deactivate_all_for_user(&self, user_id: UserId) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let mut count = 0;
        for session in sessions
            .values_mut()
            .filter(|s| s.user_id == user_id && s.is_active)
        {
            session.is_active = false;
            count += 1;
        }
        Ok(count)
    }

    async fn list_active_for_user(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        let mut active: Vec<Session> = sessions
            .values()
            .filter(|s| s.user_id == user_id && s.is_live(now))
            .cloned()
            .collect();
        active.sort_by(|a, b| {
            b.last_activity
                .cmp(&a.last_activity)
                .then(b.created_at.cmp(&a.created_at))
                .then(a.session_id.cmp(&b.session_id))
        });
        Ok(active)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.is_active && s.expires_at >= now);
        Ok((before - sessions.len()) as u64)
    }

    async fn stats(&self, now: DateTime<Utc>) -> Result<SessionStats, StoreError> {
        let sessions = self.sessions.read().await;
        let mut stats = SessionStats::default();
        for session in sessions.values() {
            if session.is_live(now) {
                stats.active_count += 1;
                stats.by_device_type.add(session.device_type, 1);
            } else {
                stats.expired_count += 1;
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            session::DeviceType,
            user::{UserRole, UserSummary},
        },
        services::identity::MockIdentityProvider,
        utils::token::generate_session_token,
    };

    fn identity_with_active_users() -> Arc<dyn IdentityProvider> {
        let mut identity = MockIdentityProvider::new();
        identity.expect_get_user_summary().returning(|id| {
            Ok(Some(UserSummary {
                id,
                display_name: "Auditor".into(),
                role: UserRole::Auditor,
                active: true,
            }))
        });
        Arc::new(identity)
    }

    fn new_session(user_id: UserId, ttl_seconds: i64, device: DeviceType) -> NewSession {
        NewSession {
            session_id: generate_session_token(),
            user_id,
            ip_address: Some("10.0.0.7".into()),
            user_agent: Some("Mozilla/5.0".into()),
            device_type: device,
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    #[tokio::test]
    async fn failed_identity_lookup_leaves_no_session() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_get_user_summary()
            .returning(|_| Err(anyhow::anyhow!("directory offline")));
        let store = InMemorySessionStore::new(Arc::new(identity));

        let err = store
            .create(new_session(UserId::new(), 120, DeviceType::Web), Utc::now())
            .await
            .expect_err("identity lookup fails");
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn create_then_get_returns_active_session_with_user() {
        let store = InMemorySessionStore::new(identity_with_active_users());
        let now = Utc::now();
        let user_id = UserId::new();

        let created = store
            .create(new_session(user_id, 120, DeviceType::Web), now)
            .await
            .expect("create");
        assert_eq!(created.user.as_ref().map(|u| u.id), Some(user_id));

        let fetched = store
            .get(&created.session.session_id)
            .await
            .expect("get")
            .expect("session exists");
        assert!(fetched.session.is_active);
        assert_eq!(fetched.session.created_at, now);
        assert_eq!(fetched.session.last_activity, now);
        assert_eq!(fetched.session.expires_at, now + Duration::seconds(120));
    }

    #[tokio::test]
    async fn get_unknown_session_is_none() {
        let store = InMemorySessionStore::new(identity_with_active_users());
        assert!(store.get("missing").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn extend_never_moves_expiry_backwards() {
        let store = InMemorySessionStore::new(identity_with_active_users());
        let now = Utc::now();
        let created = store
            .create(new_session(UserId::new(), 600, DeviceType::Web), now)
            .await
            .expect("create");
        let id = created.session.session_id;

        let mut previous = created.session.expires_at;
        for (offset, additional) in [(10, 120), (20, 900), (30, 60), (40, 1200)] {
            let at = now + Duration::seconds(offset);
            assert!(store
                .extend(&id, Duration::seconds(additional), at)
                .await
                .expect("extend"));
            let current = store.get(&id).await.unwrap().unwrap().session.expires_at;
            assert!(current >= previous);
            previous = current;
        }
        assert_eq!(previous, now + Duration::seconds(1240));
    }

    #[tokio::test]
    async fn extend_ignores_deactivated_sessions() {
        let store = InMemorySessionStore::new(identity_with_active_users());
        let now = Utc::now();
        let id = store
            .create(new_session(UserId::new(), 60, DeviceType::Web), now)
            .await
            .unwrap()
            .session
            .session_id;
        store.deactivate(&id).await.unwrap();
        assert!(!store
            .extend(&id, Duration::seconds(600), now)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn deactivate_is_idempotent() {
        let store = InMemorySessionStore::new(identity_with_active_users());
        let now = Utc::now();
        let id = store
            .create(new_session(UserId::new(), 60, DeviceType::Web), now)
            .await
            .unwrap()
            .session
            .session_id;

        assert!(store.deactivate(&id).await.unwrap());
        let once = store.get(&id).await.unwrap().unwrap().session;
        assert!(store.deactivate(&id).await.unwrap());
        let twice = store.get(&id).await.unwrap().unwrap().session;
        assert_eq!(once, twice);
        assert!(!twice.is_active);
        assert!(!store.deactivate("missing").await.unwrap());
    }

    #[tokio::test]
    async fn deactivate_all_for_user_empties_active_list() {
        let store = InMemorySessionStore::new(identity_with_active_users());
        let now = Utc::now();
        let user_id = UserId::new();
        let other_user = UserId::new();
        for _ in 0..3 {
            store
                .create(new_session(user_id, 300, DeviceType::Mobile), now)
                .await
                .unwrap();
        }
        store
            .create(new_session(other_user, 300, DeviceType::Web), now)
            .await
            .unwrap();

        assert_eq!(store.list_active_for_user(user_id, now).await.unwrap().len(), 3);
        assert_eq!(store.deactivate_all_for_user(user_id).await.unwrap(), 3);
        assert!(store.list_active_for_user(user_id, now).await.unwrap().is_empty());
        assert_eq!(store.list_active_for_user(other_user, now).await.unwrap().len(), 1);
        assert_eq!(store.deactivate_all_for_user(user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_active_excludes_expired_and_orders_by_activity() {
        let store = InMemorySessionStore::new(identity_with_active_users());
        let now = Utc::now();
        let user_id = UserId::new();
        let older = store
            .create(new_session(user_id, 300, DeviceType::Web), now)
            .await
            .unwrap()
            .session
            .session_id;
        let newer = store
            .create(new_session(user_id, 300, DeviceType::Web), now)
            .await
            .unwrap()
            .session
            .session_id;
        store
            .create(new_session(user_id, 5, DeviceType::Web), now)
            .await
            .unwrap();
        store
            .update_activity(&newer, now + Duration::seconds(30))
            .await
            .unwrap();

        let listed = store
            .list_active_for_user(user_id, now + Duration::seconds(10))
            .await
            .unwrap();
        let ids: Vec<_> = listed.iter().map(|s| s.session_id.clone()).collect();
        assert_eq!(ids, vec![newer, older]);
    }

    #[tokio::test]
    async fn purge_expired_removes_expired_and_inactive_only() {
        let store = InMemorySessionStore::new(identity_with_active_users());
        let now = Utc::now();
        let user_id = UserId::new();
        store
            .create(new_session(user_id, 10, DeviceType::Web), now)
            .await
            .unwrap();
        let revoked = store
            .create(new_session(user_id, 600, DeviceType::Web), now)
            .await
            .unwrap()
            .session
            .session_id;
        store
            .create(new_session(user_id, 600, DeviceType::Desktop), now)
            .await
            .unwrap();
        store.deactivate(&revoked).await.unwrap();

        let later = now + Duration::seconds(60);
        assert_eq!(store.purge_expired(later).await.unwrap(), 2);
        assert_eq!(store.purge_expired(later).await.unwrap(), 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn stats_count_active_expired_and_devices() {
        let store = InMemorySessionStore::new(identity_with_active_users());
        let now = Utc::now();
        let user_id = UserId::new();
        store
            .create(new_session(user_id, 600, DeviceType::Mobile), now)
            .await
            .unwrap();
        store
            .create(new_session(user_id, 600, DeviceType::Mobile), now)
            .await
            .unwrap();
        store
            .create(new_session(user_id, 600, DeviceType::Web), now)
            .await
            .unwrap();
        store
            .create(new_session(user_id, 5, DeviceType::Desktop), now)
            .await
            .unwrap();

        let stats = store.stats(now + Duration::seconds(30)).await.unwrap();
        assert_eq!(stats.active_count, 3);
        assert_eq!(stats.expired_count, 1);
        assert_eq!(stats.by_device_type.mobile, 2);
        assert_eq!(stats.by_device_type.web, 1);
        assert_eq!(stats.by_device_type.desktop, 0);
    }

    #[tokio::test]
    async fn identity_failures_surface_as_store_errors() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_get_user_summary()
            .returning(|_| Err(anyhow::anyhow!("directory offline")));
        let store = InMemorySessionStore::new(Arc::new(identity));
        let result = store
            .create(new_session(UserId::new(), 60, DeviceType::Web), Utc::now())
            .await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
