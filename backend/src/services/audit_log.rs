use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::models::audit_log::AuditEntry;

/// Audit sink. Recording is best-effort: callers go through the background
/// queue and never see failures.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> anyhow::Result<()>;
}

/// Writes audit entries to the `audit` tracing target.
#[derive(Debug, Clone, Default)]
pub struct TracingAuditLog;

#[async_trait]
impl AuditLog for TracingAuditLog {
    async fn record(&self, entry: AuditEntry) -> anyhow::Result<()> {
        tracing::info!(
            target: "audit",
            event_type = entry.event.as_str(),
            result = entry.result(),
            actor_id = entry.actor_id.as_deref().unwrap_or("-"),
            target_id = entry.target_id.as_deref().unwrap_or("-"),
            ip = entry.ip.as_deref().unwrap_or("-"),
            request_id = entry.request_id.as_deref().unwrap_or("-"),
            occurred_at = %entry.occurred_at,
            "audit event"
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PgAuditLog {
    pool: PgPool,
}

impl PgAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn record(&self, entry: AuditEntry) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO audit_logs \
             (id, occurred_at, actor_id, event_type, target_id, result, metadata, ip, \
             user_agent, request_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(entry.occurred_at)
        .bind(&entry.actor_id)
        .bind(entry.event.as_str())
        .bind(&entry.target_id)
        .bind(entry.result())
        .bind(entry.metadata.as_ref().map(Json))
        .bind(&entry.ip)
        .bind(&entry.user_agent)
        .bind(&entry.request_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
