use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use assettrack_backend::{
    config::Config, db::connection::create_pool, repositories::session::PgSessionStore,
    services::cleanup::SessionSweeper, utils::SystemClock,
};

/// One-shot purge of expired and deactivated sessions, for cron.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "assettrack_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    let pool = create_pool(&config.database_url).await?;

    let sweeper = SessionSweeper::new(Arc::new(PgSessionStore::new(pool.clone())), Arc::new(SystemClock));
    let removed = sweeper.sweep().await?;
    tracing::info!("Deleted {} expired sessions", removed);

    sqlx::query("VACUUM (ANALYZE) sessions")
        .execute(&pool)
        .await?;

    Ok(())
}
