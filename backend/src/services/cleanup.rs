//! Removal of expired and deactivated sessions.

use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;

use crate::{error::StoreError, repositories::session::SessionStore, utils::Clock};

#[derive(Clone)]
pub struct SessionSweeper {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
}

impl SessionSweeper {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Deletes every session that is expired or deactivated. Safe to run
    /// concurrently with itself and with request traffic.
    pub async fn sweep(&self) -> Result<u64, StoreError> {
        let removed = self.store.purge_expired(self.clock.now()).await?;
        if removed > 0 {
            tracing::info!(removed, "Purged expired sessions");
        } else {
            tracing::debug!("No expired sessions to purge");
        }
        Ok(removed)
    }

    /// Runs [`Self::sweep`] every `period`. The first sweep happens
    /// immediately.
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = self.sweep().await {
                    tracing::warn!(error = %err, "Session sweep failed");
                }
            }
        })
    }
}
