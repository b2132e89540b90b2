use std::sync::Arc;

use crate::{
    config::Config,
    middleware::rate_limit::LoginRateLimiter,
    repositories::session::SessionStore,
    services::{
        background::BackgroundQueue, cleanup::SessionSweeper, identity::IdentityProvider,
        session_policy::ExtensionPolicy, session_validator::SessionValidator,
    },
    utils::{cookies::CookieOptions, Clock},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn SessionStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub validator: SessionValidator,
    pub background: BackgroundQueue,
    pub clock: Arc<dyn Clock>,
    pub login_limiter: Arc<LoginRateLimiter>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn SessionStore>,
        identity: Arc<dyn IdentityProvider>,
        background: BackgroundQueue,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let validator = SessionValidator::new(
            store.clone(),
            ExtensionPolicy::from_config(&config),
            background.clone(),
        );
        let login_limiter = Arc::new(LoginRateLimiter::per_minute(
            config.login_rate_limit_per_minute,
            config.login_rate_limit_max_keys,
        ));
        Self {
            config,
            store,
            identity,
            validator,
            background,
            clock,
            login_limiter,
        }
    }

    pub fn cookie_options(&self) -> CookieOptions {
        self.config.cookie_options()
    }

    pub fn sweeper(&self) -> SessionSweeper {
        SessionSweeper::new(self.store.clone(), self.clock.clone())
    }
}
