use crate::config::{self, Config};
use crate::utils::limiter::LoginRateLimiter;
use axum::extract::FromRef;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub login_limiter: LoginRateLimiter,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        Self {
            pool,
            config,
            login_limiter: LoginRateLimiter::new(
                config::LOGIN_MAX_ATTEMPTS,
                config::LOGIN_WINDOW_SECS,
            ),
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for LoginRateLimiter {
    fn from_ref(state: &AppState) -> Self {
        state.login_limiter.clone()
    }
}
