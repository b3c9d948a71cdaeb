// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Rolling window for seller analytics reports, in days.
pub const DEFAULT_WINDOW_DAYS: i64 = 30;
/// Response-time SLA threshold, in hours.
pub const DEFAULT_SLA_HOURS: f64 = 24.0;
/// Typing indicators expire this many seconds after the last signal.
pub const TYPING_TTL_SECONDS: i64 = 6;
/// Upper bound for multipart uploads.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
/// Failed-login throttling: attempts allowed per window.
pub const LOGIN_MAX_ATTEMPTS: usize = 10;
pub const LOGIN_WINDOW_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub upload_dir: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let upload_dir = env::var("UPLOAD_DIR")
            .unwrap_or_else(|_| "uploads".to_string());

        let admin_email = env::var("ADMIN_EMAIL").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            upload_dir,
            admin_email,
            admin_password,
        }
    }
}
