// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Minutes granted per question; exam duration is always derived from it.
pub const MINUTES_PER_QUESTION: u32 = 2;

/// Maximum XP an exam awards when the author leaves it unset.
pub const DEFAULT_DIFFICULTY_POINTS: u32 = 100;

/// Every exam-embedded question carries exactly this many options.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// XP needed per star / rank step on the student dashboard.
pub const XP_MILESTONE: u32 = 500;

/// How long a submitted and stored exam session stays in memory for its
/// summary screen when the student never closes it.
pub const FINISHED_SESSION_TTL_SECS: u64 = 30 * 60;

/// How often the background sweep looks for such sessions.
pub const SESSION_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    /// Hosted document store. When absent the local store is used.
    pub database_url: Option<String>,
    /// Snapshot file for the local store.
    pub data_file: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: String,
    pub admin_password: String,
    pub bind_addr: String,
    pub public_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let data_file = env::var("DATA_FILE").ok().filter(|v| !v.is_empty());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let admin_username = env::var("ADMIN_USERNAME")
            .unwrap_or_else(|_| "admin".to_string());
        let admin_password = env::var("ADMIN_PASSWORD")
            .unwrap_or_else(|_| "admin123".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let public_url = env::var("PUBLIC_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let gemini_api_key = env::var("GEMINI_API_KEY").ok().filter(|v| !v.is_empty());
        let gemini_model = env::var("GEMINI_MODEL")
            .unwrap_or_else(|_| "gemini-2.0-flash".to_string());
        let gemini_base_url = env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string());

        Self {
            database_url,
            data_file,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username,
            admin_password,
            bind_addr,
            public_url,
            gemini_api_key,
            gemini_model,
            gemini_base_url,
        }
    }

    /// Configuration used by the integration tests: local store, no generator.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: None,
            data_file: None,
            jwt_secret: jwt_secret.to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            public_url: "http://localhost:3000".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-2.0-flash".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}
