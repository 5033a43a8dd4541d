// src/utils/mod.rs

pub mod hash;
pub mod jwt;
pub mod text;

/// Current time as epoch milliseconds, the timestamp unit of every document.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
