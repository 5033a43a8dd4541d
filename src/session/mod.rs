// src/session/mod.rs

pub mod engine;
pub mod manager;

pub use engine::{ExamSession, SessionError, SessionState, SessionView, score_exam};
pub use manager::{SessionManager, SessionSnapshot};
