// src/handlers/mod.rs

pub mod analytics;
pub mod auth;
pub mod exams;
pub mod reports;
pub mod sessions;
pub mod student;
pub mod students;
