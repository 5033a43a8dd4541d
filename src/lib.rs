// src/lib.rs

pub mod analytics;
pub mod config;
pub mod error;
pub mod generator;
pub mod handlers;
pub mod models;
pub mod reports;
pub mod roster;
pub mod routes;
pub mod session;
pub mod share;
pub mod state;
pub mod store;
pub mod utils;

pub use routes::create_router;
