//! Music App Server Library
//!
//! Authentication core shared by the server binary and its tests: token
//! issuing and validation, credential checks, request identity and role gates.

pub mod auth_stores;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod security;
pub mod services;

// Re-export commonly used types for convenience
pub use config::AppSettings;
pub use error::AppError;
