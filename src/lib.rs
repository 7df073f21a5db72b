// Yatube - blog/forum service: posts, groups, comments and follows

// Core types and primitives
pub mod core;

// Storage, caching and request identity
pub mod infrastructure;

// Row types
pub mod models;

// Business rules
pub mod services;

// HTTP surface
pub mod web;

// Common utilities
pub mod app_state;
pub mod config;
pub mod error;

// Re-exports for convenience
pub use app_state::AppState;
pub use error::{AppError, AppResult};
pub use web::create_router;
