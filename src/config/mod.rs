//! Configuration management for margin-ratings
//!
//! Defaults, TOML files and environment variables, plus validation.

pub mod app;
pub mod rating;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ServiceSettings};
pub use rating::RatingConfig;
