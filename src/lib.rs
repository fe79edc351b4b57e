//! Margin Ratings - team strength ratings from game results
//!
//! This crate infers a latent rating per team from home-minus-away scoring
//! margins using a paired-comparison linear model, fit with cross-validated
//! elastic net regression alongside an unpenalized least squares reference.

pub mod config;
pub mod error;
pub mod rating;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{RatingError, Result};
pub use types::*;

// Re-export key components
pub use rating::{RatingEngine, RegressionModel};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
