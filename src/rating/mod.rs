//! Margin-based team ratings
//!
//! Every game contributes one observation: the home margin is modeled as a
//! shared home advantage plus the home team's rating minus the away team's
//! rating. Ratings are fit with a cross-validated elastic net and reported
//! centered on zero, next to an unpenalized least squares fit.

pub mod cross_validation;
pub mod design;
pub mod engine;
pub mod games;
pub mod normalize;
pub mod postprocess;
pub mod reference;
pub mod solver;

// Re-export commonly used types
pub use cross_validation::{ErrorCurve, PenaltyChoice, PenaltySelector};
pub use design::DesignMatrix;
pub use engine::RatingEngine;
pub use games::{games_from_json, scored_games};
pub use normalize::normalize_team_name;
pub use solver::{ElasticNet, LinearFit, OrdinaryLeastSquares, RegressionModel};
