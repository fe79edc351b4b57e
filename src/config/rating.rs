//! Rating engine configuration

use crate::error::{RatingError, Result};
use crate::types::PenaltySelection;
use serde::{Deserialize, Serialize};

/// Tunables for a rating run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Largest absolute margin a single game may contribute
    pub margin_cap: f64,
    /// Share of the penalty given to L1 (1.0 = lasso, 0.0 = ridge)
    pub mixing_ratio: f64,
    /// How the penalty strength is picked from the cross-validation curve
    pub selection: PenaltySelection,
    /// Number of candidate penalties on the regularization path
    pub path_length: usize,
    /// Smallest path penalty as a fraction of the largest
    pub path_ratio: f64,
    /// Coordinate descent sweep cap
    pub max_iterations: usize,
    /// Convergence threshold on the largest coefficient change in a sweep
    pub tolerance: f64,
    /// Seed for the fold shuffle
    pub fold_seed: u64,
    pub min_folds: usize,
    pub max_folds: usize,
    /// Fit cross-validation folds on the rayon pool
    pub parallel_folds: bool,
    /// Decimal places kept in presented ratings
    pub display_precision: u32,
    /// Attach unpenalized least squares ratings to the output
    pub include_reference_ratings: bool,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            margin_cap: 99.0,
            mixing_ratio: 0.5,
            selection: PenaltySelection::MinimumError,
            path_length: 100,
            path_ratio: 1e-3,
            max_iterations: 5000,
            tolerance: 1e-6,
            fold_seed: 42,
            min_folds: 3,
            max_folds: 10,
            parallel_folds: true,
            display_precision: 2,
            include_reference_ratings: true,
        }
    }
}

impl RatingConfig {
    /// Pure lasso variant of the pipeline
    pub fn lasso() -> Self {
        Self {
            mixing_ratio: 1.0,
            ..Self::default()
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| -> Result<()> {
            Err(RatingError::ConfigurationError {
                message: message.to_string(),
            }
            .into())
        };

        if !(self.margin_cap > 0.0) {
            return invalid("Margin cap must be positive");
        }
        if !(0.0..=1.0).contains(&self.mixing_ratio) {
            return invalid("Mixing ratio must be between 0 and 1");
        }
        if self.path_length == 0 {
            return invalid("Path length must be at least 1");
        }
        if !(self.path_ratio > 0.0 && self.path_ratio < 1.0) {
            return invalid("Path ratio must be strictly between 0 and 1");
        }
        if self.max_iterations == 0 {
            return invalid("Max iterations must be greater than 0");
        }
        if !(self.tolerance > 0.0) {
            return invalid("Tolerance must be positive");
        }
        if self.min_folds < 2 {
            return invalid("Cross-validation needs at least 2 folds");
        }
        if self.max_folds < self.min_folds {
            return invalid("Max folds must not be below min folds");
        }

        Ok(())
    }

    /// Fold count for a schedule with `games` scored games
    pub fn fold_count(&self, games: usize) -> usize {
        (games / 2)
            .clamp(self.min_folds, self.max_folds)
            .min(games)
    }
}
