//! Common types used throughout the rating engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Normalized team name, the sole identity of a team across games
pub type TeamKey = String;

/// A raw score as delivered by the loading collaborator.
///
/// Scrapers emit numbers, numeric strings, empty strings or nulls; anything
/// else is kept as an opaque value and treated as "no score".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl ScoreValue {
    /// Numeric value of the score, if it is a finite number
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            ScoreValue::Number(n) => *n,
            ScoreValue::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok()?
            }
            ScoreValue::Other(_) => return None,
        };

        value.is_finite().then_some(value)
    }
}

impl From<f64> for ScoreValue {
    fn from(value: f64) -> Self {
        ScoreValue::Number(value)
    }
}

impl From<&str> for ScoreValue {
    fn from(value: &str) -> Self {
        ScoreValue::Text(value.to_string())
    }
}

/// A scheduled or completed game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Game {
    #[serde(default)]
    pub home_team: Option<String>,
    #[serde(default)]
    pub away_team: Option<String>,
    #[serde(default)]
    pub home_score: Option<ScoreValue>,
    #[serde(default)]
    pub away_score: Option<ScoreValue>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub court: Option<String>,
}

impl Game {
    /// Convenience constructor for a completed game
    pub fn completed(home: &str, away: &str, home_score: f64, away_score: f64) -> Self {
        Self {
            home_team: Some(home.to_string()),
            away_team: Some(away.to_string()),
            home_score: Some(ScoreValue::Number(home_score)),
            away_score: Some(ScoreValue::Number(away_score)),
            ..Self::default()
        }
    }

    /// Convenience constructor for a game that has not been played yet
    pub fn scheduled(home: &str, away: &str) -> Self {
        Self {
            home_team: Some(home.to_string()),
            away_team: Some(away.to_string()),
            ..Self::default()
        }
    }
}

/// A game that survived filtering, reduced to what the model needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredGame {
    pub home: Option<TeamKey>,
    pub away: Option<TeamKey>,
    /// Home minus away score, clipped to the configured cap
    pub margin: f64,
}

/// Rule used to pick the penalty strength from the cross-validation curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltySelection {
    /// Penalty with the lowest mean cross-validated error
    #[default]
    MinimumError,
    /// Strongest penalty within one standard error of the minimum
    OneStandardError,
}

impl std::fmt::Display for PenaltySelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PenaltySelection::MinimumError => write!(f, "lambda.min"),
            PenaltySelection::OneStandardError => write!(f, "lambda.1se"),
        }
    }
}

impl FromStr for PenaltySelection {
    type Err = crate::error::RatingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "min" | "minimum" | "minimum_error" | "lambda.min" => {
                Ok(PenaltySelection::MinimumError)
            }
            "1se" | "one_se" | "one_standard_error" | "lambda.1se" => {
                Ok(PenaltySelection::OneStandardError)
            }
            other => Err(crate::error::RatingError::ConfigurationError {
                message: format!("Unknown penalty selection rule: {}", other),
            }),
        }
    }
}

/// Final rating of a single team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRating {
    pub team: TeamKey,
    /// Centered regularized rating, rounded for display
    pub rating: f64,
    /// Centered unpenalized (least squares) rating, when available
    pub reference_rating: Option<f64>,
}

/// Non-fatal conditions raised during a rating run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RatingWarning {
    /// Coordinate descent hit its iteration cap
    NonConvergence {
        penalty: f64,
        iterations: usize,
        max_change: f64,
    },
    /// No penalty met the one-standard-error threshold
    OneStandardErrorFallback { threshold: f64 },
    /// Too few games to form cross-validation folds
    CrossValidationSkipped { games: usize },
}

impl std::fmt::Display for RatingWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RatingWarning::NonConvergence {
                penalty,
                iterations,
                max_change,
            } => write!(
                f,
                "solver did not converge at penalty {:.6} after {} iterations (last change {:.3e})",
                penalty, iterations, max_change
            ),
            RatingWarning::OneStandardErrorFallback { threshold } => write!(
                f,
                "no penalty within one standard error (threshold {:.4}), using minimum error",
                threshold
            ),
            RatingWarning::CrossValidationSkipped { games } => write!(
                f,
                "only {} games with scores, cross-validation skipped",
                games
            ),
        }
    }
}

/// Goodness-of-fit statistics for one fitted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    /// Fitted intercept, the average home advantage in points
    pub home_advantage: f64,
    pub r_squared: f64,
    pub rmse: f64,
}

/// Details of how the ratings were produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub teams: usize,
    pub folds: usize,
    pub mixing_ratio: f64,
    /// Penalty used for the final fit
    pub penalty: f64,
    /// Penalty with minimal cross-validated error
    pub min_error_penalty: f64,
    /// Rule that actually determined `penalty`
    pub selection: PenaltySelection,
    pub iterations: usize,
    pub converged: bool,
    pub regularized: ModelStats,
    pub unpenalized: ModelStats,
}

/// Output of one rating run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingReport {
    /// Teams sorted by rating, strongest first
    pub ratings: Vec<TeamRating>,
    pub summary: Option<FitSummary>,
    pub warnings: Vec<RatingWarning>,
    pub games_used: usize,
    pub games_dropped: usize,
    pub generated_at: DateTime<Utc>,
}

impl RatingReport {
    /// Report for a run with no usable games
    pub fn empty(games_dropped: usize) -> Self {
        Self {
            ratings: Vec::new(),
            summary: None,
            warnings: Vec::new(),
            games_used: 0,
            games_dropped,
            generated_at: crate::utils::current_timestamp(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// Rating of a team by key
    pub fn rating_of(&self, team: &str) -> Option<f64> {
        self.ratings
            .iter()
            .find(|r| r.team == team)
            .map(|r| r.rating)
    }
}
