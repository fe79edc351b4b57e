//! End-to-end rating pipeline
//!
//! A run filters the schedule to scored games, builds the design matrix,
//! fits the unpenalized reference model, selects the elastic net penalty by
//! cross-validation, refits on every game and post-processes the result.

use crate::config::RatingConfig;
use crate::error::{RatingError, Result};
use crate::rating::cross_validation::PenaltySelector;
use crate::rating::design::DesignMatrix;
use crate::rating::games::{scored_games, team_universe};
use crate::rating::postprocess::{centered_by_team, present_ratings};
use crate::rating::reference::{
    center_groups, default_reference, drop_reference, reinstate_reference,
};
use crate::rating::solver::{OrdinaryLeastSquares, RegressionModel};
use crate::types::{FitSummary, Game, RatingReport, RatingWarning};
use crate::utils::current_timestamp;
use tracing::{debug, info, warn};

/// Produces team ratings from a list of games
#[derive(Debug, Clone)]
pub struct RatingEngine {
    config: RatingConfig,
    selector: PenaltySelector,
}

impl RatingEngine {
    /// Create an engine, rejecting invalid configuration
    pub fn new(config: RatingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            selector: PenaltySelector::from_config(&config),
            config,
        })
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    /// Rate every team that appears in a scored game.
    ///
    /// Unscored or malformed games are dropped and counted. A schedule with
    /// no scored games yields an empty report.
    pub fn rate(&self, games: &[Game]) -> Result<RatingReport> {
        self.rate_with_reference(games, None)
    }

    /// Like [`rate`](Self::rate), pinning `reference` (a normalized team
    /// key) instead of the last team for the unpenalized fit.
    pub fn rate_with_reference(
        &self,
        games: &[Game],
        reference: Option<&str>,
    ) -> Result<RatingReport> {
        let scored = scored_games(games, self.config.margin_cap);
        let games_dropped = games.len() - scored.len();
        if games_dropped > 0 {
            debug!("Dropped {} games without usable scores", games_dropped);
        }

        let teams = team_universe(&scored);
        if teams.is_empty() {
            info!("No scored games to rate ({} dropped)", games_dropped);
            return Ok(RatingReport::empty(games_dropped));
        }

        let design = DesignMatrix::build(&scored, &teams);
        let reference_index = match reference {
            Some(key) => teams.iter().position(|t| t == key).ok_or_else(|| {
                RatingError::InputError {
                    reason: format!("Reference team '{}' played no scored games", key),
                }
            })?,
            None => default_reference(&design).unwrap_or(0),
        };

        let reduced = drop_reference(&design, reference_index);
        let unpenalized = OrdinaryLeastSquares.fit(&reduced)?;
        let unpenalized_ratings = centered_by_team(
            &teams,
            &center_groups(
                &design,
                &reinstate_reference(&unpenalized.coefficients, reference_index),
            ),
        );
        debug!(
            "Fit {} on {} games with reference team {}",
            OrdinaryLeastSquares.name(),
            design.n_rows(),
            teams[reference_index]
        );

        let (choice, curve, fit) = self.selector.select_and_fit(&design, self.config.selection)?;

        let mut warnings = Vec::new();
        warnings.extend(choice.warning.clone());
        if !fit.converged {
            warn!(
                "Elastic net did not converge at penalty {} after {} iterations",
                fit.penalty, fit.iterations
            );
            warnings.push(RatingWarning::NonConvergence {
                penalty: fit.penalty,
                iterations: fit.iterations,
                max_change: fit.max_change,
            });
        }

        let ratings = present_ratings(
            &teams,
            &fit.coefficients,
            self.config
                .include_reference_ratings
                .then_some(&unpenalized_ratings),
            self.config.display_precision,
        );

        let summary = FitSummary {
            teams: teams.len(),
            folds: curve.as_ref().map_or(0, |c| c.folds),
            mixing_ratio: self.config.mixing_ratio,
            penalty: choice.penalty,
            min_error_penalty: choice.min_error_penalty,
            selection: choice.applied,
            iterations: fit.iterations,
            converged: fit.converged,
            regularized: fit.stats(&design),
            unpenalized: unpenalized.stats(&reduced),
        };

        info!(
            "Rated {} teams from {} games, penalty {:.4} ({}), home advantage {:.2}",
            summary.teams,
            design.n_rows(),
            summary.penalty,
            summary.selection,
            summary.regularized.home_advantage
        );

        Ok(RatingReport {
            ratings,
            summary: Some(summary),
            warnings,
            games_used: scored.len(),
            games_dropped,
            generated_at: current_timestamp(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PenaltySelection;
    use approx::assert_abs_diff_eq;

    fn engine() -> RatingEngine {
        RatingEngine::new(RatingConfig::default()).unwrap()
    }

    fn three_team_games() -> Vec<Game> {
        vec![
            Game::completed("A", "B", 30.0, 20.0),
            Game::completed("B", "C", 25.0, 20.0),
            Game::completed("A", "C", 40.0, 20.0),
        ]
    }

    #[test]
    fn test_three_team_example() {
        let report = engine().rate(&three_team_games()).unwrap();

        let order: Vec<&str> = report.ratings.iter().map(|r| r.team.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert!(report.rating_of("a").unwrap() > 0.0);
        assert!(report.rating_of("c").unwrap() < 0.0);
        assert_eq!(report.games_used, 3);
        assert!(report
            .warnings
            .contains(&RatingWarning::CrossValidationSkipped { games: 3 }));

        // Three games, two rating differences and a home edge fit exactly.
        let reference: Vec<f64> = report
            .ratings
            .iter()
            .map(|r| r.reference_rating.unwrap())
            .collect();
        assert_eq!(reference, vec![13.33, -1.67, -11.67]);
    }

    #[test]
    fn test_empty_input() {
        let games = vec![
            Game::scheduled("A", "B"),
            Game::scheduled("C", "D"),
        ];
        let report = engine().rate(&games).unwrap();

        assert!(report.is_empty());
        assert!(report.summary.is_none());
        assert_eq!(report.games_dropped, 2);
        assert!(engine().rate(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_team_without_scored_games_is_absent() {
        let mut games = three_team_games();
        games.push(Game::scheduled("A", "Drifters"));

        let report = engine().rate(&games).unwrap();
        assert_eq!(report.ratings.len(), 3);
        assert!(report.rating_of("drifters").is_none());
        assert_eq!(report.games_dropped, 1);
    }

    #[test]
    fn test_ratings_are_centered() {
        let report = engine().rate(&three_team_games()).unwrap();
        let sum: f64 = report.ratings.iter().map(|r| r.rating).sum();
        assert_abs_diff_eq!(sum, 0.0, epsilon = 0.02);
    }

    #[test]
    fn test_reference_choice_is_invisible() {
        let games = three_team_games();
        let engine = engine();
        let by_default = engine.rate(&games).unwrap();

        for team in ["a", "b", "c"] {
            let pinned = engine.rate_with_reference(&games, Some(team)).unwrap();
            assert_eq!(pinned.ratings, by_default.ratings);
        }
        assert!(engine.rate_with_reference(&games, Some("zzz")).is_err());
    }

    #[test]
    fn test_split_schedule_reference_ratings_ignore_reference() {
        let games = vec![
            Game::completed("A", "B", 30.0, 25.0),
            Game::completed("B", "A", 28.0, 30.0),
            Game::completed("C", "D", 40.0, 30.0),
            Game::completed("D", "C", 31.0, 35.0),
        ];
        let engine = engine();
        let baseline = engine.rate(&games).unwrap();

        for team in ["a", "b", "c", "d"] {
            let pinned = engine.rate_with_reference(&games, Some(team)).unwrap();
            assert_eq!(pinned.ratings, baseline.ratings, "reference {}", team);
        }

        // Each group sits at mean zero on its own.
        let reference = |team: &str| {
            baseline
                .ratings
                .iter()
                .find(|r| r.team == team)
                .and_then(|r| r.reference_rating)
                .unwrap()
        };
        assert_abs_diff_eq!(reference("a") + reference("b"), 0.0, epsilon = 0.011);
        assert_abs_diff_eq!(reference("c") + reference("d"), 0.0, epsilon = 0.011);
    }

    #[test]
    fn test_non_convergence_is_reported() {
        let engine = RatingEngine::new(RatingConfig {
            max_iterations: 1,
            tolerance: 1e-12,
            ..RatingConfig::default()
        })
        .unwrap();

        let strengths = [("A", 12.0), ("B", 4.0), ("C", -4.0), ("D", -12.0)];
        let mut games = Vec::new();
        for (home, hs) in strengths {
            for (away, aws) in strengths {
                if home != away {
                    games.push(Game::completed(home, away, 50.0 + hs, 50.0 + aws));
                }
            }
        }

        let report = engine.rate(&games).unwrap();
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, RatingWarning::NonConvergence { iterations: 1, .. })));
        assert_eq!(report.ratings.len(), 4);
        assert!(!report.summary.unwrap().converged);
    }

    #[test]
    fn test_reference_ratings_can_be_disabled() {
        let engine = RatingEngine::new(RatingConfig {
            include_reference_ratings: false,
            ..RatingConfig::default()
        })
        .unwrap();

        let report = engine.rate(&three_team_games()).unwrap();
        assert!(report.ratings.iter().all(|r| r.reference_rating.is_none()));
    }

    #[test]
    fn test_summary_reports_fit() {
        let report = engine().rate(&three_team_games()).unwrap();
        let summary = report.summary.unwrap();

        assert_eq!(summary.teams, 3);
        assert_eq!(summary.folds, 0);
        assert_eq!(summary.selection, PenaltySelection::MinimumError);
        assert_abs_diff_eq!(summary.unpenalized.home_advantage, -5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(summary.unpenalized.r_squared, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RatingConfig {
            mixing_ratio: -0.1,
            ..RatingConfig::default()
        };
        assert!(RatingEngine::new(config).is_err());
    }
}
