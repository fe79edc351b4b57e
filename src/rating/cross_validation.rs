//! Cross-validated penalty selection
//!
//! Games are shuffled with a fixed seed and split into folds. For every
//! held-out fold the elastic net is fit along a descending penalty path on
//! the remaining games, and held-out mean squared error is recorded per
//! penalty. The resulting error curve picks the penalty, either at its
//! minimum or by the one-standard-error rule.

use crate::config::RatingConfig;
use crate::error::Result;
use crate::rating::design::DesignMatrix;
use crate::rating::solver::{max_penalty, ElasticNet, LinearFit, RegressionModel};
use crate::types::{PenaltySelection, RatingWarning};
use crate::utils::{mean, std_dev};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, warn};

/// Descending, log-spaced penalties from the path maximum down to
/// `max · ratio`. A design with nothing to explain gets a single zero.
pub fn penalty_path(design: &DesignMatrix, mixing_ratio: f64, length: usize, ratio: f64) -> Vec<f64> {
    let lambda_max = max_penalty(design, mixing_ratio);
    if !(lambda_max > 0.0) || !lambda_max.is_finite() || length == 0 {
        return vec![0.0];
    }
    if length == 1 {
        return vec![lambda_max];
    }

    let log_max = lambda_max.ln();
    let log_step = ratio.ln() / (length - 1) as f64;
    (0..length)
        .map(|i| (log_max + log_step * i as f64).exp())
        .collect()
}

/// Split `n_rows` shuffled row indices into `folds` near-equal groups.
///
/// The first `n_rows % folds` groups hold one extra row. Each group is
/// returned in ascending row order.
pub fn assign_folds(n_rows: usize, folds: usize, seed: u64) -> Vec<Vec<usize>> {
    if folds == 0 {
        return Vec::new();
    }

    let mut rows: Vec<usize> = (0..n_rows).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rows.shuffle(&mut rng);

    let base = n_rows / folds;
    let extra = n_rows % folds;
    let mut assigned = Vec::with_capacity(folds);
    let mut start = 0;
    for fold in 0..folds {
        let size = base + usize::from(fold < extra);
        let mut group = rows[start..start + size].to_vec();
        group.sort_unstable();
        assigned.push(group);
        start += size;
    }
    assigned
}

/// Cross-validated error for every penalty on the path
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorCurve {
    /// Candidate penalties, strongest first
    pub penalties: Vec<f64>,
    /// Mean held-out MSE across folds
    pub mean_errors: Vec<f64>,
    /// Population standard deviation of held-out MSE across folds
    pub std_errors: Vec<f64>,
    pub folds: usize,
}

/// Outcome of choosing a penalty from an [`ErrorCurve`]
#[derive(Debug, Clone, PartialEq)]
pub struct PenaltyChoice {
    pub penalty: f64,
    pub min_error_penalty: f64,
    /// Rule that actually produced `penalty`
    pub applied: PenaltySelection,
    pub warning: Option<RatingWarning>,
}

impl ErrorCurve {
    /// Index of the lowest mean error; ties go to the stronger penalty
    pub fn min_error_index(&self) -> usize {
        let mut best: Option<usize> = None;
        for (i, err) in self.mean_errors.iter().enumerate() {
            if !err.is_finite() {
                continue;
            }
            match best {
                Some(b) if self.mean_errors[b] <= *err => {}
                _ => best = Some(i),
            }
        }
        best.unwrap_or(self.penalties.len().saturating_sub(1))
    }

    /// Strongest penalty whose mean error is within one standard error of
    /// the minimum, if any qualifies
    pub fn one_standard_error_index(&self) -> Option<usize> {
        let threshold = self.one_standard_error_threshold();
        self.mean_errors.iter().position(|err| *err <= threshold)
    }

    pub fn one_standard_error_threshold(&self) -> f64 {
        let min = self.min_error_index();
        match (self.mean_errors.get(min), self.std_errors.get(min)) {
            (Some(m), Some(s)) => m + s,
            _ => f64::NAN,
        }
    }

    /// Choose a penalty using `rule`
    pub fn select(&self, rule: PenaltySelection) -> PenaltyChoice {
        let min_index = self.min_error_index();
        let min_error_penalty = self.penalties.get(min_index).copied().unwrap_or(0.0);

        let minimum = PenaltyChoice {
            penalty: min_error_penalty,
            min_error_penalty,
            applied: PenaltySelection::MinimumError,
            warning: None,
        };

        match rule {
            PenaltySelection::MinimumError => minimum,
            PenaltySelection::OneStandardError => match self.one_standard_error_index() {
                Some(index) => PenaltyChoice {
                    penalty: self.penalties[index],
                    min_error_penalty,
                    applied: PenaltySelection::OneStandardError,
                    warning: None,
                },
                None => {
                    let threshold = self.one_standard_error_threshold();
                    warn!(
                        "Could not apply 1-SE rule (threshold {}), using minimum error penalty",
                        threshold
                    );
                    PenaltyChoice {
                        warning: Some(RatingWarning::OneStandardErrorFallback { threshold }),
                        ..minimum
                    }
                }
            },
        }
    }
}

/// Selects the elastic net penalty by k-fold cross-validation
#[derive(Debug, Clone)]
pub struct PenaltySelector {
    net: ElasticNet,
    config: RatingConfig,
}

impl PenaltySelector {
    pub fn from_config(config: &RatingConfig) -> Self {
        Self {
            net: ElasticNet::new(0.0, config.mixing_ratio)
                .with_limits(config.max_iterations, config.tolerance),
            config: config.clone(),
        }
    }

    fn path(&self, design: &DesignMatrix) -> Vec<f64> {
        penalty_path(
            design,
            self.config.mixing_ratio,
            self.config.path_length,
            self.config.path_ratio,
        )
    }

    /// Held-out error curve over the penalty path of `design`.
    ///
    /// Returns `None` unless there are more games than the minimum number of
    /// folds. With exactly `min_folds` games every training set is missing a
    /// game that no other game can stand in for, so the curve would only ever
    /// favour the strongest penalty.
    pub fn error_curve(&self, design: &DesignMatrix) -> Option<ErrorCurve> {
        let n = design.n_rows();
        if n <= self.config.min_folds {
            return None;
        }

        let penalties = self.path(design);
        let folds = assign_folds(n, self.config.fold_count(n), self.config.fold_seed);

        let fold_errors: Vec<Vec<f64>> = if self.config.parallel_folds {
            folds
                .par_iter()
                .map(|held_out| self.fold_errors(design, held_out, &penalties))
                .collect()
        } else {
            folds
                .iter()
                .map(|held_out| self.fold_errors(design, held_out, &penalties))
                .collect()
        };

        let mut mean_errors = Vec::with_capacity(penalties.len());
        let mut std_errors = Vec::with_capacity(penalties.len());
        for i in 0..penalties.len() {
            let errors: Vec<f64> = fold_errors.iter().map(|f| f[i]).collect();
            mean_errors.push(mean(&errors));
            std_errors.push(std_dev(&errors));
        }

        Some(ErrorCurve {
            penalties,
            mean_errors,
            std_errors,
            folds: folds.len(),
        })
    }

    /// Held-out MSE per penalty with `held_out` rows excluded from training
    fn fold_errors(&self, design: &DesignMatrix, held_out: &[usize], penalties: &[f64]) -> Vec<f64> {
        let mut is_held_out = vec![false; design.n_rows()];
        for &row in held_out {
            is_held_out[row] = true;
        }
        let training: Vec<usize> = (0..design.n_rows()).filter(|r| !is_held_out[*r]).collect();

        let train = design.select_rows(&training);
        let test = design.select_rows(held_out);

        let fits = self.net.fit_path(&train, penalties);
        let unconverged = fits.iter().filter(|f| !f.converged).count();
        if unconverged > 0 {
            debug!(
                "{} of {} fold fits hit the iteration cap",
                unconverged,
                fits.len()
            );
        }

        fits.iter().map(|fit| fit.mean_squared_error(&test)).collect()
    }

    /// Pick a penalty for `design` by `rule` and refit on every game.
    pub fn select_and_fit(
        &self,
        design: &DesignMatrix,
        rule: PenaltySelection,
    ) -> Result<(PenaltyChoice, Option<ErrorCurve>, LinearFit)> {
        let (choice, curve) = match self.error_curve(design) {
            Some(curve) => {
                let choice = curve.select(rule);
                debug!(
                    "Cross-validated {} penalties over {} folds, min error penalty {:.6}",
                    curve.penalties.len(),
                    curve.folds,
                    choice.min_error_penalty
                );
                (choice, Some(curve))
            }
            None => {
                let weakest = self.path(design).last().copied().unwrap_or(0.0);
                warn!(
                    "Only {} games with scores, skipping cross-validation",
                    design.n_rows()
                );
                let choice = PenaltyChoice {
                    penalty: weakest,
                    min_error_penalty: weakest,
                    applied: PenaltySelection::MinimumError,
                    warning: Some(RatingWarning::CrossValidationSkipped {
                        games: design.n_rows(),
                    }),
                };
                (choice, None)
            }
        };

        let fit = ElasticNet {
            penalty: choice.penalty,
            ..self.net.clone()
        }
        .fit(design)?;

        Ok((choice, curve, fit))
    }
}
