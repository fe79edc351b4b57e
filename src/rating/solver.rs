//! Linear regression solvers
//!
//! Two models fit margins against a [`DesignMatrix`], both with an
//! unpenalized intercept:
//!
//! * [`ElasticNet`] minimizes
//!   `1/(2n) · ‖y − b₀ − Xβ‖² + λ · (α‖β‖₁ + (1 − α)/2 · ‖β‖²)`
//!   by cyclic coordinate descent with soft thresholding.
//! * [`OrdinaryLeastSquares`] solves the normal equations exactly.
//!
//! The data term is scaled per observation, so a given penalty strength
//! means the same thing for short and long schedules.

use crate::error::{RatingError, Result};
use crate::rating::design::DesignMatrix;
use crate::types::ModelStats;
use serde::{Deserialize, Serialize};

/// Mixing ratios below this are treated as this when sizing the path
const MIN_PATH_MIXING: f64 = 1e-3;

/// Relative size below which a pivot is considered zero
const PIVOT_EPSILON: f64 = 1e-10;

/// A fitted linear model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    /// One coefficient per design column
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Penalty strength the model was fit at (0 for least squares)
    pub penalty: f64,
    pub iterations: usize,
    pub converged: bool,
    /// Largest coefficient change in the final sweep
    pub max_change: f64,
}

impl LinearFit {
    /// Predicted margin for every row of `design`
    pub fn predict(&self, design: &DesignMatrix) -> Vec<f64> {
        let mut predictions = vec![self.intercept; design.n_rows()];
        for (beta, column) in self.coefficients.iter().zip(design.columns()) {
            for &(row, value) in column {
                predictions[row] += beta * value;
            }
        }
        predictions
    }

    /// Mean squared error against the design's targets
    pub fn mean_squared_error(&self, design: &DesignMatrix) -> f64 {
        if design.n_rows() == 0 {
            return 0.0;
        }
        sum_squared_error(&self.predict(design), design.targets()) / design.n_rows() as f64
    }

    /// Goodness-of-fit on `design`
    pub fn stats(&self, design: &DesignMatrix) -> ModelStats {
        let targets = design.targets();
        let n = targets.len().max(1) as f64;
        let sse = sum_squared_error(&self.predict(design), targets);
        let mean = targets.iter().sum::<f64>() / n;
        let sst: f64 = targets.iter().map(|y| (y - mean).powi(2)).sum();

        let r_squared = if sst > 0.0 {
            1.0 - sse / sst
        } else if sse == 0.0 {
            1.0
        } else {
            0.0
        };

        ModelStats {
            home_advantage: self.intercept,
            r_squared,
            rmse: (sse / n).sqrt(),
        }
    }

    /// Elastic net penalty term `α‖β‖₁ + (1 − α)/2 · ‖β‖²` without λ
    pub fn penalty_value(&self, mixing_ratio: f64) -> f64 {
        let l1: f64 = self.coefficients.iter().map(|b| b.abs()).sum();
        let l2: f64 = self.coefficients.iter().map(|b| b * b).sum();
        mixing_ratio * l1 + (1.0 - mixing_ratio) * 0.5 * l2
    }
}

fn sum_squared_error(predictions: &[f64], targets: &[f64]) -> f64 {
    predictions
        .iter()
        .zip(targets)
        .map(|(p, y)| (y - p).powi(2))
        .sum()
}

/// Trait for fitting margins against a design matrix
pub trait RegressionModel: Send + Sync {
    /// Fit the model to the design's columns and targets
    fn fit(&self, design: &DesignMatrix) -> Result<LinearFit>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Centered copy of a design, shared by both solvers.
///
/// Centering columns and targets removes the intercept from the problem;
/// it is recovered as `ȳ − Σ x̄ⱼβⱼ`.
struct CenteredProblem {
    n: usize,
    x_means: Vec<f64>,
    y_mean: f64,
    columns: Vec<Vec<f64>>,
    /// `‖x̃ⱼ‖² / n`
    norms: Vec<f64>,
    y_centered: Vec<f64>,
}

impl CenteredProblem {
    fn new(design: &DesignMatrix) -> Self {
        let n = design.n_rows();
        let nf = n.max(1) as f64;
        let y_mean = design.targets().iter().sum::<f64>() / nf;
        let y_centered = design.targets().iter().map(|y| y - y_mean).collect();

        let mut x_means = Vec::with_capacity(design.n_columns());
        let mut columns = Vec::with_capacity(design.n_columns());
        let mut norms = Vec::with_capacity(design.n_columns());
        for sparse in design.columns() {
            let mean = sparse.iter().map(|(_, v)| v).sum::<f64>() / nf;
            let mut dense = vec![-mean; n];
            for &(row, value) in sparse {
                dense[row] += value;
            }
            norms.push(dense.iter().map(|x| x * x).sum::<f64>() / nf);
            x_means.push(mean);
            columns.push(dense);
        }

        Self {
            n,
            x_means,
            y_mean,
            columns,
            norms,
            y_centered,
        }
    }

    fn intercept(&self, beta: &[f64]) -> f64 {
        self.y_mean
            - self
                .x_means
                .iter()
                .zip(beta)
                .map(|(m, b)| m * b)
                .sum::<f64>()
    }

    /// Smallest penalty at which every coefficient is zero
    fn max_penalty(&self, mixing_ratio: f64) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        let max_corr = self
            .columns
            .iter()
            .map(|col| dot(col, &self.y_centered).abs())
            .fold(0.0, f64::max);
        max_corr / (self.n as f64 * mixing_ratio.max(MIN_PATH_MIXING))
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

/// Largest penalty on a useful regularization path for `design`
pub fn max_penalty(design: &DesignMatrix, mixing_ratio: f64) -> f64 {
    CenteredProblem::new(design).max_penalty(mixing_ratio)
}

/// Elastic net regression by coordinate descent
#[derive(Debug, Clone, PartialEq)]
pub struct ElasticNet {
    /// Penalty strength λ
    pub penalty: f64,
    /// Share α of the penalty applied as L1
    pub mixing_ratio: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for ElasticNet {
    fn default() -> Self {
        Self {
            penalty: 1.0,
            mixing_ratio: 0.5,
            max_iterations: 5000,
            tolerance: 1e-6,
        }
    }
}

impl ElasticNet {
    pub fn new(penalty: f64, mixing_ratio: f64) -> Self {
        Self {
            penalty,
            mixing_ratio,
            ..Self::default()
        }
    }

    pub fn with_limits(mut self, max_iterations: usize, tolerance: f64) -> Self {
        self.max_iterations = max_iterations;
        self.tolerance = tolerance;
        self
    }

    /// Fit at each penalty in order, warm-starting from the previous fit.
    ///
    /// Penalties should be descending for warm starts to help.
    pub fn fit_path(&self, design: &DesignMatrix, penalties: &[f64]) -> Vec<LinearFit> {
        let problem = CenteredProblem::new(design);
        let mut beta = vec![0.0; design.n_columns()];
        let mut residual = problem.y_centered.clone();

        penalties
            .iter()
            .map(|&penalty| self.solve(&problem, &mut beta, &mut residual, penalty))
            .collect()
    }

    /// Run coordinate descent from the current `beta`, keeping `residual`
    /// equal to `ỹ − X̃β`.
    fn solve(
        &self,
        problem: &CenteredProblem,
        beta: &mut [f64],
        residual: &mut [f64],
        penalty: f64,
    ) -> LinearFit {
        let l1 = penalty * self.mixing_ratio;
        let l2 = penalty * (1.0 - self.mixing_ratio);
        let n = problem.n.max(1) as f64;

        let mut iterations = 0;
        let mut converged = problem.n == 0 || beta.is_empty();
        let mut max_change = 0.0;

        while !converged && iterations < self.max_iterations {
            iterations += 1;
            max_change = 0.0;

            for j in 0..beta.len() {
                let norm = problem.norms[j];
                if norm <= 0.0 {
                    // Column carries no information on these rows.
                    beta[j] = 0.0;
                    continue;
                }

                let column = &problem.columns[j];
                let old = beta[j];
                let rho = dot(column, residual) / n + norm * old;
                let new = soft_threshold(rho, l1) / (norm + l2);
                let delta = new - old;

                if delta != 0.0 {
                    for (r, x) in residual.iter_mut().zip(column) {
                        *r -= x * delta;
                    }
                    beta[j] = new;
                    max_change = f64::max(max_change, delta.abs());
                }
            }

            converged = max_change <= self.tolerance;
        }

        LinearFit {
            coefficients: beta.to_vec(),
            intercept: problem.intercept(beta),
            penalty,
            iterations,
            converged,
            max_change,
        }
    }
}

impl RegressionModel for ElasticNet {
    fn fit(&self, design: &DesignMatrix) -> Result<LinearFit> {
        if !(self.penalty >= 0.0) || !(0.0..=1.0).contains(&self.mixing_ratio) {
            return Err(RatingError::ConfigurationError {
                message: format!(
                    "Invalid elastic net parameters: penalty {}, mixing ratio {}",
                    self.penalty, self.mixing_ratio
                ),
            }
            .into());
        }

        let problem = CenteredProblem::new(design);
        let mut beta = vec![0.0; design.n_columns()];
        let mut residual = problem.y_centered.clone();

        Ok(self.solve(&problem, &mut beta, &mut residual, self.penalty))
    }

    fn name(&self) -> &'static str {
        "elastic_net"
    }
}

/// Unpenalized least squares via the normal equations
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrdinaryLeastSquares;

impl RegressionModel for OrdinaryLeastSquares {
    fn fit(&self, design: &DesignMatrix) -> Result<LinearFit> {
        let problem = CenteredProblem::new(design);
        let p = design.n_columns();

        let mut gram = vec![vec![0.0; p]; p];
        for j in 0..p {
            for k in j..p {
                let value = dot(&problem.columns[j], &problem.columns[k]);
                gram[j][k] = value;
                gram[k][j] = value;
            }
        }
        let rhs: Vec<f64> = problem
            .columns
            .iter()
            .map(|col| dot(col, &problem.y_centered))
            .collect();

        let beta = solve_symmetric(gram, rhs);

        Ok(LinearFit {
            intercept: problem.intercept(&beta),
            coefficients: beta,
            penalty: 0.0,
            iterations: 1,
            converged: true,
            max_change: 0.0,
        })
    }

    fn name(&self) -> &'static str {
        "ordinary_least_squares"
    }
}

/// Solve `A x = b` by Gauss-Jordan elimination with partial pivoting.
///
/// Columns without a usable pivot are free variables and get 0, which
/// yields a valid least squares solution when `A` is a singular Gram matrix
/// (for example a schedule split into groups that never met).
fn solve_symmetric(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let p = b.len();
    let scale = (0..p).map(|i| a[i][i].abs()).fold(0.0, f64::max);
    let epsilon = scale * PIVOT_EPSILON;

    let mut pivots = Vec::with_capacity(p);
    let mut row = 0;
    for col in 0..p {
        if row == p {
            break;
        }

        let (best, magnitude) = (row..p)
            .map(|r| (r, a[r][col].abs()))
            .fold((row, -1.0), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
        if magnitude <= epsilon {
            continue;
        }

        a.swap(row, best);
        b.swap(row, best);

        let pivot = a[row][col];
        for value in a[row][col..].iter_mut() {
            *value /= pivot;
        }
        b[row] /= pivot;

        let pivot_row = a[row].clone();
        let pivot_rhs = b[row];
        for r in 0..p {
            if r == row {
                continue;
            }
            let factor = a[r][col];
            if factor != 0.0 {
                for (value, pv) in a[r][col..].iter_mut().zip(&pivot_row[col..]) {
                    *value -= factor * pv;
                }
                b[r] -= factor * pivot_rhs;
            }
        }

        pivots.push((row, col));
        row += 1;
    }

    let mut x = vec![0.0; p];
    for (r, c) in pivots {
        x[c] = b[r];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::reference::{default_reference, drop_reference};
    use crate::types::ScoredGame;
    use approx::assert_abs_diff_eq;

    fn game(home: &str, away: &str, margin: f64) -> ScoredGame {
        ScoredGame {
            home: Some(home.to_string()),
            away: Some(away.to_string()),
            margin,
        }
    }

    /// Double round robin of four teams with noisy margins
    fn league() -> DesignMatrix {
        let games = vec![
            game("a", "b", 12.0),
            game("a", "c", 15.0),
            game("a", "d", 22.0),
            game("b", "a", -6.0),
            game("b", "c", 4.0),
            game("b", "d", 11.0),
            game("c", "a", -9.0),
            game("c", "b", 3.0),
            game("c", "d", 7.0),
            game("d", "a", -18.0),
            game("d", "b", -2.0),
            game("d", "c", 1.0),
        ];
        DesignMatrix::from_games(&games)
    }

    fn reduced_league() -> DesignMatrix {
        let design = league();
        drop_reference(&design, default_reference(&design).unwrap())
    }

    #[test]
    fn test_solve_symmetric_regular() {
        let a = vec![vec![4.0, 1.0], vec![1.0, 3.0]];
        let x = solve_symmetric(a, vec![1.0, 2.0]);
        assert_abs_diff_eq!(x[0], 1.0 / 11.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 7.0 / 11.0, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_symmetric_singular() {
        // Rank one: x0 + x1 = 2 has many solutions, the free one is zeroed.
        let a = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        let x = solve_symmetric(a, vec![2.0, 2.0]);
        assert_abs_diff_eq!(x[0] + x[1], 2.0, epsilon = 1e-12);
        assert_eq!(x[1], 0.0);
    }

    #[test]
    fn test_ols_satisfies_normal_equations() {
        let design = reduced_league();
        let fit = OrdinaryLeastSquares.fit(&design).unwrap();
        let predictions = fit.predict(&design);
        let residuals: Vec<f64> = design
            .targets()
            .iter()
            .zip(&predictions)
            .map(|(y, p)| y - p)
            .collect();

        // Residuals are orthogonal to the intercept and every column.
        assert_abs_diff_eq!(residuals.iter().sum::<f64>(), 0.0, epsilon = 1e-9);
        for column in design.columns() {
            let projection: f64 = column.iter().map(|&(r, v)| residuals[r] * v).sum();
            assert_abs_diff_eq!(projection, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_ols_recovers_exact_strengths() {
        // Margins generated from strengths a=6, b=1, c=-2, d=0 and home edge 3.
        let strengths = [("a", 6.0), ("b", 1.0), ("c", -2.0), ("d", 0.0)];
        let mut games = Vec::new();
        for (home, hs) in strengths {
            for (away, aws) in strengths {
                if home != away {
                    games.push(game(home, away, 3.0 + hs - aws));
                }
            }
        }
        let design = DesignMatrix::from_games(&games);
        let reduced = drop_reference(&design, 3);

        let fit = OrdinaryLeastSquares.fit(&reduced).unwrap();
        assert_abs_diff_eq!(fit.intercept, 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.coefficients[0], 6.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.coefficients[1], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.coefficients[2], -2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.stats(&reduced).r_squared, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_penalty_matches_least_squares() {
        let design = reduced_league();
        let ols = OrdinaryLeastSquares.fit(&design).unwrap();
        let net = ElasticNet::new(0.0, 0.5)
            .with_limits(100_000, 1e-10)
            .fit(&design)
            .unwrap();

        assert!(net.converged);
        for (a, b) in ols.coefficients.iter().zip(&net.coefficients) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(ols.intercept, net.intercept, epsilon = 1e-6);
    }

    #[test]
    fn test_large_penalty_zeroes_coefficients() {
        let design = league();
        let lambda_max = max_penalty(&design, 0.5);
        assert!(lambda_max > 0.0);

        let fit = ElasticNet::new(lambda_max * 1.01, 0.5).fit(&design).unwrap();
        assert!(fit.coefficients.iter().all(|b| *b == 0.0));
        let mean_margin = design.targets().iter().sum::<f64>() / design.n_rows() as f64;
        assert_abs_diff_eq!(fit.intercept, mean_margin, epsilon = 1e-12);

        let below = ElasticNet::new(lambda_max * 0.9, 0.5).fit(&design).unwrap();
        assert!(below.coefficients.iter().any(|b| *b != 0.0));
    }

    #[test]
    fn test_shrinkage_is_monotone() {
        let design = reduced_league();
        for mixing_ratio in [0.0, 0.5, 1.0] {
            let lambda_max = max_penalty(&design, mixing_ratio);
            let penalties: Vec<f64> = (0..20)
                .map(|i| lambda_max * 0.7f64.powi(i))
                .collect();

            let net = ElasticNet::new(0.0, mixing_ratio).with_limits(100_000, 1e-10);
            let path = net.fit_path(&design, &penalties);

            // Penalties descend, so the penalty term must not decrease.
            for pair in path.windows(2) {
                let stronger = pair[0].penalty_value(mixing_ratio);
                let weaker = pair[1].penalty_value(mixing_ratio);
                assert!(
                    weaker >= stronger - 1e-6,
                    "mixing {}: {} then {}",
                    mixing_ratio,
                    stronger,
                    weaker
                );
            }
        }
    }

    #[test]
    fn test_iteration_cap_reports_non_convergence() {
        let design = reduced_league();
        let fit = ElasticNet::new(0.01, 0.5)
            .with_limits(1, 1e-12)
            .fit(&design)
            .unwrap();

        assert!(!fit.converged);
        assert_eq!(fit.iterations, 1);
        assert!(fit.max_change > 0.0);
        assert_eq!(fit.coefficients.len(), design.n_columns());
    }

    #[test]
    fn test_invalid_parameters() {
        let design = league();
        assert!(ElasticNet::new(-1.0, 0.5).fit(&design).is_err());
        assert!(ElasticNet::new(1.0, 1.5).fit(&design).is_err());
        assert!(ElasticNet::new(f64::NAN, 0.5).fit(&design).is_err());
    }

    #[test]
    fn test_empty_design() {
        let design = DesignMatrix::from_games(&[]);
        let fit = ElasticNet::default().fit(&design).unwrap();
        assert!(fit.coefficients.is_empty());
        assert!(fit.converged);

        let ols = OrdinaryLeastSquares.fit(&design).unwrap();
        assert!(ols.coefficients.is_empty());
        assert_eq!(ols.intercept, 0.0);
    }
}
