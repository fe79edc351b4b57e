//! Turning fitted coefficients into presented ratings

use crate::types::{TeamKey, TeamRating};
use crate::utils::{mean, round_to};
use std::collections::HashMap;

/// Shift `values` so they sum to zero
pub fn center(values: &[f64]) -> Vec<f64> {
    let offset = mean(values);
    values.iter().map(|v| v - offset).collect()
}

/// Centered ratings keyed by team
pub fn centered_by_team(teams: &[TeamKey], coefficients: &[f64]) -> HashMap<TeamKey, f64> {
    teams
        .iter()
        .cloned()
        .zip(center(coefficients))
        .collect()
}

/// Center, order and round ratings for presentation.
///
/// Ordering uses the unrounded values, strongest first, with ties broken by
/// team key. `reference` supplies the optional unpenalized rating for each
/// team and is rounded the same way.
pub fn present_ratings(
    teams: &[TeamKey],
    coefficients: &[f64],
    reference: Option<&HashMap<TeamKey, f64>>,
    precision: u32,
) -> Vec<TeamRating> {
    let mut ranked: Vec<(&TeamKey, f64)> = teams.iter().zip(center(coefficients)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .map(|(team, rating)| TeamRating {
            team: team.clone(),
            rating: round_to(rating, precision),
            reference_rating: reference
                .and_then(|r| r.get(team))
                .map(|v| round_to(*v, precision)),
        })
        .collect()
}
