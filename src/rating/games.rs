//! Game filtering and margin extraction

use crate::error::{RatingError, Result};
use crate::rating::normalize::normalize_team_name;
use crate::types::{Game, ScoredGame, TeamKey};
use std::collections::BTreeSet;

/// Parse a JSON array of game records as produced by the schedule scraper
pub fn games_from_json(raw: &str) -> Result<Vec<Game>> {
    serde_json::from_str(raw).map_err(|e| {
        RatingError::InputError {
            reason: format!("Malformed games document: {}", e),
        }
        .into()
    })
}

/// Keep games with two numeric scores and compute their capped margins.
///
/// Games with a missing, empty or non-numeric score are dropped silently.
pub fn scored_games(games: &[Game], margin_cap: f64) -> Vec<ScoredGame> {
    games
        .iter()
        .filter_map(|game| {
            let home_score = game.home_score.as_ref()?.as_number()?;
            let away_score = game.away_score.as_ref()?.as_number()?;

            Some(ScoredGame {
                home: normalize_team_name(game.home_team.as_deref()),
                away: normalize_team_name(game.away_team.as_deref()),
                margin: clip_margin(home_score - away_score, margin_cap),
            })
        })
        .collect()
}

/// Clip a margin to `[-cap, cap]`
pub fn clip_margin(margin: f64, cap: f64) -> f64 {
    margin.clamp(-cap, cap)
}

/// Sorted, deduplicated keys of every team appearing in `games`
pub fn team_universe(games: &[ScoredGame]) -> Vec<TeamKey> {
    games
        .iter()
        .flat_map(|g| [g.home.as_ref(), g.away.as_ref()])
        .flatten()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
