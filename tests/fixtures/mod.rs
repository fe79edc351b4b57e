//! Schedule generators for integration testing

use margin_ratings::types::{Game, ScoreValue};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Base score both teams start from before strength and noise
const BASE_SCORE: f64 = 50.0;

/// A synthetic league with known team strengths
#[derive(Debug, Clone)]
pub struct League {
    /// Display names with their true strength, strongest first
    pub teams: Vec<(String, f64)>,
    pub home_advantage: f64,
}

impl League {
    /// `count` teams spaced `spacing` points apart, strongest first
    pub fn evenly_spaced(count: usize, spacing: f64) -> Self {
        let teams = (0..count)
            .map(|i| {
                let strength = spacing * ((count - 1) as f64 / 2.0 - i as f64);
                (format!("Team {}", (b'A' + i as u8) as char), strength)
            })
            .collect();

        Self {
            teams,
            home_advantage: 3.0,
        }
    }

    /// Normalized keys in order of true strength
    pub fn expected_order(&self) -> Vec<String> {
        self.teams
            .iter()
            .map(|(name, _)| name.to_lowercase().replace(' ', "_"))
            .collect()
    }

    /// Every team hosts every other team `rounds` times, with uniform noise
    /// of up to `noise` points on each margin.
    pub fn round_robin(&self, rounds: usize, noise: f64, seed: u64) -> Vec<Game> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut games = Vec::new();

        for _ in 0..rounds {
            for (home, home_strength) in &self.teams {
                for (away, away_strength) in &self.teams {
                    if home == away {
                        continue;
                    }
                    let jitter = if noise > 0.0 {
                        rng.random_range(-noise..noise)
                    } else {
                        0.0
                    };
                    let margin = self.home_advantage + home_strength - away_strength + jitter;
                    games.push(Game::completed(
                        home,
                        away,
                        BASE_SCORE + margin / 2.0,
                        BASE_SCORE - margin / 2.0,
                    ));
                }
            }
        }

        games
    }
}

/// A game whose scores arrived as text, as scraped schedules often have
pub fn text_scored_game(home: &str, away: &str, home_score: &str, away_score: &str) -> Game {
    let mut game = Game::scheduled(home, away);
    game.home_score = Some(ScoreValue::from(home_score));
    game.away_score = Some(ScoreValue::from(away_score));
    game
}

/// Two groups of teams that never play each other
pub fn split_schedule() -> Vec<Game> {
    let mut games = League::evenly_spaced(3, 6.0).round_robin(2, 2.0, 11);
    let east = League {
        teams: vec![
            ("East One".to_string(), 5.0),
            ("East Two".to_string(), 0.0),
            ("East Three".to_string(), -5.0),
        ],
        home_advantage: 3.0,
    };
    games.extend(east.round_robin(2, 2.0, 12));
    games
}
