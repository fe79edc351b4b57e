//! Design matrix construction
//!
//! Each retained game becomes a row with `+1` in the home team's column and
//! `-1` in the away team's column. Rows have at most two nonzero entries, so
//! the matrix is stored sparsely by column, which is the access pattern of
//! coordinate descent.

use crate::rating::games::team_universe;
use crate::types::{ScoredGame, TeamKey};
use std::collections::HashMap;

/// Sparse column-oriented games × teams matrix with its target margins
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    teams: Vec<TeamKey>,
    /// Per column, `(row, value)` pairs ordered by row
    columns: Vec<Vec<(usize, f64)>>,
    targets: Vec<f64>,
}

impl DesignMatrix {
    /// Build the matrix for `games` over the given team universe.
    ///
    /// Keys missing from `teams` (or absent on the game) leave their entry
    /// out of the row.
    pub fn build(games: &[ScoredGame], teams: &[TeamKey]) -> Self {
        let index: HashMap<&str, usize> = teams
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();

        let mut columns = vec![Vec::new(); teams.len()];
        for (row, game) in games.iter().enumerate() {
            let home = game.home.as_deref().and_then(|k| index.get(k).copied());
            let away = game.away.as_deref().and_then(|k| index.get(k).copied());

            match (home, away) {
                // A team cannot gain on itself; the entries cancel.
                (Some(h), Some(a)) if h == a => {}
                _ => {
                    if let Some(h) = home {
                        columns[h].push((row, 1.0));
                    }
                    if let Some(a) = away {
                        columns[a].push((row, -1.0));
                    }
                }
            }
        }

        Self {
            teams: teams.to_vec(),
            columns,
            targets: games.iter().map(|g| g.margin).collect(),
        }
    }

    /// Build the matrix over the sorted universe of teams in `games`
    pub fn from_games(games: &[ScoredGame]) -> Self {
        Self::build(games, &team_universe(games))
    }

    pub fn n_rows(&self) -> usize {
        self.targets.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Team key for each column
    pub fn teams(&self) -> &[TeamKey] {
        &self.teams
    }

    pub fn column(&self, j: usize) -> &[(usize, f64)] {
        &self.columns[j]
    }

    pub fn columns(&self) -> &[Vec<(usize, f64)>] {
        &self.columns
    }

    /// Margins, one per row
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Dense copy of one row, mostly useful for inspection and tests
    pub fn dense_row(&self, row: usize) -> Vec<f64> {
        self.columns
            .iter()
            .map(|col| {
                col.iter()
                    .find(|(r, _)| *r == row)
                    .map(|(_, v)| *v)
                    .unwrap_or(0.0)
            })
            .collect()
    }

    /// Matrix restricted to `rows`, renumbered in the given order
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let mut position = vec![None; self.n_rows()];
        for (new_row, &old_row) in rows.iter().enumerate() {
            position[old_row] = Some(new_row);
        }

        let columns = self
            .columns
            .iter()
            .map(|col| {
                let mut entries: Vec<(usize, f64)> = col
                    .iter()
                    .filter_map(|&(row, value)| position[row].map(|new_row| (new_row, value)))
                    .collect();
                entries.sort_by_key(|&(row, _)| row);
                entries
            })
            .collect();

        Self {
            teams: self.teams.clone(),
            columns,
            targets: rows.iter().map(|&r| self.targets[r]).collect(),
        }
    }

    /// Matrix with column `j` removed
    pub(crate) fn without_column(&self, j: usize) -> Self {
        let mut reduced = self.clone();
        reduced.teams.remove(j);
        reduced.columns.remove(j);
        reduced
    }
}
