//! Rank-deficiency resolution
//!
//! Every design row sums to zero, so adding a constant to all ratings leaves
//! predictions unchanged. For unpenalized fits one team's column is dropped
//! (its coefficient is pinned at 0) and reinstated afterwards; centering in
//! the post-processor then erases the choice.
//!
//! A schedule split into groups that never meet has one such free constant
//! per group. Least squares cannot tell the groups apart, so each group is
//! pinned to mean zero before the usual centering.

use crate::rating::design::DesignMatrix;

/// Conventional reference column: the last team in sorted order
pub fn default_reference(design: &DesignMatrix) -> Option<usize> {
    design.n_columns().checked_sub(1)
}

/// Design with the reference team's column removed
pub fn drop_reference(design: &DesignMatrix, reference: usize) -> DesignMatrix {
    design.without_column(reference)
}

/// Coefficients over the full universe, with 0 at the reference index
pub fn reinstate_reference(coefficients: &[f64], reference: usize) -> Vec<f64> {
    let mut full = Vec::with_capacity(coefficients.len() + 1);
    full.extend_from_slice(&coefficients[..reference]);
    full.push(0.0);
    full.extend_from_slice(&coefficients[reference..]);
    full
}

/// Teams linked by at least one game, as sorted column indices.
///
/// The flag is set when a game in the group has only one labeled team, which
/// ties the group's level to the intercept.
pub fn connected_groups(design: &DesignMatrix) -> Vec<(Vec<usize>, bool)> {
    let mut row_columns: Vec<Vec<usize>> = vec![Vec::new(); design.n_rows()];
    for (j, column) in design.columns().iter().enumerate() {
        for &(row, _) in column {
            row_columns[row].push(j);
        }
    }

    let mut parent: Vec<usize> = (0..design.n_columns()).collect();
    let mut anchored = vec![false; design.n_columns()];
    for columns in &row_columns {
        match columns.as_slice() {
            [single] => anchored[*single] = true,
            [first, rest @ ..] => {
                for other in rest {
                    let (a, b) = (find(&mut parent, *first), find(&mut parent, *other));
                    if a != b {
                        parent[b.max(a)] = a.min(b);
                    }
                }
            }
            [] => {}
        }
    }

    let mut groups: Vec<(Vec<usize>, bool)> = Vec::new();
    let mut slot = vec![None; design.n_columns()];
    for j in 0..design.n_columns() {
        let root = find(&mut parent, j);
        let index = *slot[root].get_or_insert_with(|| {
            groups.push((Vec::new(), false));
            groups.len() - 1
        });
        groups[index].0.push(j);
        groups[index].1 |= anchored[j];
    }
    groups
}

fn find(parent: &mut [usize], mut node: usize) -> usize {
    while parent[node] != node {
        parent[node] = parent[parent[node]];
        node = parent[node];
    }
    node
}

/// Shift every free-floating group of teams to mean zero.
///
/// Groups anchored by a one-sided game keep their level.
pub fn center_groups(design: &DesignMatrix, coefficients: &[f64]) -> Vec<f64> {
    let mut centered = coefficients.to_vec();
    for (members, anchored) in connected_groups(design) {
        if anchored {
            continue;
        }
        let offset = members.iter().map(|&j| coefficients[j]).sum::<f64>() / members.len() as f64;
        for j in members {
            centered[j] -= offset;
        }
    }
    centered
}
