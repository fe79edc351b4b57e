//! Team name normalization
//!
//! Every other component keys teams by the value produced here.

use crate::types::TeamKey;

/// Canonicalize a free-text team label.
///
/// Lowercases, trims, drops apostrophes and turns each run of whitespace
/// into a single underscore. Returns `None` for absent or blank labels.
pub fn normalize_team_name(label: Option<&str>) -> Option<TeamKey> {
    let lowered = label?.to_lowercase();
    let cleaned: String = lowered.trim().chars().filter(|c| *c != '\'').collect();

    let key = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}
