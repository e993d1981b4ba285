use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub player_id: i64,
    pub player_name: String,
    pub standard_points: u64,
    pub extra_points: u64,
    pub total_points: u64,
}

/// Build the leaderboard from per-prediction points.
///
/// `players` lists everyone taking part, so players without any bet still
/// get a zero row. Rows are ordered by total descending, then by name.
pub fn compute_standings(
    players: &[(i64, String)],
    bet_points: &[(i64, u32)],
    extra_points: &[(i64, u32)],
) -> Vec<Standing> {
    let mut standard: HashMap<i64, u64> = HashMap::new();
    for (player_id, points) in bet_points {
        *standard.entry(*player_id).or_default() += u64::from(*points);
    }
    let mut extra: HashMap<i64, u64> = HashMap::new();
    for (player_id, points) in extra_points {
        *extra.entry(*player_id).or_default() += u64::from(*points);
    }

    let mut rows: Vec<Standing> = players
        .iter()
        .map(|(id, name)| {
            let standard_points = standard.get(id).copied().unwrap_or(0);
            let extra_points = extra.get(id).copied().unwrap_or(0);
            Standing {
                player_id: *id,
                player_name: name.clone(),
                standard_points,
                extra_points,
                total_points: standard_points + extra_points,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then_with(|| a.player_name.cmp(&b.player_name))
    });
    rows
}
