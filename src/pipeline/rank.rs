//! Ranking and summary statistics over scored matchups.

use std::collections::BTreeMap;

use chrono::Local;

use crate::pipeline::score::{round_to, SCORE_DECIMALS};
use crate::stats::models::{Matchup, RankedResult, Summary};

/// Sort matchups by whiff score, highest first, and summarize them.
///
/// The sort is stable: equal scores keep their input order. An empty input
/// yields an empty result with a zeroed summary.
pub fn aggregate(matchups: Vec<Matchup>) -> RankedResult {
    let summary = summarize(&matchups);

    let mut ranked = matchups;
    ranked.sort_by(|a, b| b.whiff_score.total_cmp(&a.whiff_score));

    RankedResult {
        matchups: ranked,
        summary,
        generated_at: Local::now(),
    }
}

/// Count, min/max/average score and per-tier counts.
pub fn summarize(matchups: &[Matchup]) -> Summary {
    if matchups.is_empty() {
        return Summary::empty();
    }

    let count = matchups.len();
    let scores = matchups.iter().map(|m| m.whiff_score);
    let total: f64 = scores.clone().sum();
    let min = scores.clone().fold(f64::INFINITY, f64::min);
    let max = scores.fold(f64::NEG_INFINITY, f64::max);

    let mut tier_counts = BTreeMap::new();
    for matchup in matchups {
        *tier_counts.entry(matchup.tier).or_insert(0) += 1;
    }

    Summary {
        count,
        min,
        max,
        average: round_to(total / count as f64, SCORE_DECIMALS),
        tier_counts,
    }
}
