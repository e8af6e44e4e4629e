//! Whiff score calculation.
//!
//! The whiff score is the plain sum of the batter's and the opposing
//! starter's strikeout rates. No weighting, park or handedness adjustment.

use crate::stats::models::{Matchup, Pairing, QualifiedPlayer, Tier};

/// Inclusive lower bounds, most severe first.
const TIER_THRESHOLDS: [(f64, Tier); 4] = [
    (60.0, Tier::Extreme),
    (50.0, Tier::High),
    (40.0, Tier::Moderate),
    (30.0, Tier::Low),
];

/// Decimal places kept on the composite score.
pub const SCORE_DECIMALS: u32 = 2;

/// Round to `decimals` places, exact halves to the even neighbour.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    let floor = scaled.floor();

    let rounded = if scaled - floor == 0.5 {
        if floor % 2.0 == 0.0 {
            floor
        } else {
            floor + 1.0
        }
    } else {
        scaled.round()
    };
    rounded / factor
}

/// Map a score to its tier. Total over f64: NaN falls through to `Minimal`.
pub fn tier_for(score: f64) -> Tier {
    TIER_THRESHOLDS
        .iter()
        .find(|(floor, _)| score >= *floor)
        .map(|(_, tier)| *tier)
        .unwrap_or(Tier::Minimal)
}

/// Score a batter against a pitcher.
pub fn score(batter: &QualifiedPlayer, pitcher: &QualifiedPlayer) -> (f64, Tier) {
    let whiff_score = round_to(
        batter.strikeout_rate_pct + pitcher.strikeout_rate_pct,
        SCORE_DECIMALS,
    );
    (whiff_score, tier_for(whiff_score))
}

/// Turn a resolved pairing into an immutable scored matchup.
pub fn score_pairing(pairing: Pairing) -> Matchup {
    let (whiff_score, tier) = score(&pairing.batter, &pairing.pitcher);
    let matchup_id = matchup_id(&pairing.pitcher, &pairing.batter);
    let game_info = pairing.starter.game_label();

    Matchup {
        matchup_id,
        game_info,
        batter: pairing.batter,
        pitcher: pairing.pitcher,
        whiff_score,
        tier,
    }
}

/// `pitcherId_batterId` when both ids are known, names otherwise.
fn matchup_id(pitcher: &QualifiedPlayer, batter: &QualifiedPlayer) -> String {
    match (pitcher.record.player_id, batter.record.player_id) {
        (Some(p), Some(b)) => format!("{p}_{b}"),
        _ => format!(
            "{}_{}",
            slug(pitcher.name()),
            slug(batter.name())
        ),
    }
}

fn slug(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}
