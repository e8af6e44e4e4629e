//! Sample-size qualification and strikeout-rate derivation.

use crate::pipeline::score::round_to;
use crate::stats::models::{QualifiedPlayer, StatRecord};

/// Keep records with at least `min_sample` opportunities and attach their
/// strikeout rate as a percentage rounded to `decimals` places.
///
/// Zero-sample records are always dropped, whatever `min_sample` is.
/// Input order is preserved and duplicate names pass through untouched.
pub fn filter(records: &[StatRecord], min_sample: u32, decimals: u32) -> Vec<QualifiedPlayer> {
    records
        .iter()
        .filter(|r| r.sample_size > 0 && r.sample_size >= min_sample)
        .map(|r| QualifiedPlayer {
            record: r.clone(),
            strikeout_rate_pct: strikeout_rate_pct(r.strikeouts, r.sample_size, decimals),
        })
        .collect()
}

/// `100 * strikeouts / sample_size`, rounded. Caller guarantees `sample_size > 0`.
fn strikeout_rate_pct(strikeouts: u32, sample_size: u32, decimals: u32) -> f64 {
    round_to(100.0 * f64::from(strikeouts) / f64::from(sample_size), decimals)
}
