//! External response shapes for a pipeline run.
//!
//! Every run ends in exactly one envelope: a success envelope carrying the
//! ranked matchups, or an error envelope with zeroed counts. Both serialize
//! as plain JSON objects and are returned with HTTP 200.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDate, SecondsFormat};
use serde::Serialize;

use crate::pipeline::{PipelineError, PipelineOutput};
use crate::stats::models::{Matchup, QualifiedPlayer, Tier};

pub const APP_NAME: &str = "Whiff Watcher";

const CALCULATION_METHOD: &str = "Batter strikeout rate + Pitcher strikeout rate";
const PITCHER_FORMULA: &str = "strikeouts / batters_faced * 100";

/// Describes where the data came from and the thresholds applied to it.
/// Free-text documentation for consumers; nothing reads it back.
#[derive(Debug, Clone)]
pub struct DataSourceMeta {
    pub data_source: String,
    pub season: i32,
    pub date: NaiveDate,
    pub min_batter_sample: u32,
    pub min_pitcher_sample: u32,
    /// Name of the batter sample basis, e.g. "at_bats".
    pub batter_sample_basis: String,
    pub skipped_records: usize,
    pub unavailable_sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResponseEnvelope {
    Success(Box<SuccessEnvelope>),
    Error(ErrorEnvelope),
}

impl ResponseEnvelope {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn total_ratings(&self) -> usize {
        match self {
            Self::Success(s) => s.data_summary.total_whiff_ratings,
            Self::Error(_) => 0,
        }
    }

    pub fn generated_at(&self) -> &str {
        match self {
            Self::Success(s) => &s.generated_at,
            Self::Error(e) => &e.generated_at,
        }
    }

    pub fn matchups(&self) -> &[Matchup] {
        match self {
            Self::Success(s) => &s.whiff_watch_ratings,
            Self::Error(_) => &[],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessEnvelope {
    pub app_name: &'static str,
    pub generated_at: String,
    pub date: NaiveDate,
    pub season: i32,
    pub data_summary: DataSummary,
    pub whiff_watch_ratings: Vec<Matchup>,
    pub active_batters: Vec<QualifiedPlayer>,
    pub probable_pitchers: Vec<QualifiedPlayer>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataSummary {
    pub total_whiff_ratings: usize,
    pub active_batters_count: usize,
    pub probable_pitchers_count: usize,
    pub min_batter_sample: u32,
    pub min_pitcher_sample: u32,
    pub average_whiff_rating: f64,
    pub highest_whiff_rating: f64,
    pub lowest_whiff_rating: f64,
    pub rating_level_counts: BTreeMap<Tier, usize>,
    pub skipped_records: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub data_source: String,
    pub calculation_method: &'static str,
    pub strikeout_rate_formula: RateFormula,
    pub last_updated: String,
    pub version: &'static str,
    pub data_season: i32,
    pub note: String,
    pub unavailable_sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RateFormula {
    pub batter: String,
    pub pitcher: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub app_name: &'static str,
    pub generated_at: String,
    pub error: bool,
    pub error_message: String,
    pub error_type: String,
    pub whiff_watch_ratings: Vec<Matchup>,
    pub active_batters: Vec<QualifiedPlayer>,
    pub probable_pitchers: Vec<QualifiedPlayer>,
    pub data_summary: ErrorSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorSummary {
    pub total_whiff_ratings: usize,
    pub active_batters_count: usize,
    pub probable_pitchers_count: usize,
    pub error_occurred: bool,
}

/// Wrap a completed pipeline run.
pub fn build_success(output: PipelineOutput, meta: DataSourceMeta) -> ResponseEnvelope {
    let PipelineOutput {
        ranked,
        batters,
        pitchers,
    } = output;
    let generated_at = iso_timestamp(&ranked.generated_at);
    let summary = ranked.summary;

    let note = if ranked.matchups.is_empty() {
        format!("No scheduled matchups resolved for {}", meta.date)
    } else {
        format!(
            "{} matchups across {} probable starters",
            summary.count,
            pitchers.len()
        )
    };

    ResponseEnvelope::Success(Box::new(SuccessEnvelope {
        app_name: APP_NAME,
        generated_at: generated_at.clone(),
        date: meta.date,
        season: meta.season,
        data_summary: DataSummary {
            total_whiff_ratings: summary.count,
            active_batters_count: batters.len(),
            probable_pitchers_count: pitchers.len(),
            min_batter_sample: meta.min_batter_sample,
            min_pitcher_sample: meta.min_pitcher_sample,
            average_whiff_rating: summary.average,
            highest_whiff_rating: summary.max,
            lowest_whiff_rating: summary.min,
            rating_level_counts: summary.tier_counts,
            skipped_records: meta.skipped_records,
        },
        whiff_watch_ratings: ranked.matchups,
        active_batters: batters,
        probable_pitchers: pitchers,
        metadata: Metadata {
            data_source: meta.data_source,
            calculation_method: CALCULATION_METHOD,
            strikeout_rate_formula: RateFormula {
                batter: format!("strikeouts / {} * 100", meta.batter_sample_basis),
                pitcher: PITCHER_FORMULA,
            },
            last_updated: generated_at,
            version: env!("CARGO_PKG_VERSION"),
            data_season: meta.season,
            note,
            unavailable_sources: meta.unavailable_sources,
        },
    }))
}

/// Error envelope with zeroed counts.
pub fn build_error(error_type: &str, message: impl Into<String>) -> ResponseEnvelope {
    ResponseEnvelope::Error(ErrorEnvelope {
        app_name: APP_NAME,
        generated_at: iso_timestamp(&Local::now()),
        error: true,
        error_message: message.into(),
        error_type: error_type.to_string(),
        whiff_watch_ratings: Vec::new(),
        active_batters: Vec::new(),
        probable_pitchers: Vec::new(),
        data_summary: ErrorSummary {
            total_whiff_ratings: 0,
            active_batters_count: 0,
            probable_pitchers_count: 0,
            error_occurred: true,
        },
    })
}

pub fn from_pipeline_error(err: &PipelineError) -> ResponseEnvelope {
    build_error(err.kind(), err.to_string())
}

pub fn iso_timestamp(at: &DateTime<Local>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, false)
}
