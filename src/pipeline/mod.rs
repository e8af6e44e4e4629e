//! Matchup resolution and scoring pipeline.
//!
//! qualify (batters, pitchers) -> resolve -> score -> rank. Every stage is a
//! pure function over owned, already-fetched inputs; the envelope builder
//! shapes the result for the transport layer.

pub mod envelope;
pub mod qualify;
pub mod rank;
pub mod resolve;
pub mod score;

use thiserror::Error;
use tracing::debug;

use crate::config::AppConfig;
use crate::stats::models::{
    Matchup, ProbableStarter, QualifiedPlayer, RankedResult, Role, StatRecord,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("data provider '{source_name}' unavailable: {message}")]
    ProviderUnavailable {
        source_name: String,
        message: String,
    },

    #[error("no {role} records met the qualification threshold")]
    NoQualifyingRecords { role: Role },
}

impl PipelineError {
    /// Stable name reported as `error_type` in the error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable { .. } => "ProviderUnavailable",
            Self::NoQualifyingRecords { .. } => "NoQualifyingRecords",
        }
    }
}

/// Thresholds and precision the pipeline runs with. Fixed for the process.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub min_batter_sample: u32,
    pub min_pitcher_sample: u32,
    pub batter_decimals: u32,
    pub pitcher_decimals: u32,
    /// 0 keeps every resolved batter.
    pub max_batters_per_team: usize,
}

impl PipelineConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            min_batter_sample: config.qualification.min_batter_sample,
            min_pitcher_sample: config.qualification.min_pitcher_sample,
            batter_decimals: config.qualification.batter_decimals,
            pitcher_decimals: config.qualification.pitcher_decimals,
            max_batters_per_team: config.resolution.max_batters_per_team,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_batter_sample: 150,
            min_pitcher_sample: 20,
            batter_decimals: 2,
            pitcher_decimals: 2,
            max_batters_per_team: 0,
        }
    }
}

/// Materialized provider data for one target date.
#[derive(Debug, Clone, Default)]
pub struct PipelineInput {
    pub batters: Vec<StatRecord>,
    pub pitchers: Vec<StatRecord>,
    pub starters: Vec<ProbableStarter>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub ranked: RankedResult,
    pub batters: Vec<QualifiedPlayer>,
    pub pitchers: Vec<QualifiedPlayer>,
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage over `input`.
    ///
    /// Zero qualified batters or pitchers is an error: it points at an
    /// upstream outage. Zero resolved matchups (an off-day) is a valid,
    /// empty result.
    pub fn run(&self, input: &PipelineInput) -> Result<PipelineOutput, PipelineError> {
        let batters = qualify::filter(
            &input.batters,
            self.config.min_batter_sample,
            self.config.batter_decimals,
        );
        if batters.is_empty() {
            return Err(PipelineError::NoQualifyingRecords { role: Role::Batter });
        }

        let pitchers = qualify::filter(
            &input.pitchers,
            self.config.min_pitcher_sample,
            self.config.pitcher_decimals,
        );
        if pitchers.is_empty() {
            return Err(PipelineError::NoQualifyingRecords { role: Role::Pitcher });
        }

        let pairings = resolve::limit_per_team(
            resolve::resolve(&batters, &pitchers, &input.starters),
            self.config.max_batters_per_team,
        );

        debug!(
            batters_in = input.batters.len(),
            batters_qualified = batters.len(),
            pitchers_in = input.pitchers.len(),
            pitchers_qualified = pitchers.len(),
            starters = input.starters.len(),
            pairings = pairings.len(),
            "Pipeline stages complete"
        );

        let matchups: Vec<Matchup> = pairings.into_iter().map(score::score_pairing).collect();
        let ranked = rank::aggregate(matchups);

        Ok(PipelineOutput {
            ranked,
            batters,
            pitchers,
        })
    }

    /// Result for a date with no scheduled starters: qualified players are
    /// still reported, but there is nothing to pair or rank.
    pub fn off_day(&self, input: &PipelineInput) -> PipelineOutput {
        PipelineOutput {
            ranked: rank::aggregate(Vec::new()),
            batters: qualify::filter(
                &input.batters,
                self.config.min_batter_sample,
                self.config.batter_decimals,
            ),
            pitchers: qualify::filter(
                &input.pitchers,
                self.config.min_pitcher_sample,
                self.config.pitcher_decimals,
            ),
        }
    }
}
