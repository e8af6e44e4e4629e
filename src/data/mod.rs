pub mod fixture;
pub mod statsapi;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::config::{AppConfig, ProviderKind};
use crate::pipeline::PipelineInput;
use crate::stats::models::{Fetched, ProbableStarter, StatRecord};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl ProviderError {
    /// Client errors will not succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Decode { .. } | Self::Io { .. } => false,
        }
    }
}

/// Adapter over a remote (or local) stats source.
///
/// Each method returns the decoded records plus a count of rows that failed
/// to decode. Transport-level failures are returned as `Err`.
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Probable starters for games on `date`.
    async fn probable_starters(&self, date: NaiveDate) -> Result<Fetched<ProbableStarter>, ProviderError>;

    /// Season batting lines for hitters relevant to `date`.
    async fn batter_stats(&self, date: NaiveDate) -> Result<Fetched<StatRecord>, ProviderError>;

    /// Season pitching lines (sample = batters faced) for pitchers relevant to `date`.
    async fn pitcher_stats(&self, date: NaiveDate) -> Result<Fetched<StatRecord>, ProviderError>;

    /// Short machine name used in logs.
    fn name(&self) -> &str;

    /// Human-readable description placed in response metadata.
    fn description(&self) -> String;
}

/// Pipeline input gathered from a provider, with the audit trail of what
/// went wrong while gathering it.
#[derive(Debug, Clone, Default)]
pub struct CollectedData {
    pub input: PipelineInput,
    pub skipped: usize,
    pub unavailable: Vec<String>,
}

impl CollectedData {
    /// True when every record set failed to load.
    pub fn all_unavailable(&self) -> bool {
        self.unavailable.len() == 3
    }
}

/// Fetch the three record sets concurrently.
///
/// A failed fetch is logged and its record set treated as empty; it is
/// never propagated to the caller.
pub async fn collect(provider: &dyn StatsProvider, date: NaiveDate) -> CollectedData {
    let (starters, batters, pitchers) = tokio::join!(
        provider.probable_starters(date),
        provider.batter_stats(date),
        provider.pitcher_stats(date),
    );

    let mut skipped = 0;
    let mut unavailable = Vec::new();
    let starters = absorb(provider.name(), "schedule", starters, &mut skipped, &mut unavailable);
    let batters = absorb(provider.name(), "batters", batters, &mut skipped, &mut unavailable);
    let pitchers = absorb(provider.name(), "pitchers", pitchers, &mut skipped, &mut unavailable);

    let collected = CollectedData {
        input: PipelineInput {
            batters,
            pitchers,
            starters,
        },
        skipped,
        unavailable,
    };

    tracing::info!(
        source = provider.name(),
        %date,
        starters = collected.input.starters.len(),
        batters = collected.input.batters.len(),
        pitchers = collected.input.pitchers.len(),
        skipped = collected.skipped,
        unavailable = collected.unavailable.len(),
        "Provider data collected"
    );

    collected
}

fn absorb<T>(
    source: &str,
    record_set: &str,
    result: Result<Fetched<T>, ProviderError>,
    skipped: &mut usize,
    unavailable: &mut Vec<String>,
) -> Vec<T> {
    match result {
        Ok(fetched) => {
            if fetched.skipped > 0 {
                tracing::warn!(
                    source,
                    record_set,
                    skipped = fetched.skipped,
                    "Skipped malformed records"
                );
            }
            *skipped += fetched.skipped;
            fetched.records
        }
        Err(e) => {
            tracing::warn!(source, record_set, error = %e, "Data source fetch failed");
            unavailable.push(record_set.to_string());
            Vec::new()
        }
    }
}

/// Build the provider selected by `provider.kind`.
pub fn build_provider(config: &AppConfig) -> Result<Arc<dyn StatsProvider>> {
    let provider: Arc<dyn StatsProvider> = match config.provider.kind {
        ProviderKind::Statsapi => Arc::new(statsapi::StatsApiProvider::new(config)?),
        ProviderKind::Fixture => Arc::new(fixture::FixtureProvider::new(&config.provider.fixture_path)),
    };
    Ok(provider)
}
