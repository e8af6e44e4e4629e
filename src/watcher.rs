use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::data::{self, StatsProvider};
use crate::pipeline::envelope::{self, DataSourceMeta, ResponseEnvelope};
use crate::pipeline::{Pipeline, PipelineConfig, PipelineError};

/// Ties a stats provider to the pipeline and produces response envelopes.
pub struct WhiffWatcher {
    provider: Arc<dyn StatsProvider>,
    pipeline: Pipeline,
    config: AppConfig,
}

impl WhiffWatcher {
    pub fn new(config: AppConfig, provider: Arc<dyn StatsProvider>) -> Self {
        let pipeline = Pipeline::new(PipelineConfig::from_app_config(&config));

        info!(
            provider = provider.name(),
            season = config.season.year,
            min_batter_sample = config.qualification.min_batter_sample,
            min_pitcher_sample = config.qualification.min_pitcher_sample,
            "Whiff watcher initialized"
        );

        Self {
            provider,
            pipeline,
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Requested date, else the configured date, else today (local time).
    pub fn target_date(&self, requested: Option<NaiveDate>) -> NaiveDate {
        requested
            .or(self.config.schedule.date)
            .unwrap_or_else(|| Local::now().date_naive())
    }

    /// Run one full generation for `date`. Failures become error envelopes.
    pub async fn generate(&self, date: Option<NaiveDate>) -> ResponseEnvelope {
        let started = Instant::now();
        let date = self.target_date(date);

        let collected = data::collect(self.provider.as_ref(), date).await;

        if collected.all_unavailable() {
            let err = PipelineError::ProviderUnavailable {
                source_name: self.provider.name().to_string(),
                message: format!("all record sets failed for {date}"),
            };
            warn!(error = %err, "Generation failed");
            return envelope::from_pipeline_error(&err);
        }

        // A schedule that loaded but lists no starters is an off-day, not an outage.
        let off_day = collected.input.starters.is_empty()
            && !collected.unavailable.iter().any(|set| set == "schedule");

        let meta = DataSourceMeta {
            data_source: self.provider.description(),
            season: self.config.season.year,
            date,
            min_batter_sample: self.config.qualification.min_batter_sample,
            min_pitcher_sample: self.config.qualification.min_pitcher_sample,
            batter_sample_basis: self
                .config
                .qualification
                .batter_sample_basis
                .as_str()
                .to_string(),
            skipped_records: collected.skipped,
            unavailable_sources: collected.unavailable,
        };

        let result = if off_day {
            info!(%date, "No probable starters scheduled");
            Ok(self.pipeline.off_day(&collected.input))
        } else {
            self.pipeline.run(&collected.input)
        };

        match result {
            Ok(output) => {
                info!(
                    %date,
                    matchups = output.ranked.summary.count,
                    highest = output.ranked.summary.max,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Whiff ratings generated"
                );
                envelope::build_success(output, meta)
            }
            Err(e) => {
                warn!(%date, error = %e, error_type = e.kind(), "Generation failed");
                envelope::from_pipeline_error(&e)
            }
        }
    }
}
