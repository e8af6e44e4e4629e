//! JSON-file provider for offline runs and tests.
//!
//! The file holds `{"batters": [...], "pitchers": [...], "starters": [...]}`.
//! It is re-read on every call so edits show up without a restart. The
//! target date is ignored: the fixture is one day's slate.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::data::{ProviderError, StatsProvider};
use crate::stats::models::{Fetched, ProbableStarter, StatRecord};

pub struct FixtureProvider {
    path: PathBuf,
}

impl FixtureProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Fetched<T>, ProviderError> {
        let path = self.path.display().to_string();
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| ProviderError::Io {
                path: path.clone(),
                source,
            })?;

        let document: Value = serde_json::from_str(&contents).map_err(|e| ProviderError::Decode {
            url: path.clone(),
            message: e.to_string(),
        })?;

        let rows = match document.get(key) {
            Some(Value::Array(rows)) => rows.as_slice(),
            Some(_) => {
                return Err(ProviderError::Decode {
                    url: path,
                    message: format!("'{key}' is not an array"),
                })
            }
            None => &[][..],
        };

        Ok(decode_rows(rows, key))
    }
}

/// Decode each row independently; a bad row is counted, not fatal.
fn decode_rows<T: DeserializeOwned>(rows: &[Value], key: &str) -> Fetched<T> {
    let mut fetched = Fetched::empty();
    for (index, row) in rows.iter().enumerate() {
        match serde_json::from_value::<T>(row.clone()) {
            Ok(record) => fetched.records.push(record),
            Err(e) => {
                debug!(key, index, error = %e, "Skipping malformed fixture row");
                fetched.skipped += 1;
            }
        }
    }
    fetched
}

#[async_trait]
impl StatsProvider for FixtureProvider {
    async fn probable_starters(&self, _date: NaiveDate) -> Result<Fetched<ProbableStarter>, ProviderError> {
        self.load("starters").await
    }

    async fn batter_stats(&self, _date: NaiveDate) -> Result<Fetched<StatRecord>, ProviderError> {
        self.load("batters").await
    }

    async fn pitcher_stats(&self, _date: NaiveDate) -> Result<Fetched<StatRecord>, ProviderError> {
        self.load("pitchers").await
    }

    fn name(&self) -> &str {
        "fixture"
    }

    fn description(&self) -> String {
        format!("Fixture file ({})", self.path.display())
    }
}
