use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub season: SeasonConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    pub qualification: QualificationConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
    pub provider: ProviderConfig,
    pub rate_limit: RateLimitConfig,
    pub server: ServerConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonConfig {
    pub year: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleConfig {
    /// Fixed target date (YYYY-MM-DD). Today in local time when unset.
    pub date: Option<NaiveDate>,
}

/// What a batter's `sample_size` counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleBasis {
    AtBats,
    PlateAppearances,
}

impl SampleBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AtBats => "at_bats",
            Self::PlateAppearances => "plate_appearances",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QualificationConfig {
    pub min_batter_sample: u32,
    pub min_pitcher_sample: u32,
    pub batter_decimals: u32,
    pub pitcher_decimals: u32,
    pub batter_sample_basis: SampleBasis,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolutionConfig {
    pub max_batters_per_team: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Statsapi,
    Fixture,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_url: String,
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub max_teams: usize,
    pub batters_per_team: usize,
    pub min_batter_pool: usize,
    pub leaders_limit: usize,
    pub leaders_min_sample: u32,
    pub fixture_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_size: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub static_dir: String,
    pub snapshot_file: String,
    pub generate_on_startup: bool,
}

impl ServerConfig {
    pub fn snapshot_path(&self) -> PathBuf {
        Path::new(&self.static_dir).join(&self.snapshot_file)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: String,
    #[serde(default)]
    pub json: bool,
}

impl AppConfig {
    /// Load configuration from `config/default.toml` (or `$WHIFF_CONFIG`),
    /// then apply environment overrides.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = std::env::var("WHIFF_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(season) = std::env::var("WHIFF_SEASON") {
            self.season.year = season
                .parse()
                .with_context(|| format!("WHIFF_SEASON is not a year: {season}"))?;
        }
        if let Ok(port) = std::env::var("WHIFF_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("WHIFF_PORT is not a port: {port}"))?;
        }
        if let Ok(date) = std::env::var("WHIFF_DATE") {
            self.schedule.date = Some(parse_date(&date)?);
        }
        if let Ok(kind) = std::env::var("WHIFF_PROVIDER") {
            self.provider.kind = match kind.to_lowercase().as_str() {
                "statsapi" => ProviderKind::Statsapi,
                "fixture" => ProviderKind::Fixture,
                other => bail!("WHIFF_PROVIDER must be 'statsapi' or 'fixture', got '{other}'"),
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.qualification.batter_decimals > 6 || self.qualification.pitcher_decimals > 6 {
            bail!("qualification decimals must be between 0 and 6");
        }
        if self.server.port == 0 {
            bail!("server.port must be non-zero");
        }
        if self.provider.kind == ProviderKind::Fixture && self.provider.fixture_path.is_empty() {
            bail!("provider.fixture_path is required when provider.kind = \"fixture\"");
        }
        Ok(())
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{value}', expected YYYY-MM-DD"))
}
