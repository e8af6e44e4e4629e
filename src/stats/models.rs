use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Which side of the plate a stat line describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Batter,
    Pitcher,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Batter => write!(f, "batter"),
            Self::Pitcher => write!(f, "pitcher"),
        }
    }
}

/// Raw per-player counting stats as produced by a provider adapter.
///
/// `sample_size` is at-bats (or plate appearances) for batters and
/// batters faced for pitchers. `strikeouts <= sample_size` is expected but
/// not enforced; provider data is passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<u64>,
    pub player_name: String,
    pub team: String,
    pub sample_size: u32,
    pub strikeouts: u32,
}

impl StatRecord {
    pub fn new(player_name: impl Into<String>, team: impl Into<String>, sample_size: u32, strikeouts: u32) -> Self {
        Self {
            player_id: None,
            player_name: player_name.into(),
            team: team.into(),
            sample_size,
            strikeouts,
        }
    }

    pub fn with_id(mut self, player_id: u64) -> Self {
        self.player_id = Some(player_id);
        self
    }
}

/// A stat record that met its role's sample threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualifiedPlayer {
    #[serde(flatten)]
    pub record: StatRecord,
    pub strikeout_rate_pct: f64,
}

impl QualifiedPlayer {
    pub fn name(&self) -> &str {
        &self.record.player_name
    }

    pub fn team(&self) -> &str {
        &self.record.team
    }
}

/// The pitcher scheduled to start for `team` against `opponent_team`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbableStarter {
    pub team: String,
    pub pitcher_name: String,
    pub opponent_team: String,
    #[serde(default)]
    pub is_home: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_time: Option<String>,
}

impl ProbableStarter {
    pub fn new(team: impl Into<String>, pitcher_name: impl Into<String>, opponent_team: impl Into<String>) -> Self {
        Self {
            team: team.into(),
            pitcher_name: pitcher_name.into(),
            opponent_team: opponent_team.into(),
            is_home: false,
            game_time: None,
        }
    }

    /// "AWAY @ HOME" label for the game this start belongs to.
    pub fn game_label(&self) -> String {
        if self.is_home {
            format!("{} @ {}", self.opponent_team, self.team)
        } else {
            format!("{} @ {}", self.team, self.opponent_team)
        }
    }
}

/// A batter joined to the probable starter the batter's team faces.
#[derive(Debug, Clone, PartialEq)]
pub struct Pairing {
    pub batter: QualifiedPlayer,
    pub pitcher: QualifiedPlayer,
    pub starter: ProbableStarter,
}

/// Severity bucket for a whiff score. Declaration order is most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Extreme,
    High,
    Moderate,
    Low,
    Minimal,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Extreme => write!(f, "EXTREME"),
            Self::High => write!(f, "HIGH"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::Low => write!(f, "LOW"),
            Self::Minimal => write!(f, "MINIMAL"),
        }
    }
}

/// A scored batter/pitcher pairing. Never mutated after scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matchup {
    pub matchup_id: String,
    pub game_info: String,
    pub batter: QualifiedPlayer,
    pub pitcher: QualifiedPlayer,
    pub whiff_score: f64,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub average: f64,
    /// Tiers with no matchups are omitted.
    pub tier_counts: BTreeMap<Tier, usize>,
}

impl Summary {
    pub fn empty() -> Self {
        Self {
            count: 0,
            min: 0.0,
            max: 0.0,
            average: 0.0,
            tier_counts: BTreeMap::new(),
        }
    }
}

/// Matchups ranked by whiff score, plus their summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub matchups: Vec<Matchup>,
    pub summary: Summary,
    pub generated_at: chrono::DateTime<chrono::Local>,
}

/// Output of a provider adapter: decoded records plus the number of rows
/// that failed to decode and were skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

impl<T> Fetched<T> {
    pub fn new(records: Vec<T>, skipped: usize) -> Self {
        Self { records, skipped }
    }

    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }
}

impl<T> Default for Fetched<T> {
    fn default() -> Self {
        Self::empty()
    }
}
