//! MLB StatsAPI adapter.
//!
//! Reads the day's schedule (with probable pitchers hydrated), active
//! rosters, season stat lines and the strikeout leaderboard from
//! statsapi.mlb.com, and normalizes them into `StatRecord`s and
//! `ProbableStarter`s. Every request is rate limited and retried with
//! exponential backoff on transient failures.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::config::{AppConfig, ProviderConfig, RateLimitConfig, SampleBasis};
use crate::data::{ProviderError, StatsProvider};
use crate::stats::models::{Fetched, ProbableStarter, StatRecord};

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// StatsAPI caps `personIds` lists; stay well under it.
const PEOPLE_BATCH: usize = 50;

const PITCHER_POSITIONS: &[&str] = &["P", "SP", "RP", "TWP"];

/// How long one schedule response serves all three record sets.
const SCHEDULE_TTL: Duration = Duration::from_secs(60);

struct CachedSchedule {
    date: NaiveDate,
    fetched_at: Instant,
    games: Arc<Vec<ScheduleGame>>,
}

pub struct StatsApiProvider {
    http: reqwest::Client,
    base_url: String,
    season: i32,
    basis: SampleBasis,
    settings: ProviderConfig,
    retry: RateLimitConfig,
    limiter: Arc<Limiter>,
    schedule_cache: Mutex<Option<CachedSchedule>>,
}

impl StatsApiProvider {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.provider.user_agent.as_str())
            .timeout(Duration::from_secs(config.provider.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: config.provider.base_url.trim_end_matches('/').to_string(),
            season: config.season.year,
            basis: config.qualification.batter_sample_basis,
            settings: config.provider.clone(),
            retry: config.rate_limit.clone(),
            limiter: create_rate_limiter(&config.rate_limit),
            schedule_cache: Mutex::new(None),
        })
    }

    // === Schedule ===

    /// The day's games, shared by every record set fetched for `date`.
    ///
    /// The lock is held across the request so concurrent callers wait for
    /// one fetch. Failures are not cached.
    async fn schedule(&self, date: NaiveDate) -> Result<Arc<Vec<ScheduleGame>>, ProviderError> {
        let mut cache = self.schedule_cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.date == date && cached.fetched_at.elapsed() < SCHEDULE_TTL {
                return Ok(Arc::clone(&cached.games));
            }
        }

        let games = Arc::new(self.fetch_schedule(date).await?);
        *cache = Some(CachedSchedule {
            date,
            fetched_at: Instant::now(),
            games: Arc::clone(&games),
        });
        Ok(games)
    }

    #[instrument(skip(self))]
    async fn fetch_schedule(&self, date: NaiveDate) -> Result<Vec<ScheduleGame>, ProviderError> {
        let response: ScheduleResponse = self
            .get_json(
                "/schedule",
                &[
                    ("sportId", "1".to_string()),
                    ("date", date.format("%Y-%m-%d").to_string()),
                    ("hydrate", "probablePitcher,team".to_string()),
                ],
            )
            .await?;

        Ok(response
            .dates
            .into_iter()
            .flat_map(|d| d.games)
            .collect())
    }

    // === Players ===

    async fn roster_hitters(&self, team_id: u64) -> Result<Vec<PersonRef>, ProviderError> {
        let response: RosterResponse = self
            .get_json(&format!("/teams/{team_id}/roster/Active"), &[])
            .await?;

        Ok(response
            .roster
            .into_iter()
            .filter(|entry| !entry.is_pitcher())
            .map(|entry| entry.person)
            .take(self.settings.batters_per_team)
            .collect())
    }

    /// Season stat objects for `ids`, in batches. Returns person JSON values.
    async fn season_stats(&self, ids: &[u64], group: &str) -> Result<Vec<Value>, ProviderError> {
        let mut people = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(PEOPLE_BATCH) {
            let id_list = chunk
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            let response: PeopleResponse = self
                .get_json(
                    "/people",
                    &[
                        ("personIds", id_list),
                        (
                            "hydrate",
                            format!("stats(group=[{group}],type=[season],season={})", self.season),
                        ),
                    ],
                )
                .await?;
            people.extend(response.people);
        }

        Ok(people)
    }

    /// Top up a thin batter pool from the season strikeout leaderboard.
    async fn leader_batters(
        &self,
        known: &HashSet<u64>,
        team_codes: &HashMap<u64, String>,
        room: usize,
    ) -> Result<Fetched<StatRecord>, ProviderError> {
        let response: Value = self
            .get_json(
                "/stats/leaders",
                &[
                    ("leaderCategories", "strikeOuts".to_string()),
                    ("season", self.season.to_string()),
                    ("statGroup", "hitting".to_string()),
                    ("limit", self.settings.leaders_limit.to_string()),
                ],
            )
            .await?;

        let leaders = response
            .pointer("/leagueLeaders/0/leaders")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut teams = HashMap::new();
        for leader in &leaders {
            let Some(person_id) = leader.pointer("/person/id").and_then(Value::as_u64) else {
                continue;
            };
            if known.contains(&person_id) {
                continue;
            }
            let team = leader
                .pointer("/team/abbreviation")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| {
                    leader
                        .pointer("/team/id")
                        .and_then(Value::as_u64)
                        .map(|id| team_code(team_codes, id))
                });
            if let Some(team) = team {
                teams.insert(person_id, team);
            }
        }

        let ids: Vec<u64> = leaders
            .iter()
            .filter_map(|l| l.pointer("/person/id").and_then(Value::as_u64))
            .filter(|id| teams.contains_key(id))
            .collect();
        let people = self.season_stats(&ids, "hitting").await?;

        let mut fetched = parse_lines(&people, &teams, self.batter_sample_key());
        fetched
            .records
            .retain(|r| r.sample_size >= self.settings.leaders_min_sample);
        fetched.records.truncate(room);
        Ok(fetched)
    }

    fn batter_sample_key(&self) -> &'static str {
        match self.basis {
            SampleBasis::AtBats => "atBats",
            SampleBasis::PlateAppearances => "plateAppearances",
        }
    }

    // === HTTP ===

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);

        self.with_retry(|| {
            let url = url.clone();
            async move {
                self.rate_limit().await;

                let response = self
                    .http
                    .get(&url)
                    .query(query)
                    .send()
                    .await
                    .map_err(|source| ProviderError::Http {
                        url: url.clone(),
                        source,
                    })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(ProviderError::Status {
                        url,
                        status: status.as_u16(),
                    });
                }

                response
                    .json::<T>()
                    .await
                    .map_err(|e| ProviderError::Decode {
                        url,
                        message: e.to_string(),
                    })
            }
        })
        .await
    }

    async fn rate_limit(&self) {
        self.limiter.until_ready().await;
    }

    async fn with_retry<F, Fut, T>(&self, operation: F) -> Result<T, ProviderError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0u32;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempt += 1;

                    if !e.is_retryable() || attempt > self.retry.max_retries {
                        return Err(e);
                    }

                    let backoff_ms = std::cmp::min(
                        self.retry
                            .backoff_base_ms
                            .saturating_mul(2u64.saturating_pow(attempt - 1)),
                        self.retry.backoff_max_ms,
                    );

                    warn!(
                        attempt,
                        backoff_ms,
                        error = %e,
                        "Retrying after transient failure"
                    );

                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }
}

#[async_trait]
impl StatsProvider for StatsApiProvider {
    async fn probable_starters(&self, date: NaiveDate) -> Result<Fetched<ProbableStarter>, ProviderError> {
        let games = self.schedule(date).await?;
        let starters = games.iter().flat_map(starters_for_game).collect();
        Ok(Fetched::new(starters, 0))
    }

    async fn batter_stats(&self, date: NaiveDate) -> Result<Fetched<StatRecord>, ProviderError> {
        let games = self.schedule(date).await?;
        let team_codes = team_codes(games.as_slice());

        let mut team_ids: Vec<u64> = team_codes.keys().copied().collect();
        team_ids.sort_unstable();
        team_ids.truncate(self.settings.max_teams);

        let mut teams_by_player = HashMap::new();
        let mut ids = Vec::new();
        for team_id in team_ids {
            match self.roster_hitters(team_id).await {
                Ok(hitters) => {
                    for person in hitters {
                        teams_by_player.insert(person.id, team_code(&team_codes, team_id));
                        ids.push(person.id);
                    }
                }
                Err(e) => {
                    warn!(team_id, error = %e, "Failed to fetch roster");
                }
            }
        }

        let people = self.season_stats(&ids, "hitting").await?;
        let mut fetched = parse_lines(&people, &teams_by_player, self.batter_sample_key());

        if fetched.records.len() < self.settings.min_batter_pool {
            let known: HashSet<u64> = ids.iter().copied().collect();
            let room = self.settings.min_batter_pool * 2 - fetched.records.len();
            match self.leader_batters(&known, &team_codes, room).await {
                Ok(extra) => {
                    debug!(added = extra.records.len(), "Topped up batters from leaderboard");
                    fetched.records.extend(extra.records);
                    fetched.skipped += extra.skipped;
                }
                Err(e) => {
                    warn!(error = %e, "Leaderboard fallback failed");
                }
            }
        }

        Ok(fetched)
    }

    async fn pitcher_stats(&self, date: NaiveDate) -> Result<Fetched<StatRecord>, ProviderError> {
        let games = self.schedule(date).await?;

        let mut teams_by_player = HashMap::new();
        let mut ids = Vec::new();
        for game in games.iter() {
            for (side, _) in game.sides() {
                if let Some(pitcher) = side.named_probable() {
                    if teams_by_player
                        .insert(pitcher.id, side.team.code())
                        .is_none()
                    {
                        ids.push(pitcher.id);
                    }
                }
            }
        }

        let people = self.season_stats(&ids, "pitching").await?;
        Ok(parse_lines(&people, &teams_by_player, "battersFaced"))
    }

    fn name(&self) -> &str {
        "statsapi"
    }

    fn description(&self) -> String {
        format!("MLB StatsAPI ({}), {} season", self.base_url, self.season)
    }
}

// === Helper Functions ===

fn create_rate_limiter(config: &RateLimitConfig) -> Arc<Limiter> {
    let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(config.burst_size).unwrap_or(rps);

    let quota = Quota::per_second(rps).allow_burst(burst);
    Arc::new(RateLimiter::direct(quota))
}

fn team_codes(games: &[ScheduleGame]) -> HashMap<u64, String> {
    games
        .iter()
        .flat_map(|g| g.sides())
        .map(|(side, _)| (side.team.id, side.team.code()))
        .collect()
}

fn team_code(codes: &HashMap<u64, String>, team_id: u64) -> String {
    codes
        .get(&team_id)
        .cloned()
        .unwrap_or_else(|| team_id.to_string())
}

fn starters_for_game(game: &ScheduleGame) -> Vec<ProbableStarter> {
    let home_code = game.teams.home.team.code();
    let away_code = game.teams.away.team.code();

    game.sides()
        .into_iter()
        .filter_map(|(side, is_home)| {
            let pitcher = side.named_probable()?;
            let opponent = if is_home { &away_code } else { &home_code };
            Some(ProbableStarter {
                team: side.team.code(),
                pitcher_name: pitcher.full_name.clone().unwrap_or_default(),
                opponent_team: opponent.clone(),
                is_home,
                game_time: game.game_date.clone(),
            })
        })
        .collect()
}

/// Turn hydrated person objects into stat records.
///
/// People with no season split are ignored. A split whose counts are
/// missing or non-numeric is counted as skipped.
fn parse_lines(people: &[Value], teams: &HashMap<u64, String>, sample_key: &str) -> Fetched<StatRecord> {
    let mut fetched = Fetched::empty();

    for person in people {
        let Some(id) = person.get("id").and_then(Value::as_u64) else {
            fetched.skipped += 1;
            continue;
        };
        let counts = match season_counts(person, sample_key) {
            SeasonLine::Missing => continue,
            SeasonLine::Malformed => None,
            SeasonLine::Counts { sample, strikeouts } => Some((sample, strikeouts)),
        };
        let name = person.get("fullName").and_then(Value::as_str);

        match (name, counts) {
            (Some(name), Some((sample, strikeouts))) => {
                let team = teams
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| "UNK".to_string());
                fetched
                    .records
                    .push(StatRecord::new(name, team, sample, strikeouts).with_id(id));
            }
            _ => {
                debug!(player_id = id, sample_key, "Malformed stat line");
                fetched.skipped += 1;
            }
        }
    }

    fetched
}

enum SeasonLine {
    Missing,
    Malformed,
    Counts { sample: u32, strikeouts: u32 },
}

/// Season totals from a hydrated person.
///
/// A player who changed teams has one split per team plus a combined split
/// with no `team`. The combined split is used when present, otherwise the
/// per-team splits are summed.
fn season_counts(person: &Value, sample_key: &str) -> SeasonLine {
    let splits = match person.pointer("/stats/0/splits").and_then(Value::as_array) {
        Some(splits) if !splits.is_empty() => splits,
        _ => return SeasonLine::Missing,
    };

    let combined = splits
        .iter()
        .find(|split| splits.len() > 1 && split.get("team").is_none());
    let chosen: Vec<&Value> = match combined {
        Some(total) => vec![total],
        None => splits.iter().collect(),
    };

    let mut sample = 0u32;
    let mut strikeouts = 0u32;
    for split in chosen {
        let Some(stat) = split.get("stat") else {
            return SeasonLine::Malformed;
        };
        match (count_field(stat, sample_key), count_field(stat, "strikeOuts")) {
            (Some(s), Some(k)) => {
                sample = sample.saturating_add(s);
                strikeouts = strikeouts.saturating_add(k);
            }
            _ => return SeasonLine::Malformed,
        }
    }

    SeasonLine::Counts { sample, strikeouts }
}

/// A counting stat as a number or numeric string.
fn count_field(stat: &Value, key: &str) -> Option<u32> {
    match stat.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// === StatsAPI Response Types ===

#[derive(Debug, Deserialize)]
struct ScheduleResponse {
    #[serde(default)]
    dates: Vec<ScheduleDate>,
}

#[derive(Debug, Deserialize)]
struct ScheduleDate {
    #[serde(default)]
    games: Vec<ScheduleGame>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleGame {
    #[serde(default)]
    game_date: Option<String>,
    teams: GameTeams,
}

impl ScheduleGame {
    /// (side, is_home), away first.
    fn sides(&self) -> [(&GameSide, bool); 2] {
        [(&self.teams.away, false), (&self.teams.home, true)]
    }
}

#[derive(Debug, Deserialize)]
struct GameTeams {
    away: GameSide,
    home: GameSide,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameSide {
    team: TeamRef,
    #[serde(default)]
    probable_pitcher: Option<PersonRef>,
}

impl GameSide {
    /// The probable pitcher, unless unannounced.
    fn named_probable(&self) -> Option<&PersonRef> {
        self.probable_pitcher.as_ref().filter(|p| {
            p.full_name
                .as_deref()
                .map(|name| !name.is_empty() && name != "TBD")
                .unwrap_or(false)
        })
    }
}

#[derive(Debug, Deserialize)]
struct TeamRef {
    id: u64,
    #[serde(default)]
    abbreviation: Option<String>,
}

impl TeamRef {
    fn code(&self) -> String {
        self.abbreviation
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonRef {
    id: u64,
    #[serde(default)]
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RosterResponse {
    #[serde(default)]
    roster: Vec<RosterEntry>,
}

#[derive(Debug, Deserialize)]
struct RosterEntry {
    person: PersonRef,
    #[serde(default)]
    position: Option<Position>,
}

impl RosterEntry {
    fn is_pitcher(&self) -> bool {
        self.position.as_ref().is_some_and(|p| {
            p.kind.as_deref() == Some("Pitcher")
                || p.abbreviation
                    .as_deref()
                    .is_some_and(|a| PITCHER_POSITIONS.contains(&a))
        })
    }
}

#[derive(Debug, Deserialize)]
struct Position {
    #[serde(default)]
    abbreviation: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PeopleResponse {
    #[serde(default)]
    people: Vec<Value>,
}
