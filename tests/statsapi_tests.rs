//! StatsAPI adapter against a mock HTTP server.

use chrono::NaiveDate;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use whiff_watcher::config::AppConfig;
use whiff_watcher::data::statsapi::StatsApiProvider;
use whiff_watcher::data::{self, ProviderError, StatsProvider};
use whiff_watcher::watcher::WhiffWatcher;

const HITTING: &str = "stats(group=[hitting],type=[season],season=2025)";
const PITCHING: &str = "stats(group=[pitching],type=[season],season=2025)";

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 4).unwrap()
}

fn config(base_url: &str) -> AppConfig {
    let mut config = AppConfig::from_toml(include_str!("../config/default.toml")).unwrap();
    config.provider.base_url = base_url.to_string();
    config.provider.min_batter_pool = 0;
    config.rate_limit.backoff_base_ms = 1;
    config.rate_limit.backoff_max_ms = 2;
    config.rate_limit.max_retries = 2;
    config
}

fn schedule_body() -> serde_json::Value {
    json!({
        "dates": [{
            "date": "2025-07-04",
            "games": [{
                "gamePk": 777001,
                "gameDate": "2025-07-04T23:05:00Z",
                "teams": {
                    "away": {
                        "team": {"id": 111, "name": "Boston Red Sox", "abbreviation": "BOS"},
                        "probablePitcher": {"id": 678394, "fullName": "Brayan Bello"}
                    },
                    "home": {
                        "team": {"id": 147, "name": "New York Yankees", "abbreviation": "NYY"},
                        "probablePitcher": {"id": 543037, "fullName": "Gerrit Cole"}
                    }
                }
            }]
        }]
    })
}

fn person(id: u64, name: &str, stat: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "fullName": name,
        "stats": [{
            "type": {"displayName": "season"},
            "splits": [{"season": "2025", "stat": stat}]
        }]
    })
}

fn roster_entry(id: u64, name: &str, position: &str, kind: &str) -> serde_json::Value {
    json!({
        "person": {"id": id, "fullName": name},
        "position": {"abbreviation": position, "type": kind}
    })
}

async fn mount_schedule(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/schedule"))
        .and(query_param("date", "2025-07-04"))
        .and(query_param("hydrate", "probablePitcher,team"))
        .respond_with(ResponseTemplate::new(200).set_body_json(schedule_body()))
        .mount(server)
        .await;
}

async fn mount_rosters(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/teams/111/roster/Active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "roster": [
                roster_entry(646240, "Rafael Devers", "3B", "Infielder"),
                roster_entry(678394, "Brayan Bello", "P", "Pitcher"),
                roster_entry(680776, "Jarren Duran", "CF", "Outfielder"),
                roster_entry(596115, "Trevor Story", "SS", "Infielder"),
            ]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/teams/147/roster/Active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "roster": [
                roster_entry(543037, "Gerrit Cole", "P", "Pitcher"),
                roster_entry(592450, "Aaron Judge", "RF", "Outfielder"),
            ]
        })))
        .mount(server)
        .await;
}

// ──────────────────────────────────────────
// Schedule
// ──────────────────────────────────────────

#[tokio::test]
async fn probable_starters_from_schedule() {
    let server = MockServer::start().await;
    mount_schedule(&server).await;

    let provider = StatsApiProvider::new(&config(&server.uri())).unwrap();
    let starters = assert_ok!(provider.probable_starters(date()).await);

    assert_eq!(starters.skipped, 0);
    assert_eq!(starters.records.len(), 2);
    assert_eq!(starters.records[0].team, "BOS");
    assert_eq!(starters.records[0].pitcher_name, "Brayan Bello");
    assert_eq!(starters.records[0].opponent_team, "NYY");
    assert_eq!(starters.records[1].team, "NYY");
    assert!(starters.records[1].is_home);
}

#[tokio::test]
async fn off_day_has_no_starters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/schedule"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"dates": []})))
        .mount(&server)
        .await;

    let provider = StatsApiProvider::new(&config(&server.uri())).unwrap();
    let starters = provider.probable_starters(date()).await.unwrap();
    assert!(starters.records.is_empty());
}

// ──────────────────────────────────────────
// Batters and pitchers
// ──────────────────────────────────────────

#[tokio::test]
async fn batter_stats_from_rosters() {
    let server = MockServer::start().await;
    mount_schedule(&server).await;
    mount_rosters(&server).await;

    Mock::given(method("GET"))
        .and(path("/people"))
        .and(query_param("personIds", "646240,680776,596115,592450"))
        .and(query_param("hydrate", HITTING))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "people": [
                person(646240, "Rafael Devers", json!({"atBats": 420, "strikeOuts": 105})),
                person(680776, "Jarren Duran", json!({"atBats": "400", "strikeOuts": "40"})),
                person(596115, "Trevor Story", json!({"atBats": "-.--", "strikeOuts": 90})),
                person(592450, "Aaron Judge", json!({"atBats": 400, "strikeOuts": 120})),
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = StatsApiProvider::new(&config(&server.uri())).unwrap();
    let batters = provider.batter_stats(date()).await.unwrap();

    assert_eq!(batters.skipped, 1);
    let lines: Vec<(&str, &str, u32, u32)> = batters
        .records
        .iter()
        .map(|r| (r.player_name.as_str(), r.team.as_str(), r.sample_size, r.strikeouts))
        .collect();
    assert_eq!(
        lines,
        vec![
            ("Rafael Devers", "BOS", 420, 105),
            ("Jarren Duran", "BOS", 400, 40),
            ("Aaron Judge", "NYY", 400, 120),
        ]
    );
}

#[tokio::test]
async fn pitcher_stats_use_batters_faced() {
    let server = MockServer::start().await;
    mount_schedule(&server).await;

    Mock::given(method("GET"))
        .and(path("/people"))
        .and(query_param("personIds", "678394,543037"))
        .and(query_param("hydrate", PITCHING))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "people": [
                person(678394, "Brayan Bello", json!({"battersFaced": 300, "strikeOuts": 66, "inningsPitched": "70.1"})),
                person(543037, "Gerrit Cole", json!({"battersFaced": 250, "strikeOuts": 75})),
            ]
        })))
        .mount(&server)
        .await;

    let provider = StatsApiProvider::new(&config(&server.uri())).unwrap();
    let pitchers = provider.pitcher_stats(date()).await.unwrap();

    assert_eq!(pitchers.records.len(), 2);
    assert_eq!(pitchers.records[0].player_id, Some(678394));
    assert_eq!(pitchers.records[0].team, "BOS");
    assert_eq!(pitchers.records[0].sample_size, 300);
    assert_eq!(pitchers.records[1].team, "NYY");
    assert_eq!(pitchers.records[1].strikeouts, 75);
}

#[tokio::test]
async fn thin_pool_tops_up_from_leaders() {
    let server = MockServer::start().await;
    mount_schedule(&server).await;

    for team in [111, 147] {
        Mock::given(method("GET"))
            .and(path(format!("/teams/{team}/roster/Active")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"roster": []})))
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/stats/leaders"))
        .and(query_param("leaderCategories", "strikeOuts"))
        .and(query_param("statGroup", "hitting"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "leagueLeaders": [{
                "leaderCategory": "strikeOuts",
                "leaders": [
                    {"rank": 1, "value": "76", "person": {"id": 519317, "fullName": "Giancarlo Stanton"}, "team": {"id": 147}},
                    {"rank": 2, "value": "30", "person": {"id": 700002, "fullName": "Call Up"}, "team": {"id": 111}},
                ]
            }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/people"))
        .and(query_param("personIds", "519317,700002"))
        .and(query_param("hydrate", HITTING))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "people": [
                person(519317, "Giancarlo Stanton", json!({"atBats": 200, "strikeOuts": 76})),
                person(700002, "Call Up", json!({"atBats": 50, "strikeOuts": 30})),
            ]
        })))
        .mount(&server)
        .await;

    let mut config = config(&server.uri());
    config.provider.min_batter_pool = 5;
    let provider = StatsApiProvider::new(&config).unwrap();
    let batters = provider.batter_stats(date()).await.unwrap();

    assert_eq!(batters.records.len(), 1);
    assert_eq!(batters.records[0].player_name, "Giancarlo Stanton");
    assert_eq!(batters.records[0].team, "NYY");
}

#[tokio::test]
async fn one_schedule_request_serves_every_record_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/schedule"))
        .respond_with(ResponseTemplate::new(200).set_body_json(schedule_body()))
        .expect(1)
        .mount(&server)
        .await;
    mount_rosters(&server).await;

    Mock::given(method("GET"))
        .and(path("/people"))
        .and(query_param("hydrate", HITTING))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "people": [person(592450, "Aaron Judge", json!({"atBats": 400, "strikeOuts": 120}))]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/people"))
        .and(query_param("hydrate", PITCHING))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "people": [person(678394, "Brayan Bello", json!({"battersFaced": 300, "strikeOuts": 66}))]
        })))
        .mount(&server)
        .await;

    let provider = StatsApiProvider::new(&config(&server.uri())).unwrap();
    let collected = data::collect(&provider, date()).await;

    assert!(collected.unavailable.is_empty());
    assert_eq!(collected.input.starters.len(), 2);
    assert_eq!(collected.input.batters.len(), 1);
    assert_eq!(collected.input.pitchers.len(), 1);
}

// ──────────────────────────────────────────
// Off-days
// ──────────────────────────────────────────

#[tokio::test]
async fn off_day_is_empty_success_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/schedule"))
        .and(query_param("date", "2025-12-25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"dates": []})))
        .mount(&server)
        .await;

    let config = config(&server.uri());
    let provider = StatsApiProvider::new(&config).unwrap();
    let watcher = WhiffWatcher::new(config, std::sync::Arc::new(provider));

    let envelope = watcher.generate(NaiveDate::from_ymd_opt(2025, 12, 25)).await;
    assert!(!envelope.is_error());
    assert_eq!(envelope.total_ratings(), 0);

    let json = serde_json::to_value(&envelope).unwrap();
    assert_eq!(json["date"], "2025-12-25");
    assert_eq!(json["data_summary"]["total_whiff_ratings"], 0);
    assert_eq!(json["data_summary"]["average_whiff_rating"], 0.0);
}

#[tokio::test]
async fn all_starters_unannounced_is_empty_success_envelope() {
    let server = MockServer::start().await;
    let body = schedule_body()
        .to_string()
        .replace("Brayan Bello", "TBD")
        .replace("Gerrit Cole", "TBD");
    Mock::given(method("GET"))
        .and(path("/schedule"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;
    mount_rosters(&server).await;
    Mock::given(method("GET"))
        .and(path("/people"))
        .and(query_param("hydrate", HITTING))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "people": [person(592450, "Aaron Judge", json!({"atBats": 400, "strikeOuts": 120}))]
        })))
        .mount(&server)
        .await;

    let config = config(&server.uri());
    let provider = StatsApiProvider::new(&config).unwrap();
    let watcher = WhiffWatcher::new(config, std::sync::Arc::new(provider));

    let envelope = watcher.generate(Some(date())).await;
    assert!(!envelope.is_error());
    assert_eq!(envelope.total_ratings(), 0);
}

// ──────────────────────────────────────────
// Retry and failure handling
// ──────────────────────────────────────────

#[tokio::test]
async fn transient_failure_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/schedule"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_schedule(&server).await;

    let provider = StatsApiProvider::new(&config(&server.uri())).unwrap();
    let starters = provider.probable_starters(date()).await.unwrap();
    assert_eq!(starters.records.len(), 2);
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/schedule"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let provider = StatsApiProvider::new(&config(&server.uri())).unwrap();
    let err = assert_err!(provider.probable_starters(date()).await);
    assert!(matches!(err, ProviderError::Status { status: 404, .. }));
}

#[tokio::test]
async fn garbage_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/schedule"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let provider = StatsApiProvider::new(&config(&server.uri())).unwrap();
    let err = provider.probable_starters(date()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Decode { .. }));
}

#[tokio::test]
async fn outage_marks_every_record_set_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let provider = StatsApiProvider::new(&config(&server.uri())).unwrap();
    let collected = data::collect(&provider, date()).await;

    assert!(collected.all_unavailable());
    assert!(collected.input.batters.is_empty());
    assert!(collected.input.pitchers.is_empty());
    assert!(collected.input.starters.is_empty());
}
