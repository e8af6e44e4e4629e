//! Batter to probable-starter resolution.
//!
//! Joins each qualified batter to the starter scheduled to pitch against
//! the batter's team, then to that starter's qualified pitching line.
//! Team codes and pitcher names are the only join keys the providers share.

use std::collections::HashMap;

use crate::stats::models::{Pairing, ProbableStarter, QualifiedPlayer};

/// Pair every batter with the qualified starter the batter's team faces.
///
/// Batters whose team has no scheduled starter, or whose starter did not
/// qualify, are left out. Output follows batter input order.
pub fn resolve(
    batters: &[QualifiedPlayer],
    pitchers: &[QualifiedPlayer],
    starters: &[ProbableStarter],
) -> Vec<Pairing> {
    let starter_against = starters_by_opponent(starters);
    let pitcher_by_name = first_by_name(pitchers);

    batters
        .iter()
        .filter_map(|batter| {
            let starter = starter_against.get(batter.team())?;
            let pitcher = pitcher_by_name.get(starter.pitcher_name.as_str())?;
            Some(Pairing {
                batter: batter.clone(),
                pitcher: (*pitcher).clone(),
                starter: (*starter).clone(),
            })
        })
        .collect()
}

/// Keep at most `max_per_team` pairings per batting team, in order.
/// Zero means no cap.
pub fn limit_per_team(pairings: Vec<Pairing>, max_per_team: usize) -> Vec<Pairing> {
    if max_per_team == 0 {
        return pairings;
    }

    let mut taken: HashMap<String, usize> = HashMap::new();
    pairings
        .into_iter()
        .filter(|p| {
            let count = taken.entry(p.batter.team().to_string()).or_insert(0);
            *count += 1;
            *count <= max_per_team
        })
        .collect()
}

/// Batting team code -> the starter pitching against it. First seen wins,
/// so a doubleheader keeps its first listed game.
fn starters_by_opponent(starters: &[ProbableStarter]) -> HashMap<&str, &ProbableStarter> {
    let mut lookup = HashMap::new();
    for starter in starters {
        lookup.entry(starter.opponent_team.as_str()).or_insert(starter);
    }
    lookup
}

fn first_by_name(pitchers: &[QualifiedPlayer]) -> HashMap<&str, &QualifiedPlayer> {
    let mut lookup = HashMap::new();
    for pitcher in pitchers {
        lookup.entry(pitcher.name()).or_insert(pitcher);
    }
    lookup
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::models::StatRecord;

    fn player(name: &str, team: &str, k_pct: f64) -> QualifiedPlayer {
        QualifiedPlayer {
            record: StatRecord::new(name, team, 300, 60),
            strikeout_rate_pct: k_pct,
        }
    }

    #[test]
    fn test_pairs_batter_with_opposing_starter() {
        let batters = vec![player("Judge", "NYY", 22.0)];
        let pitchers = vec![player("X", "BOS", 28.0)];
        let starters = vec![ProbableStarter::new("BOS", "X", "NYY")];

        let pairs = resolve(&batters, &pitchers, &starters);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].batter.name(), "Judge");
        assert_eq!(pairs[0].pitcher.name(), "X");
        assert_eq!(pairs[0].starter.team, "BOS");
    }

    #[test]
    fn test_batter_without_game_is_excluded() {
        let batters = vec![player("Idle", "SEA", 30.0), player("Judge", "NYY", 22.0)];
        let pitchers = vec![player("X", "BOS", 28.0)];
        let starters = vec![ProbableStarter::new("BOS", "X", "NYY")];

        let pairs = resolve(&batters, &pitchers, &starters);
        assert_eq!(pairs.len(), 1);
        assert!(pairs.iter().all(|p| p.batter.team() != "SEA"));
    }

    #[test]
    fn test_unqualified_starter_excludes_batter() {
        let batters = vec![player("Judge", "NYY", 22.0)];
        let starters = vec![ProbableStarter::new("BOS", "Rookie", "NYY")];

        assert!(resolve(&batters, &[], &starters).is_empty());
    }

    #[test]
    fn test_first_starter_per_team_wins() {
        let batters = vec![player("Judge", "NYY", 22.0)];
        let pitchers = vec![player("Game1", "BOS", 20.0), player("Game2", "BOS", 35.0)];
        let starters = vec![
            ProbableStarter::new("BOS", "Game1", "NYY"),
            ProbableStarter::new("BOS", "Game2", "NYY"),
        ];

        let pairs = resolve(&batters, &pitchers, &starters);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].pitcher.name(), "Game1");
    }

    #[test]
    fn test_first_pitcher_by_name_wins() {
        let batters = vec![player("Judge", "NYY", 22.0)];
        let pitchers = vec![player("Will Smith", "BOS", 24.0), player("Will Smith", "LAD", 31.0)];
        let starters = vec![ProbableStarter::new("BOS", "Will Smith", "NYY")];

        let pairs = resolve(&batters, &pitchers, &starters);
        assert_eq!(pairs[0].pitcher.strikeout_rate_pct, 24.0);
    }

    #[test]
    fn test_duplicate_batters_pair_independently() {
        let batters = vec![player("Twin", "NYY", 20.0), player("Twin", "NYY", 26.0)];
        let pitchers = vec![player("X", "BOS", 28.0)];
        let starters = vec![ProbableStarter::new("BOS", "X", "NYY")];

        let pairs = resolve(&batters, &pitchers, &starters);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].batter.strikeout_rate_pct, 20.0);
        assert_eq!(pairs[1].batter.strikeout_rate_pct, 26.0);
    }

    #[test]
    fn test_both_sides_of_a_game_resolve() {
        let batters = vec![player("Devers", "BOS", 25.0), player("Judge", "NYY", 22.0)];
        let pitchers = vec![player("Cole", "NYY", 27.0), player("Bello", "BOS", 21.0)];
        let starters = vec![
            ProbableStarter::new("NYY", "Cole", "BOS"),
            ProbableStarter::new("BOS", "Bello", "NYY"),
        ];

        let pairs = resolve(&batters, &pitchers, &starters);
        assert_eq!(pairs[0].pitcher.name(), "Cole");
        assert_eq!(pairs[1].pitcher.name(), "Bello");
    }

    #[test]
    fn test_limit_per_team_keeps_first_n() {
        let batters: Vec<QualifiedPlayer> = (0..5)
            .map(|i| player(&format!("B{i}"), "NYY", 20.0 + i as f64))
            .collect();
        let pitchers = vec![player("X", "BOS", 28.0)];
        let starters = vec![ProbableStarter::new("BOS", "X", "NYY")];

        let pairs = limit_per_team(resolve(&batters, &pitchers, &starters), 3);
        let names: Vec<&str> = pairs.iter().map(|p| p.batter.name()).collect();
        assert_eq!(names, vec!["B0", "B1", "B2"]);

        let all = limit_per_team(resolve(&batters, &pitchers, &starters), 0);
        assert_eq!(all.len(), 5);
    }
}
