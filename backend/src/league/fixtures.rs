//! Round-robin fixture generation

use super::schedule::{self, NewMatch};
use crate::{
    db::models::MatchStatus,
    error::{AppError, Result},
};
use rand::{seq::SliceRandom, Rng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use sqlx::SqliteConnection;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixtureReport {
    pub level_id: i64,
    /// Pending matches removed before generating
    pub replaced: u64,
    pub created: usize,
}

/// All C(n, 2) pairings of the shuffled teams, each with a fair coin deciding
/// which team plays as side A.
pub fn round_robin_pairings<R: Rng>(team_ids: &[i64], rng: &mut R) -> Vec<(i64, i64)> {
    let mut shuffled = team_ids.to_vec();
    shuffled.shuffle(rng);

    let mut pairings = Vec::with_capacity(shuffled.len() * shuffled.len().saturating_sub(1) / 2);
    for (i, &first) in shuffled.iter().enumerate() {
        for &second in &shuffled[i + 1..] {
            if rng.gen_bool(0.5) {
                pairings.push((first, second));
            } else {
                pairings.push((second, first));
            }
        }
    }
    pairings
}

/// Distinct ids in first-seen order
fn distinct(team_ids: &[i64]) -> Vec<i64> {
    let mut seen = Vec::with_capacity(team_ids.len());
    for &id in team_ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

/// Replaces the pending matches of a level with a fresh round robin.
///
/// Numbering continues after the level's existing matches and is then
/// re-derived so undated matches follow the dated ones in insertion order.
pub async fn generate_fixture(
    conn: &mut SqliteConnection,
    level_id: i64,
    team_ids: &[i64],
    rng: &mut ChaCha20Rng,
) -> Result<FixtureReport> {
    let teams = distinct(team_ids);
    if teams.len() < 2 {
        return Err(AppError::Validation(
            "A fixture needs at least two distinct teams".to_string(),
        ));
    }

    let level = schedule::fetch_level(conn, level_id).await?;
    for &team_id in &teams {
        schedule::ensure_team(conn, team_id).await?;
    }

    let pairings = round_robin_pairings(&teams, rng);

    let replaced = sqlx::query("DELETE FROM matches WHERE level_id = ? AND status = 'pending'")
        .bind(level_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    let mut number = schedule::next_match_number(conn, level_id).await?;
    for &(team_a_id, team_b_id) in &pairings {
        let new = NewMatch {
            tournament_id: level.tournament_id,
            level_id,
            team_a_id,
            team_b_id,
            ..NewMatch::default()
        };
        schedule::insert_match(conn, &new, MatchStatus::Pending, number).await?;
        number += 1;
    }

    schedule::renumber_matches(conn, level_id).await?;

    Ok(FixtureReport {
        level_id,
        replaced,
        created: pairings.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::testing::seed_level;
    use rand::SeedableRng;
    use std::collections::{HashMap, HashSet};

    #[test]
    fn test_pairings_cover_every_unordered_pair_once() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let teams = [10, 20, 30, 40, 50];
        let pairings = round_robin_pairings(&teams, &mut rng);
        assert_eq!(pairings.len(), 10);

        let unordered: HashSet<(i64, i64)> = pairings
            .iter()
            .map(|&(a, b)| (a.min(b), a.max(b)))
            .collect();
        assert_eq!(unordered.len(), 10);
        assert!(pairings.iter().all(|(a, b)| a != b));
    }

    #[test]
    fn test_pairings_are_reproducible_for_a_seed() {
        let teams = [1, 2, 3, 4, 5, 6];
        let first = round_robin_pairings(&teams, &mut ChaCha20Rng::seed_from_u64(42));
        let second = round_robin_pairings(&teams, &mut ChaCha20Rng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn test_distinct_keeps_first_occurrence() {
        assert_eq!(distinct(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_four_teams_give_six_pending_matches() {
        let pool = crate::create_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let seed = seed_level(&mut conn, 4).await;
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        let report = generate_fixture(&mut conn, seed.level_id, &seed.teams, &mut rng)
            .await
            .unwrap();
        assert_eq!(report.created, 6);
        assert_eq!(report.replaced, 0);

        let rows: Vec<(i64, i64, String, i64)> = sqlx::query_as(
            "SELECT team_a_id, team_b_id, status, match_number FROM matches WHERE level_id = ? ORDER BY match_number",
        )
        .bind(seed.level_id)
        .fetch_all(&mut *conn)
        .await
        .unwrap();
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|r| r.2 == "pending"));
        assert_eq!(rows.iter().map(|r| r.3).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);

        let mut appearances: HashMap<i64, usize> = HashMap::new();
        for (a, b, _, _) in &rows {
            *appearances.entry(*a).or_default() += 1;
            *appearances.entry(*b).or_default() += 1;
        }
        assert!(seed.teams.iter().all(|t| appearances[t] == 3));
    }

    #[tokio::test]
    async fn test_regeneration_replaces_only_pending_matches() {
        let pool = crate::create_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let seed = seed_level(&mut conn, 3).await;
        let mut rng = ChaCha20Rng::seed_from_u64(3);

        generate_fixture(&mut conn, seed.level_id, &seed.teams, &mut rng)
            .await
            .unwrap();
        sqlx::query(
            "UPDATE matches SET status = 'finalized', sets_a = 3 WHERE level_id = ? AND match_number = 1",
        )
        .bind(seed.level_id)
        .execute(&mut *conn)
        .await
        .unwrap();

        let report = generate_fixture(&mut conn, seed.level_id, &seed.teams, &mut rng)
            .await
            .unwrap();
        assert_eq!(report.replaced, 2);
        assert_eq!(report.created, 3);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM matches WHERE level_id = ?")
            .bind(seed.level_id)
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(total, 4);
    }

    #[tokio::test]
    async fn test_fixture_validation() {
        let pool = crate::create_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let seed = seed_level(&mut conn, 2).await;
        let mut rng = ChaCha20Rng::seed_from_u64(0);

        let err = generate_fixture(&mut conn, seed.level_id, &[seed.teams[0], seed.teams[0]], &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = generate_fixture(&mut conn, 777, &seed.teams, &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = generate_fixture(&mut conn, seed.level_id, &[seed.teams[0], 555], &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
