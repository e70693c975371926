//! Standings Aggregator
//!
//! Stats rows exist once per (team, level) and are created when a team is
//! assigned to a level. The referee path adjusts them incrementally with
//! [`apply_match`]; administrative edits rebuild them with [`recompute_level`].
//! Both go through the same scoring rules.

use super::{
    ranking::{self, MatchResult, Qualifier, StandingRow},
    scoring::{match_deltas, SetTally, StatsDelta},
};
use crate::{
    db::models::{Match, MatchSet},
    error::{not_found, Result},
};
use sqlx::SqliteConnection;
use std::collections::BTreeMap;

/// Creates the stats row for a team in a level; no-op if it already exists.
pub async fn ensure_stats_row(conn: &mut SqliteConnection, team_id: i64, level_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO team_level_stats (team_id, level_id) VALUES (?, ?)")
        .bind(team_id)
        .bind(level_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Adds a delta to an existing stats row. Teams without a row are skipped.
pub async fn apply_delta(
    conn: &mut SqliteConnection,
    team_id: i64,
    level_id: i64,
    delta: &StatsDelta,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE team_level_stats SET
            played = played + ?,
            won = won + ?,
            lost = lost + ?,
            sets_won = sets_won + ?,
            sets_lost = sets_lost + ?,
            points_for = points_for + ?,
            points_against = points_against + ?,
            table_points = table_points + ?
        WHERE team_id = ? AND level_id = ?
        "#,
    )
    .bind(delta.played)
    .bind(delta.won)
    .bind(delta.lost)
    .bind(delta.sets_won)
    .bind(delta.sets_lost)
    .bind(delta.points_for)
    .bind(delta.points_against)
    .bind(delta.table_points)
    .bind(team_id)
    .bind(level_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Applies (or with `revert`, subtracts) the contribution of a decided match
/// to both teams. Returns false when the tally has no winner.
pub async fn apply_match(
    conn: &mut SqliteConnection,
    m: &Match,
    tally: &SetTally,
    walkover: bool,
    revert: bool,
) -> Result<bool> {
    let Some((delta_a, delta_b)) = match_deltas(tally, walkover) else {
        return Ok(false);
    };
    let (delta_a, delta_b) = if revert {
        (-delta_a, -delta_b)
    } else {
        (delta_a, delta_b)
    };

    apply_delta(conn, m.team_a_id, m.level_id, &delta_a).await?;
    apply_delta(conn, m.team_b_id, m.level_id, &delta_b).await?;
    Ok(true)
}

pub async fn load_sets(conn: &mut SqliteConnection, match_id: i64) -> Result<Vec<MatchSet>> {
    let sets = sqlx::query_as::<_, MatchSet>(
        "SELECT * FROM match_sets WHERE match_id = ? ORDER BY set_number",
    )
    .bind(match_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(sets)
}

/// Rebuilds every stats row of a level from its finalized matches.
///
/// Running it twice without match changes in between leaves the rows identical.
pub async fn recompute_level(conn: &mut SqliteConnection, level_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE team_level_stats SET
            played = 0, won = 0, lost = 0,
            sets_won = 0, sets_lost = 0,
            points_for = 0, points_against = 0,
            table_points = 0
        WHERE level_id = ?
        "#,
    )
    .bind(level_id)
    .execute(&mut *conn)
    .await?;

    let finalized = sqlx::query_as::<_, Match>(
        "SELECT * FROM matches WHERE level_id = ? AND status = 'finalized' ORDER BY id",
    )
    .bind(level_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut totals: BTreeMap<i64, StatsDelta> = BTreeMap::new();
    for m in &finalized {
        let sets = load_sets(conn, m.id).await?;
        let tally = SetTally::from_sets(&sets);
        if let Some((delta_a, delta_b)) = match_deltas(&tally, m.is_walkover) {
            *totals.entry(m.team_a_id).or_default() += delta_a;
            *totals.entry(m.team_b_id).or_default() += delta_b;
        }
    }

    for (team_id, delta) in &totals {
        apply_delta(conn, *team_id, level_id, delta).await?;
    }

    tracing::debug!(
        "Recomputed standings for level {} from {} finalized matches",
        level_id,
        finalized.len()
    );
    Ok(())
}

async fn level_rows(conn: &mut SqliteConnection, level_id: i64) -> Result<Vec<StandingRow>> {
    let rows = sqlx::query_as::<_, StandingRow>(
        r#"
        SELECT s.team_id, t.name AS team_name, s.level_id,
               s.played, s.won, s.lost, s.sets_won, s.sets_lost,
               s.points_for, s.points_against, s.table_points
        FROM team_level_stats s
        JOIN teams t ON t.id = s.team_id
        WHERE s.level_id = ?
        ORDER BY s.team_id
        "#,
    )
    .bind(level_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

async fn level_results(conn: &mut SqliteConnection, level_id: i64) -> Result<Vec<MatchResult>> {
    let results = sqlx::query_as::<_, MatchResult>(
        r#"
        SELECT level_id, team_a_id, team_b_id, sets_a, sets_b
        FROM matches
        WHERE level_id = ? AND status = 'finalized'
        ORDER BY id
        "#,
    )
    .bind(level_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(results)
}

async fn ensure_level(conn: &mut SqliteConnection, level_id: i64) -> Result<()> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM levels WHERE id = ?")
        .bind(level_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(not_found("Level"))?;
    Ok(())
}

/// League table of a level, best first.
pub async fn standings(conn: &mut SqliteConnection, level_id: i64) -> Result<Vec<StandingRow>> {
    ensure_level(conn, level_id).await?;
    let rows = level_rows(conn, level_id).await?;
    let results = level_results(conn, level_id).await?;
    Ok(ranking::rank(rows, &results))
}

/// Qualifiers from every group level below `parent_level_id` that holds standings.
pub async fn group_winners(
    conn: &mut SqliteConnection,
    parent_level_id: i64,
) -> Result<Vec<Qualifier>> {
    ensure_level(conn, parent_level_id).await?;

    let group_ids = sqlx::query_scalar::<_, i64>(
        r#"
        WITH RECURSIVE descendants(id) AS (
            SELECT id FROM levels WHERE parent_level_id = ?
            UNION ALL
            SELECT l.id FROM levels l JOIN descendants d ON l.parent_level_id = d.id
        )
        SELECT DISTINCT d.id
        FROM descendants d
        JOIN team_level_stats s ON s.level_id = d.id
        ORDER BY d.id
        "#,
    )
    .bind(parent_level_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut groups = Vec::with_capacity(group_ids.len());
    let mut results = Vec::new();
    for level_id in group_ids {
        groups.push((level_id, level_rows(conn, level_id).await?));
        results.extend(level_results(conn, level_id).await?);
    }

    Ok(ranking::group_winners(groups, &results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::testing::{finalize_with_sets, seed_level, stats_of};

    #[tokio::test]
    async fn test_recompute_is_idempotent() {
        let pool = crate::create_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let seed = seed_level(&mut conn, 3).await;
        let [a, b, c] = [seed.teams[0], seed.teams[1], seed.teams[2]];

        finalize_with_sets(&mut conn, &seed, a, b, &[(25, 10), (25, 12), (25, 20)]).await;
        finalize_with_sets(&mut conn, &seed, b, c, &[(25, 23), (20, 25), (25, 22), (18, 25), (15, 13)]).await;

        recompute_level(&mut conn, seed.level_id).await.unwrap();
        let first = stats_of(&mut conn, seed.level_id).await;
        recompute_level(&mut conn, seed.level_id).await.unwrap();
        let second = stats_of(&mut conn, seed.level_id).await;
        assert_eq!(first, second);

        let row_a = first.iter().find(|s| s.team_id == a).unwrap();
        assert_eq!((row_a.played, row_a.won, row_a.table_points), (1, 1, 4));
        let row_b = first.iter().find(|s| s.team_id == b).unwrap();
        // lost 0-3 (1 point), won 3-2 (3 points)
        assert_eq!((row_b.played, row_b.won, row_b.lost), (2, 1, 1));
        assert_eq!(row_b.table_points, 4);
        let row_c = first.iter().find(|s| s.team_id == c).unwrap();
        assert_eq!(row_c.table_points, 2);
        assert_eq!(row_c.sets_won, 2);
    }

    #[tokio::test]
    async fn test_recompute_discards_drifted_rows() {
        let pool = crate::create_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let seed = seed_level(&mut conn, 2).await;

        let bogus = StatsDelta {
            played: 7,
            table_points: 30,
            ..StatsDelta::default()
        };
        apply_delta(&mut conn, seed.teams[0], seed.level_id, &bogus).await.unwrap();

        recompute_level(&mut conn, seed.level_id).await.unwrap();
        let rows = stats_of(&mut conn, seed.level_id).await;
        assert!(rows.iter().all(|s| s.played == 0 && s.table_points == 0));
    }

    #[tokio::test]
    async fn test_standings_ranked_and_unknown_level() {
        let pool = crate::create_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let seed = seed_level(&mut conn, 3).await;
        let [a, b, c] = [seed.teams[0], seed.teams[1], seed.teams[2]];

        finalize_with_sets(&mut conn, &seed, c, a, &[(25, 10), (25, 12), (25, 20)]).await;
        finalize_with_sets(&mut conn, &seed, b, a, &[(25, 10), (25, 12), (12, 25), (25, 20)]).await;
        recompute_level(&mut conn, seed.level_id).await.unwrap();

        let table = standings(&mut conn, seed.level_id).await.unwrap();
        let order: Vec<i64> = table.iter().map(|r| r.team_id).collect();
        // b and c tie on points and sets won; c has the better set difference
        assert_eq!(order, vec![c, b, a]);

        let err = standings(&mut conn, 9999).await.unwrap_err();
        assert!(matches!(err, crate::error::AppError::NotFound(_)));
    }
}
