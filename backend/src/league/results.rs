//! Match Result Committer: administrative overwrites and walkovers

use super::{
    bracket::{self, Progression},
    schedule,
    scoring::{walkover_sets, SetTally, MAX_SETS, SETS_TO_WIN},
    sets::{upsert_set, SetScore},
    standings,
};
use crate::{
    db::models::{Match, MatchStatus, Side},
    error::{AppError, Result},
};
use serde::Serialize;
use sqlx::SqliteConnection;
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize)]
pub struct CommittedResult {
    #[serde(rename = "match")]
    pub committed: Match,
    pub progression: Progression,
}

/// Parses the absent-side designator of a walkover.
pub fn parse_side(value: &str) -> Result<Side> {
    value
        .trim()
        .to_lowercase()
        .parse::<Side>()
        .map_err(|_| AppError::Validation(format!("Absent side must be 'a' or 'b', got '{}'", value)))
}

/// Checks a complete result before anything is written.
///
/// Sets must be numbered 1..=n without gaps, and the last one must be the
/// set that gives a side its third win.
pub fn validate_full_result(sets: &[SetScore]) -> Result<SetTally> {
    if sets.is_empty() || sets.len() > MAX_SETS as usize {
        return Err(AppError::Validation(format!(
            "A result needs between 1 and {} sets, got {}",
            MAX_SETS,
            sets.len()
        )));
    }

    let mut numbers = HashSet::new();
    for set in sets {
        set.validate()?;
        if !numbers.insert(set.set_number) {
            return Err(AppError::Validation(format!(
                "Set {} appears more than once",
                set.set_number
            )));
        }
    }

    let mut ordered = sets.to_vec();
    ordered.sort_by_key(|s| s.set_number);

    let mut tally = SetTally::default();
    for (i, set) in ordered.iter().enumerate() {
        let expected = i as i64 + 1;
        if set.set_number != expected {
            return Err(AppError::Validation(format!(
                "Set numbers must run from 1 without gaps, missing set {}",
                expected
            )));
        }
        if tally.is_decided() {
            return Err(AppError::Validation(format!(
                "Set {} comes after the match was already decided",
                set.set_number
            )));
        }
        tally = SetTally::from_scores(ordered[..=i].iter().map(|s| (s.points_a, s.points_b)));
    }

    if !tally.is_decided() {
        return Err(AppError::Validation(format!(
            "A result needs a side with {} sets won, got {}-{}",
            SETS_TO_WIN, tally.sets_a, tally.sets_b
        )));
    }
    Ok(tally)
}

async fn clear_sets(conn: &mut SqliteConnection, match_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM match_sets WHERE match_id = ?")
        .bind(match_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Replaces every set of a match, finalizes it and rebuilds the level's
/// standings from scratch before running progression.
pub async fn commit_full_result(
    conn: &mut SqliteConnection,
    match_id: i64,
    sets: &[SetScore],
) -> Result<CommittedResult> {
    let tally = validate_full_result(sets)?;
    let m = schedule::fetch_match(conn, match_id).await?;

    clear_sets(conn, match_id).await?;
    for set in sets {
        upsert_set(conn, match_id, set).await?;
    }

    sqlx::query(
        "UPDATE matches SET sets_a = ?, sets_b = ?, status = 'finalized', is_walkover = 0 WHERE id = ?",
    )
    .bind(tally.sets_a)
    .bind(tally.sets_b)
    .bind(match_id)
    .execute(&mut *conn)
    .await?;

    standings::recompute_level(conn, m.level_id).await?;
    let progression = bracket::advance(conn, m.level_id).await?;

    Ok(CommittedResult {
        committed: schedule::fetch_match(conn, match_id).await?,
        progression,
    })
}

/// Finalizes an unplayed match 3-0 for the side that showed up.
///
/// The absent side gets 0-25 in three synthesized sets and no table points;
/// the present side gets the walkover's fixed 4.
pub async fn mark_walkover(
    conn: &mut SqliteConnection,
    match_id: i64,
    absent: Side,
) -> Result<CommittedResult> {
    let m = schedule::fetch_match(conn, match_id).await?;
    if matches!(m.status, MatchStatus::InProgress | MatchStatus::Finalized) {
        return Err(AppError::Conflict(format!(
            "Match {} is {} and cannot be marked as a walkover",
            match_id, m.status
        )));
    }

    clear_sets(conn, match_id).await?;
    let scores: Vec<SetScore> = walkover_sets(absent)
        .into_iter()
        .map(|(set_number, points_a, points_b)| SetScore {
            set_number,
            points_a,
            points_b,
        })
        .collect();
    for set in &scores {
        upsert_set(conn, match_id, set).await?;
    }

    let tally = SetTally::from_scores(scores.iter().map(|s| (s.points_a, s.points_b)));
    sqlx::query(
        "UPDATE matches SET sets_a = ?, sets_b = ?, status = 'finalized', is_walkover = 1 WHERE id = ?",
    )
    .bind(tally.sets_a)
    .bind(tally.sets_b)
    .bind(match_id)
    .execute(&mut *conn)
    .await?;

    standings::apply_match(conn, &m, &tally, true, false).await?;
    let progression = bracket::advance(conn, m.level_id).await?;

    Ok(CommittedResult {
        committed: schedule::fetch_match(conn, match_id).await?,
        progression,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::{
        sets::{delete_set, record_set},
        testing::{seed_level, stats_of, unplayed_match},
    };

    fn score(set_number: i64, points_a: i64, points_b: i64) -> SetScore {
        SetScore {
            set_number,
            points_a,
            points_b,
        }
    }

    #[test]
    fn test_parse_side() {
        assert_eq!(parse_side("a").unwrap(), Side::A);
        assert_eq!(parse_side(" B ").unwrap(), Side::B);
        assert!(matches!(parse_side("home"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_full_result() {
        assert!(validate_full_result(&[]).is_err());
        assert!(validate_full_result(&[score(1, 25, 20), score(1, 25, 20)]).is_err());
        assert!(validate_full_result(&[score(1, 25, 20), score(2, 20, 25)]).is_err());
        assert!(validate_full_result(&[score(7, 25, 20)]).is_err());

        // A single set decides nothing
        let err = validate_full_result(&[score(1, 25, 10)]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Play cannot continue once a side has three sets
        let four_one = [
            score(1, 25, 10),
            score(2, 25, 10),
            score(3, 25, 10),
            score(4, 25, 10),
            score(5, 10, 25),
        ];
        assert!(validate_full_result(&four_one).is_err());
        let extra_after_sweep = [
            score(1, 25, 10),
            score(2, 25, 10),
            score(3, 25, 10),
            score(4, 10, 25),
        ];
        assert!(validate_full_result(&extra_after_sweep).is_err());

        // Gaps in the numbering are rejected
        assert!(validate_full_result(&[score(1, 25, 20), score(2, 25, 20), score(4, 25, 20)]).is_err());

        // Order of the list does not matter
        let tally = validate_full_result(&[score(3, 20, 25), score(1, 25, 20), score(4, 25, 23), score(2, 25, 18)])
            .unwrap();
        assert_eq!((tally.sets_a, tally.sets_b), (3, 1));

        let tally = validate_full_result(&[score(1, 25, 20), score(2, 25, 20), score(3, 25, 20)]).unwrap();
        assert_eq!((tally.sets_a, tally.sets_b), (3, 0));
    }

    #[tokio::test]
    async fn test_walkover_scores_and_points() {
        let pool = crate::create_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let seed = seed_level(&mut conn, 2).await;
        let (a, b) = (seed.teams[0], seed.teams[1]);
        let match_id = unplayed_match(&mut conn, &seed, "", a, b).await;

        let result = mark_walkover(&mut conn, match_id, Side::A).await.unwrap();
        let m = &result.committed;
        assert_eq!((m.sets_a, m.sets_b), (0, 3));
        assert!(m.is_walkover);
        assert_eq!(m.status, MatchStatus::Finalized);

        let sets = standings::load_sets(&mut conn, match_id).await.unwrap();
        assert_eq!(sets.len(), 3);
        assert!(sets.iter().all(|s| s.points_a == 0 && s.points_b == 25 && s.winner == Some(Side::B)));

        let rows = stats_of(&mut conn, seed.level_id).await;
        let present = rows.iter().find(|s| s.team_id == b).unwrap();
        assert_eq!(
            (present.played, present.won, present.table_points, present.sets_won, present.points_for),
            (1, 1, 4, 3, 75)
        );
        let absent = rows.iter().find(|s| s.team_id == a).unwrap();
        assert_eq!(
            (absent.played, absent.lost, absent.table_points, absent.sets_lost, absent.points_against),
            (1, 1, 0, 3, 75)
        );

        // Recompute keeps the walkover rule
        standings::recompute_level(&mut conn, seed.level_id).await.unwrap();
        assert_eq!(stats_of(&mut conn, seed.level_id).await, rows);

        let err = mark_walkover(&mut conn, match_id, Side::B).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_walkover_rejected_once_play_started() {
        let pool = crate::create_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let seed = seed_level(&mut conn, 2).await;
        let match_id = unplayed_match(&mut conn, &seed, "", seed.teams[0], seed.teams[1]).await;

        record_set(&mut conn, match_id, &score(1, 25, 20)).await.unwrap();
        let err = mark_walkover(&mut conn, match_id, Side::B).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_deleting_walkover_set_clears_flag_and_points() {
        let pool = crate::create_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let seed = seed_level(&mut conn, 2).await;
        let match_id = unplayed_match(&mut conn, &seed, "", seed.teams[0], seed.teams[1]).await;

        mark_walkover(&mut conn, match_id, Side::B).await.unwrap();
        let set_id = standings::load_sets(&mut conn, match_id).await.unwrap()[2].id;
        delete_set(&mut conn, set_id).await.unwrap();

        let m = schedule::fetch_match(&mut conn, match_id).await.unwrap();
        assert!(!m.is_walkover);
        assert_eq!(m.status, MatchStatus::InProgress);
        let rows = stats_of(&mut conn, seed.level_id).await;
        assert!(rows.iter().all(|s| s.played == 0 && s.table_points == 0 && s.points_for == 0));
    }

    #[tokio::test]
    async fn test_full_result_overwrites_incremental_result() {
        let pool = crate::create_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let seed = seed_level(&mut conn, 2).await;
        let (a, b) = (seed.teams[0], seed.teams[1]);
        let match_id = unplayed_match(&mut conn, &seed, "", a, b).await;

        for n in 1..=3 {
            record_set(&mut conn, match_id, &score(n, 25, 20)).await.unwrap();
        }

        let corrected = [
            score(1, 25, 20),
            score(2, 20, 25),
            score(3, 22, 25),
            score(4, 25, 23),
            score(5, 10, 15),
        ];
        let result = commit_full_result(&mut conn, match_id, &corrected).await.unwrap();
        assert_eq!((result.committed.sets_a, result.committed.sets_b), (2, 3));
        assert_eq!(result.committed.status, MatchStatus::Finalized);
        assert_eq!(standings::load_sets(&mut conn, match_id).await.unwrap().len(), 5);

        let rows = stats_of(&mut conn, seed.level_id).await;
        let ra = rows.iter().find(|s| s.team_id == a).unwrap();
        let rb = rows.iter().find(|s| s.team_id == b).unwrap();
        assert_eq!((ra.played, ra.lost, ra.table_points), (1, 1, 2));
        assert_eq!((rb.played, rb.won, rb.table_points), (1, 1, 3));
    }
}
