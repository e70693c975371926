//! Set Recorder
//!
//! Referee-facing path: one set at a time, stats adjusted by deltas so a
//! decided match updates the table without a full level recompute.

use super::{
    bracket::{self, Progression},
    schedule,
    scoring::{set_winner, SetTally, MAX_SETS},
    standings,
};
use crate::{
    db::models::{MatchSet, MatchStatus, Stage},
    error::{not_found, AppError, Result},
};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

/// Score of one numbered set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetScore {
    pub set_number: i64,
    pub points_a: i64,
    pub points_b: i64,
}

impl SetScore {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_SETS).contains(&self.set_number) {
            return Err(AppError::Validation(format!(
                "Set number must be between 1 and {}, got {}",
                MAX_SETS, self.set_number
            )));
        }
        if self.points_a < 0 || self.points_b < 0 {
            return Err(AppError::Validation(
                "Set points cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SetRecorded {
    pub match_id: i64,
    pub set: MatchSet,
    pub status: MatchStatus,
    pub sets_a: i64,
    pub sets_b: i64,
    /// Present when this set decided the match
    pub progression: Option<Progression>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetDeleted {
    pub set_id: i64,
    pub match_id: i64,
    pub status: MatchStatus,
    pub sets_a: i64,
    pub sets_b: i64,
    /// True when the match lost its finalized result
    pub reverted: bool,
}

/// Writes a set, replacing any earlier score for the same set number.
pub async fn upsert_set(conn: &mut SqliteConnection, match_id: i64, score: &SetScore) -> Result<MatchSet> {
    let set = sqlx::query_as::<_, MatchSet>(
        r#"
        INSERT INTO match_sets (match_id, set_number, points_a, points_b, winner)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (match_id, set_number) DO UPDATE SET
            points_a = excluded.points_a,
            points_b = excluded.points_b,
            winner = excluded.winner
        RETURNING *
        "#,
    )
    .bind(match_id)
    .bind(score.set_number)
    .bind(score.points_a)
    .bind(score.points_b)
    .bind(set_winner(score.points_a, score.points_b))
    .fetch_one(&mut *conn)
    .await?;
    Ok(set)
}

async fn write_header(
    conn: &mut SqliteConnection,
    match_id: i64,
    tally: &SetTally,
    status: MatchStatus,
    walkover: bool,
) -> Result<()> {
    sqlx::query("UPDATE matches SET sets_a = ?, sets_b = ?, status = ?, is_walkover = ? WHERE id = ?")
        .bind(tally.sets_a)
        .bind(tally.sets_b)
        .bind(status)
        .bind(walkover)
        .bind(match_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Records one set of a match that is not finalized yet.
///
/// The first set moves the match to `in_progress`; the set that gives a side
/// its third win finalizes it, credits both teams and runs bracket progression.
pub async fn record_set(
    conn: &mut SqliteConnection,
    match_id: i64,
    score: &SetScore,
) -> Result<SetRecorded> {
    score.validate()?;

    let m = schedule::fetch_match(conn, match_id).await?;
    if m.status == MatchStatus::Finalized {
        return Err(AppError::Conflict(format!(
            "Match {} is already finalized",
            match_id
        )));
    }

    let set = upsert_set(conn, match_id, score).await?;
    let sets = standings::load_sets(conn, match_id).await?;
    let tally = SetTally::from_sets(&sets);

    let status = if tally.is_decided() {
        MatchStatus::Finalized
    } else {
        MatchStatus::InProgress
    };
    write_header(conn, match_id, &tally, status, false).await?;

    let progression = if status == MatchStatus::Finalized {
        standings::apply_match(conn, &m, &tally, false, false).await?;
        Some(bracket::advance(conn, m.level_id).await?)
    } else {
        None
    };

    Ok(SetRecorded {
        match_id,
        set,
        status,
        sets_a: tally.sets_a,
        sets_b: tally.sets_b,
        progression,
    })
}

/// Removes a set.
///
/// When the match was finalized its stats contribution is subtracted first.
/// If the remaining sets still decide the match it stays finalized with the
/// new result credited; otherwise it returns to `in_progress`, loses any
/// walkover flag, and a decided final gives up its champion.
pub async fn delete_set(conn: &mut SqliteConnection, set_id: i64) -> Result<SetDeleted> {
    let set = sqlx::query_as::<_, MatchSet>("SELECT * FROM match_sets WHERE id = ?")
        .bind(set_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(not_found("Set"))?;
    let m = schedule::fetch_match(conn, set.match_id).await?;
    let was_finalized = m.status == MatchStatus::Finalized;

    if was_finalized {
        let before = SetTally::from_sets(&standings::load_sets(conn, m.id).await?);
        standings::apply_match(conn, &m, &before, m.is_walkover, true).await?;
    }

    sqlx::query("DELETE FROM match_sets WHERE id = ?")
        .bind(set_id)
        .execute(&mut *conn)
        .await?;

    let after = SetTally::from_sets(&standings::load_sets(conn, m.id).await?);
    let still_decided = was_finalized && after.is_decided();

    let status = if still_decided {
        MatchStatus::Finalized
    } else if was_finalized {
        MatchStatus::InProgress
    } else {
        m.status
    };
    write_header(conn, m.id, &after, status, false).await?;

    if still_decided {
        standings::apply_match(conn, &m, &after, false, false).await?;
        bracket::advance(conn, m.level_id).await?;
    } else if was_finalized && m.stage == Stage::Final {
        bracket::revoke_champion(conn, m.level_id).await?;
    }

    Ok(SetDeleted {
        set_id,
        match_id: m.id,
        status,
        sets_a: after.sets_a,
        sets_b: after.sets_b,
        reverted: was_finalized && !still_decided,
    })
}
