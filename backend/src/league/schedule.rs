//! Match rows: creation, scheduling edits, deletion and per-level numbering

use super::standings;
use crate::{
    db::models::{Level, Match, MatchSet, MatchStatus, Stage},
    error::{not_found, AppError, Result},
};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

/// Fields of a match created outside the fixture generator (playoffs, friendlies)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewMatch {
    pub tournament_id: i64,
    pub level_id: i64,
    pub team_a_id: i64,
    pub team_b_id: i64,
    #[serde(default)]
    pub stage: Stage,
    pub match_date: Option<String>,
    pub match_time: Option<String>,
    pub venue_id: Option<i64>,
    pub referee_id: Option<i64>,
}

impl NewMatch {
    fn is_fully_scheduled(&self) -> bool {
        self.match_date.is_some()
            && self.match_time.is_some()
            && self.venue_id.is_some()
            && self.referee_id.is_some()
    }
}

/// Scheduling edit. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchUpdate {
    pub match_date: Option<String>,
    pub match_time: Option<String>,
    pub venue_id: Option<i64>,
    pub referee_id: Option<i64>,
    pub stage: Option<Stage>,
    pub status: Option<MatchStatus>,
}

/// A match with its team names and recorded sets, as listed to clients
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MatchListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub info: Match,
    pub team_a_name: String,
    pub team_b_name: String,
    pub level_name: String,
    pub venue_name: Option<String>,
    #[sqlx(skip)]
    pub sets: Vec<MatchSet>,
}

/// Checks `YYYY-MM-DD` and `HH:MM` before anything is written.
pub fn validate_schedule(date: Option<&str>, time: Option<&str>) -> Result<()> {
    if let Some(date) = date {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", date)))?;
    }
    if let Some(time) = time {
        NaiveTime::parse_from_str(time, "%H:%M")
            .map_err(|_| AppError::Validation(format!("Invalid time '{}', expected HH:MM", time)))?;
    }
    Ok(())
}

pub async fn fetch_match(conn: &mut SqliteConnection, match_id: i64) -> Result<Match> {
    sqlx::query_as::<_, Match>("SELECT * FROM matches WHERE id = ?")
        .bind(match_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(not_found("Match"))
}

pub async fn fetch_level(conn: &mut SqliteConnection, level_id: i64) -> Result<Level> {
    sqlx::query_as::<_, Level>("SELECT * FROM levels WHERE id = ?")
        .bind(level_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(not_found("Level"))
}

pub async fn level_matches(conn: &mut SqliteConnection, level_id: i64) -> Result<Vec<Match>> {
    let matches = sqlx::query_as::<_, Match>(
        "SELECT * FROM matches WHERE level_id = ? ORDER BY match_number, id",
    )
    .bind(level_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(matches)
}

pub async fn ensure_team(conn: &mut SqliteConnection, team_id: i64) -> Result<()> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM teams WHERE id = ?")
        .bind(team_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::NotFound(format!("Team {} not found", team_id)),
            e => AppError::Database(e),
        })?;
    Ok(())
}

async fn ensure_venue_and_referee(
    conn: &mut SqliteConnection,
    venue_id: Option<i64>,
    referee_id: Option<i64>,
) -> Result<()> {
    if let Some(venue_id) = venue_id {
        sqlx::query_scalar::<_, i64>("SELECT id FROM venues WHERE id = ?")
            .bind(venue_id)
            .fetch_one(&mut *conn)
            .await
            .map_err(not_found("Venue"))?;
    }
    if let Some(referee_id) = referee_id {
        sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = ?")
            .bind(referee_id)
            .fetch_one(&mut *conn)
            .await
            .map_err(not_found("Referee"))?;
    }
    Ok(())
}

/// A level holds at most one final.
async fn ensure_single_final(
    conn: &mut SqliteConnection,
    level_id: i64,
    except_match_id: Option<i64>,
) -> Result<()> {
    let existing: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM matches WHERE level_id = ? AND stage = 'final' AND id != COALESCE(?, -1)",
    )
    .bind(level_id)
    .bind(except_match_id)
    .fetch_one(&mut *conn)
    .await?;

    if existing > 0 {
        return Err(AppError::Conflict(format!(
            "Level {} already has a final",
            level_id
        )));
    }
    Ok(())
}

/// Next free sequence number in a level, continuing after existing matches.
pub async fn next_match_number(conn: &mut SqliteConnection, level_id: i64) -> Result<i64> {
    let max: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(match_number), 0) FROM matches WHERE level_id = ?",
    )
    .bind(level_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(max + 1)
}

/// Re-derives the dense 1..N numbering of a level: date ascending, then
/// time ascending (missing values last), then id.
pub async fn renumber_matches(conn: &mut SqliteConnection, level_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        WITH ordered AS (
            SELECT id, ROW_NUMBER() OVER (
                ORDER BY match_date IS NULL, match_date, match_time IS NULL, match_time, id
            ) AS rn
            FROM matches
            WHERE level_id = ?
        )
        UPDATE matches SET match_number = ordered.rn
        FROM ordered
        WHERE matches.id = ordered.id AND matches.match_number != ordered.rn
        "#,
    )
    .bind(level_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Inserts a match row and returns its id. Numbering is left to the caller.
pub async fn insert_match(
    conn: &mut SqliteConnection,
    new: &NewMatch,
    status: MatchStatus,
    match_number: i64,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO matches (
            tournament_id, level_id, team_a_id, team_b_id, stage,
            match_date, match_time, venue_id, referee_id,
            status, match_number, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(new.tournament_id)
    .bind(new.level_id)
    .bind(new.team_a_id)
    .bind(new.team_b_id)
    .bind(new.stage.label())
    .bind(&new.match_date)
    .bind(&new.match_time)
    .bind(new.venue_id)
    .bind(new.referee_id)
    .bind(status)
    .bind(match_number)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Creates a single match. It starts `scheduled` when date, time, venue and
/// referee are all given, `pending` otherwise.
pub async fn create_match(conn: &mut SqliteConnection, new: &NewMatch) -> Result<Match> {
    if new.team_a_id == new.team_b_id {
        return Err(AppError::Validation(
            "A match needs two different teams".to_string(),
        ));
    }
    validate_schedule(new.match_date.as_deref(), new.match_time.as_deref())?;

    let level = fetch_level(conn, new.level_id).await?;
    if level.tournament_id != new.tournament_id {
        return Err(AppError::Validation(format!(
            "Level {} does not belong to tournament {}",
            level.id, new.tournament_id
        )));
    }
    ensure_team(conn, new.team_a_id).await?;
    ensure_team(conn, new.team_b_id).await?;
    ensure_venue_and_referee(conn, new.venue_id, new.referee_id).await?;
    if new.stage == Stage::Final {
        ensure_single_final(conn, new.level_id, None).await?;
    }

    let status = if new.is_fully_scheduled() {
        MatchStatus::Scheduled
    } else {
        MatchStatus::Pending
    };
    let number = next_match_number(conn, new.level_id).await?;
    let match_id = insert_match(conn, new, status, number).await?;
    renumber_matches(conn, new.level_id).await?;

    fetch_match(conn, match_id).await
}

/// Applies a scheduling edit, then renumbers the level.
pub async fn update_match(
    conn: &mut SqliteConnection,
    match_id: i64,
    update: &MatchUpdate,
) -> Result<Match> {
    validate_schedule(update.match_date.as_deref(), update.match_time.as_deref())?;
    let current = fetch_match(conn, match_id).await?;

    if let Some(status) = update.status {
        if !matches!(status, MatchStatus::Pending | MatchStatus::Scheduled) {
            return Err(AppError::Validation(format!(
                "Status can only be set to pending or scheduled, got {}",
                status
            )));
        }
        if matches!(current.status, MatchStatus::InProgress | MatchStatus::Finalized) {
            return Err(AppError::Conflict(format!(
                "Match {} is {} and its status cannot be reset",
                match_id, current.status
            )));
        }
    }
    ensure_venue_and_referee(conn, update.venue_id, update.referee_id).await?;
    if update.stage == Some(Stage::Final) {
        ensure_single_final(conn, current.level_id, Some(match_id)).await?;
    }

    let stage = update.stage.as_ref().unwrap_or(&current.stage);
    sqlx::query(
        r#"
        UPDATE matches SET
            match_date = COALESCE(?, match_date),
            match_time = COALESCE(?, match_time),
            venue_id = COALESCE(?, venue_id),
            referee_id = COALESCE(?, referee_id),
            status = COALESCE(?, status),
            stage = ?
        WHERE id = ?
        "#,
    )
    .bind(&update.match_date)
    .bind(&update.match_time)
    .bind(update.venue_id)
    .bind(update.referee_id)
    .bind(update.status)
    .bind(stage.label())
    .bind(match_id)
    .execute(&mut *conn)
    .await?;

    // A pending match that now carries full schedule data becomes scheduled,
    // unless the caller asked for pending explicitly
    if update.status.is_none() {
        sqlx::query(
            r#"
            UPDATE matches SET status = 'scheduled'
            WHERE id = ? AND status = 'pending'
              AND match_date IS NOT NULL AND match_time IS NOT NULL
              AND venue_id IS NOT NULL AND referee_id IS NOT NULL
            "#,
        )
        .bind(match_id)
        .execute(&mut *conn)
        .await?;
    }

    renumber_matches(conn, current.level_id).await?;
    fetch_match(conn, match_id).await
}

/// Deletes a match and its sets. Standings are rebuilt when the match had
/// counted towards them. Returns the deleted row.
pub async fn delete_match(conn: &mut SqliteConnection, match_id: i64) -> Result<Match> {
    let m = fetch_match(conn, match_id).await?;

    sqlx::query("DELETE FROM matches WHERE id = ?")
        .bind(match_id)
        .execute(&mut *conn)
        .await?;

    renumber_matches(conn, m.level_id).await?;

    if m.status == MatchStatus::Finalized {
        standings::recompute_level(conn, m.level_id).await?;
        if m.stage == Stage::Final {
            super::bracket::revoke_champion(conn, m.level_id).await?;
        }
    }
    Ok(m)
}

async fn attach_sets(
    conn: &mut SqliteConnection,
    mut listings: Vec<MatchListing>,
) -> Result<Vec<MatchListing>> {
    for listing in listings.iter_mut() {
        listing.sets = standings::load_sets(conn, listing.info.id).await?;
    }
    Ok(listings)
}

const LISTING_SELECT: &str = r#"
    SELECT m.*,
           ta.name AS team_a_name,
           tb.name AS team_b_name,
           l.name AS level_name,
           v.name AS venue_name
    FROM matches m
    JOIN teams ta ON ta.id = m.team_a_id
    JOIN teams tb ON tb.id = m.team_b_id
    JOIN levels l ON l.id = m.level_id
    JOIN tournaments t ON t.id = m.tournament_id
    LEFT JOIN venues v ON v.id = m.venue_id
"#;

/// Matches of a level in sequence order, with their sets.
pub async fn list_level_matches(
    conn: &mut SqliteConnection,
    level_id: i64,
) -> Result<Vec<MatchListing>> {
    fetch_level(conn, level_id).await?;
    let sql = format!("{} WHERE m.level_id = ? ORDER BY m.match_number, m.id", LISTING_SELECT);
    let listings = sqlx::query_as::<_, MatchListing>(&sql)
        .bind(level_id)
        .fetch_all(&mut *conn)
        .await?;
    attach_sets(conn, listings).await
}

/// Matches assigned to a referee in active tournaments.
pub async fn referee_matches(
    conn: &mut SqliteConnection,
    referee_id: i64,
) -> Result<Vec<MatchListing>> {
    let sql = format!(
        r#"{}
        WHERE m.referee_id = ? AND t.status = 'active'
        ORDER BY m.match_date IS NULL, m.match_date, m.match_time, m.id"#,
        LISTING_SELECT
    );
    let listings = sqlx::query_as::<_, MatchListing>(&sql)
        .bind(referee_id)
        .fetch_all(&mut *conn)
        .await?;
    attach_sets(conn, listings).await
}

/// Distinct dates on which a referee has matches in active tournaments.
pub async fn referee_match_dates(
    conn: &mut SqliteConnection,
    referee_id: i64,
) -> Result<Vec<String>> {
    let dates = sqlx::query_scalar::<_, String>(
        r#"
        SELECT DISTINCT m.match_date
        FROM matches m
        JOIN tournaments t ON t.id = m.tournament_id
        WHERE m.referee_id = ? AND m.match_date IS NOT NULL AND t.status = 'active'
        ORDER BY m.match_date
        "#,
    )
    .bind(referee_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(dates)
}

/// Non-pending matches involving a team from one of the delegate's venues,
/// in active tournaments.
pub async fn delegate_matches(
    conn: &mut SqliteConnection,
    delegate_id: i64,
) -> Result<Vec<MatchListing>> {
    let sql = format!(
        r#"{}
        WHERE (ta.venue_id IN (SELECT venue_id FROM delegate_venues WHERE user_id = ?)
            OR tb.venue_id IN (SELECT venue_id FROM delegate_venues WHERE user_id = ?))
          AND t.status = 'active'
          AND m.status != 'pending'
        ORDER BY m.match_date IS NULL, m.match_date, m.match_time, m.id"#,
        LISTING_SELECT
    );
    let listings = sqlx::query_as::<_, MatchListing>(&sql)
        .bind(delegate_id)
        .bind(delegate_id)
        .fetch_all(&mut *conn)
        .await?;
    attach_sets(conn, listings).await
}
