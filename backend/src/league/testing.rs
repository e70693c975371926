//! Fixtures shared by the league unit tests

use super::{
    schedule::{self, NewMatch},
    scoring::SetTally,
    sets::{upsert_set, SetScore},
    standings,
};
use crate::db::models::{LevelKind, MatchStatus, Stage, TeamLevelStats};
use chrono::Utc;
use sqlx::SqliteConnection;

pub struct Seed {
    pub tournament_id: i64,
    pub level_id: i64,
    pub teams: Vec<i64>,
    pub venue_id: i64,
    pub referee_id: i64,
}

async fn seed(conn: &mut SqliteConnection, team_count: usize, kind: LevelKind) -> Seed {
    let now = Utc::now().to_rfc3339();
    let tournament_id = sqlx::query(
        "INSERT INTO tournaments (name, year, status, created_at) VALUES ('Spring Cup', 2025, 'active', ?)",
    )
    .bind(&now)
    .execute(&mut *conn)
    .await
    .unwrap()
    .last_insert_rowid();

    let level_id = sqlx::query(
        "INSERT INTO levels (tournament_id, name, category, kind) VALUES (?, 'Level 1', 'mixed', ?)",
    )
    .bind(tournament_id)
    .bind(kind)
    .execute(&mut *conn)
    .await
    .unwrap()
    .last_insert_rowid();

    let venue_id = sqlx::query("INSERT INTO venues (name) VALUES ('North Gym')")
        .execute(&mut *conn)
        .await
        .unwrap()
        .last_insert_rowid();

    let referee_id = sqlx::query(
        "INSERT INTO users (username, password_hash, role, created_at) VALUES ('ref', 'x', 'referee', ?)",
    )
    .bind(&now)
    .execute(&mut *conn)
    .await
    .unwrap()
    .last_insert_rowid();

    let mut teams = Vec::with_capacity(team_count);
    for i in 0..team_count {
        let assigned = (kind == LevelKind::Group).then_some(level_id);
        let team_id = sqlx::query(
            "INSERT INTO teams (name, venue_id, level_id, category, created_at) VALUES (?, ?, ?, 'mixed', ?)",
        )
        .bind(format!("Team {}", i + 1))
        .bind(venue_id)
        .bind(assigned)
        .bind(&now)
        .execute(&mut *conn)
        .await
        .unwrap()
        .last_insert_rowid();
        if assigned.is_some() {
            standings::ensure_stats_row(conn, team_id, level_id).await.unwrap();
        }
        teams.push(team_id);
    }

    Seed {
        tournament_id,
        level_id,
        teams,
        venue_id,
        referee_id,
    }
}

/// Group level whose teams all have stats rows
pub async fn seed_level(conn: &mut SqliteConnection, team_count: usize) -> Seed {
    seed(conn, team_count, LevelKind::Group).await
}

/// Playoff level; teams are not assigned to it
pub async fn seed_playoff(conn: &mut SqliteConnection, team_count: usize) -> Seed {
    seed(conn, team_count, LevelKind::Playoff).await
}

pub async fn unplayed_match(conn: &mut SqliteConnection, seed: &Seed, stage: &str, a: i64, b: i64) -> i64 {
    let new = NewMatch {
        tournament_id: seed.tournament_id,
        level_id: seed.level_id,
        team_a_id: a,
        team_b_id: b,
        stage: Stage::parse(stage),
        ..NewMatch::default()
    };
    let number = schedule::next_match_number(conn, seed.level_id).await.unwrap();
    schedule::insert_match(conn, &new, MatchStatus::Pending, number)
        .await
        .unwrap()
}

/// Stores a finalized match with its sets without touching standings.
pub async fn finalize_in_stage(
    conn: &mut SqliteConnection,
    seed: &Seed,
    stage: &str,
    a: i64,
    b: i64,
    sets: &[(i64, i64)],
) -> i64 {
    let match_id = unplayed_match(conn, seed, stage, a, b).await;
    for (i, &(points_a, points_b)) in sets.iter().enumerate() {
        let score = SetScore {
            set_number: i as i64 + 1,
            points_a,
            points_b,
        };
        upsert_set(conn, match_id, &score).await.unwrap();
    }
    let tally = SetTally::from_scores(sets.iter().copied());
    sqlx::query("UPDATE matches SET sets_a = ?, sets_b = ?, status = 'finalized' WHERE id = ?")
        .bind(tally.sets_a)
        .bind(tally.sets_b)
        .bind(match_id)
        .execute(&mut *conn)
        .await
        .unwrap();
    match_id
}

pub async fn finalize_with_sets(
    conn: &mut SqliteConnection,
    seed: &Seed,
    a: i64,
    b: i64,
    sets: &[(i64, i64)],
) -> i64 {
    finalize_in_stage(conn, seed, "", a, b, sets).await
}

pub async fn stats_of(conn: &mut SqliteConnection, level_id: i64) -> Vec<TeamLevelStats> {
    sqlx::query_as::<_, TeamLevelStats>(
        "SELECT * FROM team_level_stats WHERE level_id = ? ORDER BY team_id",
    )
    .bind(level_id)
    .fetch_all(&mut *conn)
    .await
    .unwrap()
}
