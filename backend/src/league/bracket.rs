//! Bracket Progression Engine
//!
//! Handles the two-semifinal playoff shape only. After any finalization in a
//! level, [`advance`] creates or re-targets the final once both semifinals
//! are decided, and stamps the champion once the final is decided. Incomplete
//! brackets are an expected state and are reported, never raised as errors.

use super::schedule::{self, NewMatch};
use crate::{
    db::models::{Match, MatchStatus, SemifinalSlot, Stage},
    error::Result,
};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection};

/// What progression should do with a level's final
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FinalPlan {
    NotReady { reason: &'static str },
    Create { team_a_id: i64, team_b_id: i64 },
    Retarget { match_id: i64, team_a_id: i64, team_b_id: i64 },
    Keep { match_id: i64 },
}

/// Outcome of one progression pass over a level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progression {
    pub level_id: i64,
    pub final_match: FinalPlan,
    /// Id of the final after the pass, when one exists
    pub final_match_id: Option<i64>,
    pub champion_team_id: Option<i64>,
}

fn semifinal_order(m: &Match) -> u8 {
    match m.stage {
        Stage::Semifinal(SemifinalSlot::First) => 0,
        _ => 1,
    }
}

/// Decides the final's fate from a level's matches.
///
/// The winner of semifinal 1 plays as side A.
pub fn plan_final(matches: &[Match]) -> FinalPlan {
    let mut semis: Vec<&Match> = matches.iter().filter(|m| m.stage.is_semifinal()).collect();
    if semis.len() != 2 {
        return FinalPlan::NotReady {
            reason: "level does not have exactly two semifinals",
        };
    }
    semis.sort_by_key(|m| (semifinal_order(m), m.id));

    if semis.iter().any(|m| m.status != MatchStatus::Finalized) {
        return FinalPlan::NotReady {
            reason: "a semifinal is not finalized",
        };
    }

    let (Some(team_a_id), Some(team_b_id)) = (semis[0].winner(), semis[1].winner()) else {
        return FinalPlan::NotReady {
            reason: "a semifinal has no winner",
        };
    };
    if team_a_id == team_b_id {
        return FinalPlan::NotReady {
            reason: "semifinal winners are not distinct",
        };
    }

    match matches.iter().find(|m| m.stage == Stage::Final) {
        None => FinalPlan::Create {
            team_a_id,
            team_b_id,
        },
        Some(f) if f.status == MatchStatus::Pending => {
            if f.team_a_id == team_a_id && f.team_b_id == team_b_id {
                FinalPlan::Keep { match_id: f.id }
            } else {
                FinalPlan::Retarget {
                    match_id: f.id,
                    team_a_id,
                    team_b_id,
                }
            }
        }
        Some(f) => FinalPlan::Keep { match_id: f.id },
    }
}

/// Runs progression for a level inside the caller's transaction.
pub async fn advance(conn: &mut SqliteConnection, level_id: i64) -> Result<Progression> {
    let level = schedule::fetch_level(conn, level_id).await?;
    let matches = schedule::level_matches(conn, level_id).await?;
    let plan = plan_final(&matches);

    let final_match_id = match &plan {
        FinalPlan::NotReady { reason } => {
            tracing::debug!("No final for level {}: {}", level_id, reason);
            matches.iter().find(|m| m.stage == Stage::Final).map(|m| m.id)
        }
        FinalPlan::Create {
            team_a_id,
            team_b_id,
        } => {
            let new = NewMatch {
                tournament_id: level.tournament_id,
                level_id,
                team_a_id: *team_a_id,
                team_b_id: *team_b_id,
                stage: Stage::Final,
                ..NewMatch::default()
            };
            let number = schedule::next_match_number(conn, level_id).await?;
            let match_id = schedule::insert_match(conn, &new, MatchStatus::Pending, number).await?;
            tracing::info!(
                "Created final {} for level {}: team {} vs team {}",
                match_id,
                level_id,
                team_a_id,
                team_b_id
            );
            Some(match_id)
        }
        FinalPlan::Retarget {
            match_id,
            team_a_id,
            team_b_id,
        } => {
            sqlx::query("UPDATE matches SET team_a_id = ?, team_b_id = ? WHERE id = ?")
                .bind(team_a_id)
                .bind(team_b_id)
                .bind(match_id)
                .execute(&mut *conn)
                .await?;
            tracing::info!("Re-targeted final {} of level {}", match_id, level_id);
            Some(*match_id)
        }
        FinalPlan::Keep { match_id } => Some(*match_id),
    };

    let champion_team_id = stamp_champion(conn, level_id).await?;

    Ok(Progression {
        level_id,
        final_match: plan,
        final_match_id,
        champion_team_id,
    })
}

/// Records the winner of a finalized final as the level's champion and
/// finalizes the level. Re-stamping the same champion is harmless.
pub async fn stamp_champion(conn: &mut SqliteConnection, level_id: i64) -> Result<Option<i64>> {
    let finals = sqlx::query_as::<_, Match>(
        "SELECT * FROM matches WHERE level_id = ? AND status = 'finalized' ORDER BY id",
    )
    .bind(level_id)
    .fetch_all(&mut *conn)
    .await?;

    let Some(champion) = finals
        .iter()
        .find(|m| m.stage == Stage::Final)
        .and_then(Match::winner)
    else {
        return Ok(None);
    };

    sqlx::query("UPDATE levels SET champion_team_id = ?, status = 'finalized' WHERE id = ?")
        .bind(champion)
        .bind(level_id)
        .execute(&mut *conn)
        .await?;

    Ok(Some(champion))
}

/// Clears the champion of a level whose final is no longer decided.
pub async fn revoke_champion(conn: &mut SqliteConnection, level_id: i64) -> Result<()> {
    let result = sqlx::query(
        "UPDATE levels SET champion_team_id = NULL, status = 'active' WHERE id = ? AND champion_team_id IS NOT NULL",
    )
    .bind(level_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() > 0 {
        tracing::info!("Revoked champion of level {}", level_id);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct FinalCandidate {
    pub team_id: i64,
    pub team_name: String,
    pub match_id: i64,
}

/// Winners of the already-decided semifinals of a playoff level.
pub async fn final_candidates(
    conn: &mut SqliteConnection,
    level_id: i64,
) -> Result<Vec<FinalCandidate>> {
    schedule::fetch_level(conn, level_id).await?;
    let mut semis: Vec<Match> = schedule::level_matches(conn, level_id)
        .await?
        .into_iter()
        .filter(|m| m.stage.is_semifinal())
        .collect();
    semis.sort_by_key(|m| (semifinal_order(m), m.id));

    let mut candidates = Vec::new();
    for m in semis {
        let Some(team_id) = m.winner() else {
            continue;
        };
        let team_name: String = sqlx::query_scalar("SELECT name FROM teams WHERE id = ?")
            .bind(team_id)
            .fetch_one(&mut *conn)
            .await?;
        candidates.push(FinalCandidate {
            team_id,
            team_name,
            match_id: m.id,
        });
    }
    Ok(candidates)
}
