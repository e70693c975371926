//! League Manager
//!
//! Owns the pool and wraps every mutating league operation in a single
//! transaction: scores, headers, standings and bracket changes either all
//! commit or all roll back. Audit events are emitted only after commit.

use super::{
    bracket::{self, FinalCandidate, FinalPlan, Progression},
    fixtures::{self, FixtureReport},
    ranking::{Qualifier, StandingRow},
    results::{self, CommittedResult},
    schedule::{self, MatchListing, MatchUpdate, NewMatch},
    sets::{self, SetDeleted, SetRecorded, SetScore},
    standings,
};
use crate::{
    audit,
    auth::AuthUser,
    db::{
        models::{Match, Side, Team},
        DbPool,
    },
    error::{not_found, Result},
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

pub struct LeagueManager {
    pool: DbPool,
}

fn audit_progression(progression: &Progression) {
    let level_id = progression.level_id;
    match &progression.final_match {
        FinalPlan::Create {
            team_a_id,
            team_b_id,
        } => audit::log_bracket_event(
            level_id,
            "final_created",
            &format!(
                "match {:?}: team {} vs team {}",
                progression.final_match_id, team_a_id, team_b_id
            ),
        ),
        FinalPlan::Retarget {
            match_id,
            team_a_id,
            team_b_id,
        } => audit::log_bracket_event(
            level_id,
            "final_retargeted",
            &format!("match {}: team {} vs team {}", match_id, team_a_id, team_b_id),
        ),
        FinalPlan::NotReady { .. } | FinalPlan::Keep { .. } => {}
    }

    if let Some(champion) = progression.champion_team_id {
        audit::log_bracket_event(level_id, "champion", &format!("team {}", champion));
    }
}

impl LeagueManager {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Record (or replace) one set of a match
    pub async fn record_set(
        &self,
        user: &AuthUser,
        match_id: i64,
        score: SetScore,
    ) -> Result<SetRecorded> {
        let mut tx = self.pool.begin().await?;
        let recorded = sets::record_set(&mut *tx, match_id, &score).await?;
        tx.commit().await?;

        tracing::debug!("Set recorded by user {}", user.user_id);
        audit::log_set_recorded(
            match_id,
            score.set_number,
            score.points_a,
            score.points_b,
            recorded.status,
        );
        if let Some(progression) = &recorded.progression {
            audit_progression(progression);
        }
        Ok(recorded)
    }

    pub async fn delete_set(&self, set_id: i64) -> Result<SetDeleted> {
        let mut tx = self.pool.begin().await?;
        let deleted = sets::delete_set(&mut *tx, set_id).await?;
        tx.commit().await?;

        audit::log_set_deleted(set_id, deleted.match_id, deleted.reverted);
        Ok(deleted)
    }

    /// Administrative overwrite of a match's full result
    pub async fn commit_full_result(
        &self,
        user: &AuthUser,
        match_id: i64,
        scores: Vec<SetScore>,
    ) -> Result<CommittedResult> {
        let mut tx = self.pool.begin().await?;
        let result = results::commit_full_result(&mut *tx, match_id, &scores).await?;
        tx.commit().await?;

        audit::log_result_committed(
            match_id,
            user.user_id,
            result.committed.sets_a,
            result.committed.sets_b,
        );
        audit_progression(&result.progression);
        Ok(result)
    }

    pub async fn mark_walkover(
        &self,
        user: &AuthUser,
        match_id: i64,
        absent: Side,
    ) -> Result<CommittedResult> {
        let mut tx = self.pool.begin().await?;
        let result = results::mark_walkover(&mut *tx, match_id, absent).await?;
        tx.commit().await?;

        audit::log_walkover(match_id, user.user_id, absent);
        audit_progression(&result.progression);
        Ok(result)
    }

    /// Regenerate the round robin of a level with a freshly seeded RNG
    pub async fn generate_fixture(
        &self,
        user: &AuthUser,
        level_id: i64,
        team_ids: &[i64],
    ) -> Result<FixtureReport> {
        let mut rng = ChaCha20Rng::from_entropy();
        let mut tx = self.pool.begin().await?;
        let report = fixtures::generate_fixture(&mut *tx, level_id, team_ids, &mut rng).await?;
        tx.commit().await?;

        audit::log_fixture_generated(level_id, user.user_id, report.created);
        Ok(report)
    }

    pub async fn create_match(&self, new: NewMatch) -> Result<Match> {
        let mut tx = self.pool.begin().await?;
        let created = schedule::create_match(&mut *tx, &new).await?;
        tx.commit().await?;

        tracing::info!(
            "Created match {} in level {} (number {})",
            created.id,
            created.level_id,
            created.match_number
        );
        Ok(created)
    }

    pub async fn update_match(&self, match_id: i64, update: MatchUpdate) -> Result<Match> {
        let mut tx = self.pool.begin().await?;
        let updated = schedule::update_match(&mut *tx, match_id, &update).await?;
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn delete_match(&self, match_id: i64) -> Result<Match> {
        let mut tx = self.pool.begin().await?;
        let deleted = schedule::delete_match(&mut *tx, match_id).await?;
        tx.commit().await?;

        tracing::info!(
            "Deleted match {} from level {} (was {})",
            match_id,
            deleted.level_id,
            deleted.status
        );
        Ok(deleted)
    }

    /// Rebuild a level's standings from its finalized matches
    pub async fn recompute_level(&self, level_id: i64) -> Result<Vec<StandingRow>> {
        let mut tx = self.pool.begin().await?;
        schedule::fetch_level(&mut *tx, level_id).await?;
        standings::recompute_level(&mut *tx, level_id).await?;
        let rows = standings::standings(&mut *tx, level_id).await?;
        tx.commit().await?;

        tracing::info!("Recomputed standings of level {} ({} teams)", level_id, rows.len());
        Ok(rows)
    }

    /// Assign a team to a level (or clear it) and create its stats row
    pub async fn assign_team_level(&self, team_id: i64, level_id: Option<i64>) -> Result<Team> {
        let mut tx = self.pool.begin().await?;
        schedule::ensure_team(&mut *tx, team_id).await?;
        if let Some(level_id) = level_id {
            schedule::fetch_level(&mut *tx, level_id).await?;
        }

        sqlx::query("UPDATE teams SET level_id = ? WHERE id = ?")
            .bind(level_id)
            .bind(team_id)
            .execute(&mut *tx)
            .await?;
        if let Some(level_id) = level_id {
            standings::ensure_stats_row(&mut *tx, team_id, level_id).await?;
        }

        let team = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = ?")
            .bind(team_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found("Team"))?;
        tx.commit().await?;
        Ok(team)
    }

    // ==================== Read paths ====================

    pub async fn standings(&self, level_id: i64) -> Result<Vec<StandingRow>> {
        let mut conn = self.pool.acquire().await?;
        standings::standings(&mut conn, level_id).await
    }

    pub async fn group_winners(&self, parent_level_id: i64) -> Result<Vec<Qualifier>> {
        let mut conn = self.pool.acquire().await?;
        standings::group_winners(&mut conn, parent_level_id).await
    }

    pub async fn final_candidates(&self, level_id: i64) -> Result<Vec<FinalCandidate>> {
        let mut conn = self.pool.acquire().await?;
        bracket::final_candidates(&mut conn, level_id).await
    }

    pub async fn level_matches(&self, level_id: i64) -> Result<Vec<MatchListing>> {
        let mut conn = self.pool.acquire().await?;
        schedule::list_level_matches(&mut conn, level_id).await
    }

    pub async fn referee_matches(&self, user: &AuthUser) -> Result<Vec<MatchListing>> {
        let mut conn = self.pool.acquire().await?;
        schedule::referee_matches(&mut conn, user.user_id).await
    }

    pub async fn referee_match_dates(&self, user: &AuthUser) -> Result<Vec<String>> {
        let mut conn = self.pool.acquire().await?;
        schedule::referee_match_dates(&mut conn, user.user_id).await
    }

    pub async fn delegate_matches(&self, user: &AuthUser) -> Result<Vec<MatchListing>> {
        let mut conn = self.pool.acquire().await?;
        schedule::delegate_matches(&mut conn, user.user_id).await
    }
}
