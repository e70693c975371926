use crate::{
    api::{auth::AppState, extract::ApiJson},
    db::models::{Role, Team},
    error::{not_found, AppError, Result},
    league::standings,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    pub venue_id: Option<i64>,
    pub level_id: Option<i64>,
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignLevelRequest {
    pub level_id: Option<i64>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DelegateTeam {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub team: Team,
    pub level_name: Option<String>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_team))
        .route("/:id/level", put(assign_level))
        .route("/level/:id", get(list_level_teams))
        .route("/delegate", get(list_delegate_teams))
}

async fn create_team(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<CreateTeamRequest>,
) -> Result<(StatusCode, Json<Team>)> {
    state.caller(&headers)?;

    if req.name.trim().is_empty() || req.category.trim().is_empty() {
        return Err(AppError::Validation(
            "Team name and category are required".to_string(),
        ));
    }

    let mut tx = state.pool.begin().await?;
    if let Some(venue_id) = req.venue_id {
        sqlx::query_scalar::<_, i64>("SELECT id FROM venues WHERE id = ?")
            .bind(venue_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found("Venue"))?;
    }
    if let Some(level_id) = req.level_id {
        sqlx::query_scalar::<_, i64>("SELECT id FROM levels WHERE id = ?")
            .bind(level_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found("Level"))?;
    }

    let team = sqlx::query_as::<_, Team>(
        r#"
        INSERT INTO teams (name, venue_id, level_id, category, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(req.name.trim())
    .bind(req.venue_id)
    .bind(req.level_id)
    .bind(req.category.trim())
    .bind(Utc::now().to_rfc3339())
    .fetch_one(&mut *tx)
    .await?;

    if let Some(level_id) = team.level_id {
        standings::ensure_stats_row(&mut *tx, team.id, level_id).await?;
    }
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(team)))
}

async fn assign_level(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(team_id): Path<i64>,
    ApiJson(req): ApiJson<AssignLevelRequest>,
) -> Result<Json<Team>> {
    state.caller(&headers)?;
    let team = state.league.assign_team_level(team_id, req.level_id).await?;
    Ok(Json(team))
}

async fn list_level_teams(
    State(state): State<Arc<AppState>>,
    Path(level_id): Path<i64>,
) -> Result<Json<Vec<Team>>> {
    let teams = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE level_id = ? ORDER BY name")
        .bind(level_id)
        .fetch_all(&state.pool)
        .await?;
    Ok(Json(teams))
}

/// Teams based at any venue the calling delegate answers for
async fn list_delegate_teams(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<DelegateTeam>>> {
    let caller = state.caller(&headers)?;
    caller.require_role(&[Role::Delegate])?;

    let teams = sqlx::query_as::<_, DelegateTeam>(
        r#"
        SELECT t.*, l.name AS level_name
        FROM teams t
        JOIN delegate_venues dv ON dv.venue_id = t.venue_id
        LEFT JOIN levels l ON l.id = t.level_id
        WHERE dv.user_id = ?
        ORDER BY t.name
        "#,
    )
    .bind(caller.user_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(teams))
}
