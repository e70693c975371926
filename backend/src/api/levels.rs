use crate::{
    api::{auth::AppState, extract::ApiJson},
    db::models::{Level, LevelKind},
    error::{not_found, AppError, Result},
    league::bracket::FinalCandidate,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct CreateLevelRequest {
    pub tournament_id: i64,
    pub parent_level_id: Option<i64>,
    pub name: String,
    pub category: String,
    pub kind: LevelKind,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_level))
        .route("/tournament/:id", get(list_tournament_levels))
        .route("/:id", get(get_level))
        .route("/:id/final-candidates", get(get_final_candidates))
}

async fn create_level(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<CreateLevelRequest>,
) -> Result<(StatusCode, Json<Level>)> {
    let caller = state.caller(&headers)?;
    caller.require_admin()?;

    if req.name.trim().is_empty() || req.category.trim().is_empty() {
        return Err(AppError::Validation(
            "Level name and category are required".to_string(),
        ));
    }

    sqlx::query_scalar::<_, i64>("SELECT id FROM tournaments WHERE id = ?")
        .bind(req.tournament_id)
        .fetch_one(&state.pool)
        .await
        .map_err(not_found("Tournament"))?;

    if let Some(parent_id) = req.parent_level_id {
        let parent = sqlx::query_as::<_, Level>("SELECT * FROM levels WHERE id = ?")
            .bind(parent_id)
            .fetch_one(&state.pool)
            .await
            .map_err(not_found("Parent level"))?;
        if parent.tournament_id != req.tournament_id {
            return Err(AppError::Validation(
                "Parent level belongs to another tournament".to_string(),
            ));
        }
    }

    let level = sqlx::query_as::<_, Level>(
        r#"
        INSERT INTO levels (tournament_id, parent_level_id, name, category, kind)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(req.tournament_id)
    .bind(req.parent_level_id)
    .bind(req.name.trim())
    .bind(req.category.trim())
    .bind(req.kind)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(
        "Created {} level {} ({}) in tournament {}",
        level.kind,
        level.name,
        level.id,
        level.tournament_id
    );
    Ok((StatusCode::CREATED, Json(level)))
}

async fn list_tournament_levels(
    State(state): State<Arc<AppState>>,
    Path(tournament_id): Path<i64>,
) -> Result<Json<Vec<Level>>> {
    let levels = sqlx::query_as::<_, Level>(
        "SELECT * FROM levels WHERE tournament_id = ? ORDER BY parent_level_id IS NOT NULL, id",
    )
    .bind(tournament_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(levels))
}

async fn get_level(
    State(state): State<Arc<AppState>>,
    Path(level_id): Path<i64>,
) -> Result<Json<Level>> {
    let level = sqlx::query_as::<_, Level>("SELECT * FROM levels WHERE id = ?")
        .bind(level_id)
        .fetch_one(&state.pool)
        .await
        .map_err(not_found("Level"))?;
    Ok(Json(level))
}

async fn get_final_candidates(
    State(state): State<Arc<AppState>>,
    Path(level_id): Path<i64>,
) -> Result<Json<Vec<FinalCandidate>>> {
    Ok(Json(state.league.final_candidates(level_id).await?))
}
