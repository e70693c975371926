use crate::{
    api::{auth::AppState, extract::ApiJson},
    db::models::{Tournament, TournamentStatus},
    error::{AppError, Result},
    league::schedule::validate_schedule,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct CreateTournamentRequest {
    pub name: String,
    pub year: i64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<TournamentStatus>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_tournaments).post(create_tournament))
}

async fn create_tournament(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<CreateTournamentRequest>,
) -> Result<(StatusCode, Json<Tournament>)> {
    let caller = state.caller(&headers)?;
    caller.require_admin()?;

    if req.name.trim().is_empty() {
        return Err(AppError::Validation("Tournament name is required".to_string()));
    }
    validate_schedule(req.start_date.as_deref(), None)?;
    validate_schedule(req.end_date.as_deref(), None)?;
    if let (Some(start), Some(end)) = (&req.start_date, &req.end_date) {
        // ISO dates compare correctly as text
        if end < start {
            return Err(AppError::Validation(
                "Tournament cannot end before it starts".to_string(),
            ));
        }
    }

    let tournament = sqlx::query_as::<_, Tournament>(
        r#"
        INSERT INTO tournaments (name, year, start_date, end_date, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(req.name.trim())
    .bind(req.year)
    .bind(&req.start_date)
    .bind(&req.end_date)
    .bind(req.status.unwrap_or(TournamentStatus::Active))
    .bind(Utc::now().to_rfc3339())
    .fetch_one(&state.pool)
    .await?;

    tracing::info!("Created tournament {} ({})", tournament.name, tournament.id);
    Ok((StatusCode::CREATED, Json(tournament)))
}

async fn list_tournaments(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Tournament>>> {
    let tournaments =
        sqlx::query_as::<_, Tournament>("SELECT * FROM tournaments ORDER BY year DESC, id")
            .fetch_all(&state.pool)
            .await?;
    Ok(Json(tournaments))
}
