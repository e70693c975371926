use crate::{
    api::{auth::AppState, extract::ApiJson},
    db::models::Venue,
    error::{AppError, Result},
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct CreateVenueRequest {
    pub name: String,
    pub address: Option<String>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_venues).post(create_venue))
}

async fn create_venue(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<CreateVenueRequest>,
) -> Result<(StatusCode, Json<Venue>)> {
    let caller = state.caller(&headers)?;
    caller.require_admin()?;

    if req.name.trim().is_empty() {
        return Err(AppError::Validation("Venue name is required".to_string()));
    }

    let venue = sqlx::query_as::<_, Venue>(
        "INSERT INTO venues (name, address) VALUES (?, ?) RETURNING *",
    )
    .bind(req.name.trim())
    .bind(&req.address)
    .fetch_one(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(venue)))
}

async fn list_venues(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Venue>>> {
    let venues = sqlx::query_as::<_, Venue>("SELECT * FROM venues ORDER BY name")
        .fetch_all(&state.pool)
        .await?;
    Ok(Json(venues))
}
