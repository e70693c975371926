use crate::{
    api::auth::AppState,
    error::Result,
    league::ranking::{Qualifier, StandingRow},
};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/level/:id", get(level_standings))
        .route("/level/:id/recompute", post(recompute_standings))
        .route("/group-winners/:parent_id", get(group_winners))
}

async fn level_standings(
    State(state): State<Arc<AppState>>,
    Path(level_id): Path<i64>,
) -> Result<Json<Vec<StandingRow>>> {
    Ok(Json(state.league.standings(level_id).await?))
}

async fn group_winners(
    State(state): State<Arc<AppState>>,
    Path(parent_id): Path<i64>,
) -> Result<Json<Vec<Qualifier>>> {
    Ok(Json(state.league.group_winners(parent_id).await?))
}

/// Administrative rebuild of a level's table from its finalized matches
async fn recompute_standings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(level_id): Path<i64>,
) -> Result<Json<Vec<StandingRow>>> {
    let caller = state.caller(&headers)?;
    caller.require_admin()?;
    Ok(Json(state.league.recompute_level(level_id).await?))
}
