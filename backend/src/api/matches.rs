use crate::{
    api::{auth::AppState, extract::ApiJson},
    db::models::{Match, Role},
    error::Result,
    league::{
        fixtures::FixtureReport,
        results::{parse_side, CommittedResult},
        schedule::{MatchListing, MatchUpdate, NewMatch},
        sets::SetScore,
    },
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct FixtureRequest {
    pub level_id: i64,
    pub team_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct WalkoverRequest {
    /// `a` or `b`
    pub absent_side: String,
}

#[derive(Debug, Deserialize)]
pub struct FullResultRequest {
    pub sets: Vec<SetScore>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_match))
        .route("/fixture", post(generate_fixture))
        .route("/level/:id", get(list_level_matches))
        .route("/mine", get(my_matches))
        .route("/mine/dates", get(my_match_dates))
        .route("/delegate", get(delegate_matches))
        .route("/:id", put(update_match).delete(delete_match))
        .route("/:id/walkover", post(mark_walkover))
        .route("/:id/result", post(commit_result))
}

async fn create_match(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<NewMatch>,
) -> Result<(StatusCode, Json<Match>)> {
    state.caller(&headers)?;
    let created = state.league.create_match(req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn generate_fixture(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<FixtureRequest>,
) -> Result<(StatusCode, Json<FixtureReport>)> {
    let caller = state.caller(&headers)?;
    let report = state
        .league
        .generate_fixture(&caller, req.level_id, &req.team_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

async fn list_level_matches(
    State(state): State<Arc<AppState>>,
    Path(level_id): Path<i64>,
) -> Result<Json<Vec<MatchListing>>> {
    Ok(Json(state.league.level_matches(level_id).await?))
}

async fn my_matches(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<MatchListing>>> {
    let caller = state.caller(&headers)?;
    caller.require_role(&[Role::Referee])?;
    Ok(Json(state.league.referee_matches(&caller).await?))
}

/// Calendar days with assigned matches
async fn my_match_dates(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<String>>> {
    let caller = state.caller(&headers)?;
    caller.require_role(&[Role::Referee])?;
    Ok(Json(state.league.referee_match_dates(&caller).await?))
}

async fn delegate_matches(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<MatchListing>>> {
    let caller = state.caller(&headers)?;
    caller.require_role(&[Role::Delegate])?;
    Ok(Json(state.league.delegate_matches(&caller).await?))
}

async fn update_match(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(match_id): Path<i64>,
    ApiJson(req): ApiJson<MatchUpdate>,
) -> Result<Json<Match>> {
    state.caller(&headers)?;
    Ok(Json(state.league.update_match(match_id, req).await?))
}

async fn delete_match(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(match_id): Path<i64>,
) -> Result<Json<Match>> {
    state.caller(&headers)?;
    Ok(Json(state.league.delete_match(match_id).await?))
}

async fn mark_walkover(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(match_id): Path<i64>,
    ApiJson(req): ApiJson<WalkoverRequest>,
) -> Result<Json<CommittedResult>> {
    let caller = state.caller(&headers)?;
    let absent = parse_side(&req.absent_side)?;
    Ok(Json(state.league.mark_walkover(&caller, match_id, absent).await?))
}

async fn commit_result(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(match_id): Path<i64>,
    ApiJson(req): ApiJson<FullResultRequest>,
) -> Result<Json<CommittedResult>> {
    let caller = state.caller(&headers)?;
    caller.require_admin()?;
    Ok(Json(
        state
            .league
            .commit_full_result(&caller, match_id, req.sets)
            .await?,
    ))
}
