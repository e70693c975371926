use crate::{
    api::{auth::AppState, extract::ApiJson},
    error::Result,
    league::sets::{SetDeleted, SetRecorded, SetScore},
};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{delete, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct RecordSetRequest {
    pub match_id: i64,
    #[serde(flatten)]
    pub score: SetScore,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(record_set))
        .route("/:id", delete(delete_set))
}

async fn record_set(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<RecordSetRequest>,
) -> Result<Json<SetRecorded>> {
    let caller = state.caller(&headers)?;
    let recorded = state
        .league
        .record_set(&caller, req.match_id, req.score)
        .await?;
    Ok(Json(recorded))
}

async fn delete_set(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(set_id): Path<i64>,
) -> Result<Json<SetDeleted>> {
    state.caller(&headers)?;
    Ok(Json(state.league.delete_set(set_id).await?))
}
