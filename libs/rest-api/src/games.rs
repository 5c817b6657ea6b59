use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{Value, json};

use deals_api::Game;

use crate::AppState;
use crate::auth::require_bearer;
use crate::error::ApiError;

// ═══════════════════════════════════════════════════════════════
//  REST: /api/games
// ═══════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub(crate) struct GameRequest {
    pub(crate) game: Game,
}

fn validate(game: &Game) -> Result<(), ApiError> {
    if game.name.trim().is_empty() {
        return Err(ApiError::BadRequest("game name must not be empty".into()));
    }
    Ok(())
}

pub(crate) async fn list_games(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let games = state.store.list_games().await?;
    Ok(Json(json!({ "games": games })))
}

pub(crate) async fn create_game(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<GameRequest>,
) -> Result<Json<Value>, ApiError> {
    require_bearer(&state, &headers).await?;
    validate(&req.game)?;

    let game = state.store.insert_game(req.game).await?;
    tracing::info!(id = game.id, name = %game.name, "game created");
    Ok(Json(json!({ "game": game })))
}

pub(crate) async fn update_game(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(mut req): Json<GameRequest>,
) -> Result<Json<Value>, ApiError> {
    require_bearer(&state, &headers).await?;
    validate(&req.game)?;

    req.game.id = id;
    let game = state.store.update_game(req.game).await?;
    Ok(Json(json!({ "game": game })))
}

pub(crate) async fn delete_game(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_bearer(&state, &headers).await?;

    state.store.delete_game(id).await?;
    tracing::info!(id, "game deleted");
    Ok(Json(json!({ "ok": true })))
}
