use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{Value, json};

use deals_api::{Deal, PushMessage, now_ms};

use crate::AppState;
use crate::auth::require_bearer;
use crate::error::ApiError;

// ═══════════════════════════════════════════════════════════════
//  REST: /api/deals
// ═══════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub(crate) struct DealRequest {
    pub(crate) deal: Deal,
}

fn validate(deal: &Deal) -> Result<(), ApiError> {
    if deal.title.trim().is_empty() {
        return Err(ApiError::BadRequest("deal title must not be empty".into()));
    }
    if deal.link.trim().is_empty() {
        return Err(ApiError::BadRequest("deal link must not be empty".into()));
    }
    if deal.price < 0.0 {
        return Err(ApiError::BadRequest("deal price must not be negative".into()));
    }
    Ok(())
}

pub(crate) async fn list_deals(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let deals = state.store.list_deals().await?;
    Ok(Json(json!({ "deals": deals })))
}

pub(crate) async fn create_deal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut req): Json<DealRequest>,
) -> Result<Json<Value>, ApiError> {
    require_bearer(&state, &headers).await?;
    validate(&req.deal)?;

    // Deals are created unpublished; only the publish endpoint sets this.
    req.deal.published_ms = None;
    let deal = state.store.insert_deal(req.deal).await?;
    tracing::info!(id = deal.id, game_id = deal.game_id, "deal created");
    Ok(Json(json!({ "deal": deal })))
}

pub(crate) async fn update_deal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(mut req): Json<DealRequest>,
) -> Result<Json<Value>, ApiError> {
    require_bearer(&state, &headers).await?;
    validate(&req.deal)?;

    req.deal.id = id;
    let deal = state.store.update_deal(req.deal).await?;
    Ok(Json(json!({ "deal": deal })))
}

pub(crate) async fn delete_deal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_bearer(&state, &headers).await?;

    state.store.delete_deal(id).await?;
    tracing::info!(id, "deal deleted");
    Ok(Json(json!({ "ok": true })))
}

// ═══════════════════════════════════════════════════════════════
//  REST: POST /api/deals/{id}/publish
// ═══════════════════════════════════════════════════════════════

/// Push the new-deal notification to every subscribed device, then mark
/// the deal published. A deal is published at most once.
pub(crate) async fn publish_deal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_bearer(&state, &headers).await?;

    let mut deal = state.store.get_deal(id).await?;
    if deal.published_ms.is_some() {
        return Err(ApiError::Conflict("deal already published".into()));
    }
    let game = state.store.get_game(deal.game_id).await?;

    let message = PushMessage {
        title: deal.title.clone(),
        body: format!("New deal on {}!", game.name),
        link: deal.link.clone(),
        deal_id: deal.id,
    };
    state.publisher.publish(&state.deals_topic, &message).await?;

    deal.published_ms = Some(now_ms());
    let deal = state.store.update_deal(deal).await?;
    tracing::info!(id = deal.id, topic = %state.deals_topic, "deal published");
    Ok(Json(json!({ "deal": deal })))
}
