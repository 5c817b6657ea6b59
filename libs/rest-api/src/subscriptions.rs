use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::AppState;
use crate::error::ApiError;

// ═══════════════════════════════════════════════════════════════
//  REST: /api/subscriptions
// ═══════════════════════════════════════════════════════════════
//
// These endpoints change state in two places — the store and the push
// provider's topic — so they go through the consistency coordinator
// instead of the store directly. Unauthenticated on purpose: devices
// subscribe themselves.

#[derive(Deserialize)]
pub(crate) struct SubscribeRequest {
    pub(crate) subscription: SubscriptionBody,
}

#[derive(Deserialize)]
pub(crate) struct SubscriptionBody {
    pub(crate) registration_token: String,
}

pub(crate) async fn register(
    State(state): State<AppState>,
    Json(req): Json<SubscribeRequest>,
) -> Result<Json<Value>, ApiError> {
    let record = state
        .coordinator
        .register(&req.subscription.registration_token)
        .await?;
    Ok(Json(json!({ "subscription": record })))
}

pub(crate) async fn get_subscription(
    State(state): State<AppState>,
    Path(registration_token): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let record = state.store.get_by_token(&registration_token).await?;
    Ok(Json(json!({ "subscription": record })))
}

pub(crate) async fn unregister(
    State(state): State<AppState>,
    Path(registration_token): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.coordinator.unregister(&registration_token).await?;
    Ok(Json(json!({ "ok": true })))
}
