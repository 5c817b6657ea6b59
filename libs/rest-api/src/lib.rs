pub mod auth;
pub mod error;

mod deals;
mod games;
mod subscriptions;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use tokio_util::sync::CancellationToken;

use deals_api::{PushPublisher, Store};
use subscription_consistency::Coordinator;

pub use auth::{Sessions, hash_password};
pub use error::ApiError;

// ═══════════════════════════════════════════════════════════════
//  AppState / Router
// ═══════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub coordinator: Arc<Coordinator>,
    pub publisher: Arc<dyn PushPublisher>,
    pub sessions: Arc<Sessions>,
    /// Topic new-deal notifications are published to.
    pub deals_topic: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/login", post(auth::login))
        .route("/api/games", get(games::list_games).post(games::create_game))
        .route(
            "/api/games/{id}",
            put(games::update_game).delete(games::delete_game),
        )
        .route("/api/deals", get(deals::list_deals).post(deals::create_deal))
        .route(
            "/api/deals/{id}",
            put(deals::update_deal).delete(deals::delete_deal),
        )
        .route("/api/deals/{id}/publish", post(deals::publish_deal))
        .route("/api/subscriptions", post(subscriptions::register))
        .route(
            "/api/subscriptions/{registration_token}",
            get(subscriptions::get_subscription).delete(subscriptions::unregister),
        )
        .with_state(state)
}

/// Serve the REST API until `shutdown` fires.
pub async fn run(
    port: u16,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), String> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|e| format!("bind api :{port}: {e}"))?;
    tracing::info!(port, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| format!("axum serve: {e}"))?;

    Ok(())
}
