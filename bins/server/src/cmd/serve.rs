use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use deals_api::{User, UserStore};
use push_fcm::FcmClient;
use rest_api::{AppState, Sessions};
use store_memory::MemoryStore;
use subscription_consistency::{
    CompositeReporter, Coordinator, DeadLetterReporter, EscalationReporter, LogReporter,
};

use crate::config::{ServeArgs, ServerConfig};
use crate::error::ServerError;

pub async fn run(args: ServeArgs) -> Result<(), ServerError> {
    tracing::info!("deals-server starting");

    // --- Load config ---
    let config = ServerConfig::load(&args.config)?;
    tracing::info!(config = %args.config, "loaded config");

    // --- CancellationToken for graceful shutdown ---
    let token = CancellationToken::new();

    // --- Store + seed users ---
    let store = Arc::new(MemoryStore::new());
    for user_cfg in &config.users {
        store
            .insert_user(User {
                id: 0,
                username: user_cfg.username.clone(),
                password_hash: user_cfg.password_hash.clone(),
            })
            .await?;
        tracing::info!(username = %user_cfg.username, "seeded admin user");
    }

    // --- Push provider client ---
    let service_timeout = Duration::from_millis(config.service_timeout_ms);
    let fcm = Arc::new(FcmClient::new(
        &config.push.base_url,
        &config.push.api_key,
        service_timeout,
    )?);
    tracing::info!(base_url = %config.push.base_url, "push client ready");

    // --- Escalation channel ---
    let reporter: Arc<dyn EscalationReporter> = match &config.escalation.dead_letter_path {
        Some(path) => {
            tracing::info!(path = %path, "escalations dead-lettered to file");
            Arc::new(CompositeReporter::new(vec![
                Box::new(LogReporter),
                Box::new(DeadLetterReporter::new(path)),
            ]))
        }
        None => Arc::new(LogReporter),
    };

    // --- Consistency coordinator ---
    let coordinator = Arc::new(
        Coordinator::new(
            store.clone(),
            fcm.clone(),
            reporter,
            config.deals_topic.clone(),
        )
        .with_service_timeout(service_timeout),
    );
    tracing::info!(topic = %config.deals_topic, "subscription coordinator ready");

    // --- REST API ---
    let state = AppState {
        store: store.clone(),
        coordinator,
        publisher: fcm,
        sessions: Arc::new(Sessions::new(Duration::from_millis(config.session_ttl_ms))),
        deals_topic: config.deals_topic.clone(),
    };

    let api_port = config.api_port;
    let api_token = token.clone();
    let api_handle = tokio::spawn(async move {
        if let Err(e) = rest_api::run(api_port, state, api_token).await {
            tracing::error!(error = %e, "api server error");
        }
    });

    tracing::info!(port = api_port, "server ready");

    // --- Wait for Ctrl+C ---
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down...");

    token.cancel();

    // Drain: give in-flight requests a moment to finish gracefully
    tokio::time::sleep(Duration::from_secs(5)).await;

    if !api_handle.is_finished() {
        api_handle.abort();
    }
    let _ = api_handle.await;

    tracing::info!("shutdown complete");
    Ok(())
}
