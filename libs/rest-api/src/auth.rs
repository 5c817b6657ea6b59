use std::collections::HashMap;
use std::time::Duration;

use axum::extract::State;
use axum::http::HeaderMap;
use base64::Engine;
use rand::RngCore;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use deals_api::now_ms;

use crate::AppState;
use crate::error::ApiError;

// ═══════════════════════════════════════════════════════════════
//  Sessions
// ═══════════════════════════════════════════════════════════════

struct SessionEntry {
    username: String,
    expires_ms: i64,
}

/// Bearer-token session table. Tokens are minted at login and expire
/// after the configured TTL; expiry is enforced at verification time.
pub struct Sessions {
    ttl_ms: i64,
    entries: RwLock<HashMap<String, SessionEntry>>,
}

impl Sessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl_ms: ttl.as_millis() as i64,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Mint a fresh random token for `username`.
    pub async fn mint(&self, username: &str) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes);

        let mut entries = self.entries.write().await;
        let now = now_ms();
        entries.retain(|_, e| e.expires_ms > now);
        entries.insert(
            token.clone(),
            SessionEntry {
                username: username.to_string(),
                expires_ms: now + self.ttl_ms,
            },
        );
        token
    }

    /// Resolve a token to its username, or `None` if unknown/expired.
    pub async fn verify(&self, token: &str) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .get(token)
            .filter(|e| e.expires_ms > now_ms())
            .map(|e| e.username.clone())
    }
}

/// Hex sha-256 of a password, the shape stored in the user table.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

pub fn verify_password(password: &str, stored_hex: &str) -> bool {
    // Compare digests, not strings: fixed length, no early exit on the
    // attacker-controlled side.
    let candidate = Sha256::digest(hash_password(password).as_bytes());
    let stored = Sha256::digest(stored_hex.as_bytes());
    candidate == stored
}

/// Extract and verify the `Authorization: Bearer` token; privileged
/// handlers call this first.
pub(crate) async fn require_bearer(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<String, ApiError> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;
    state.sessions.verify(token).await.ok_or(ApiError::Unauthorized)
}

// ═══════════════════════════════════════════════════════════════
//  POST /api/login
// ═══════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    username: String,
    password: String,
}

pub(crate) async fn login(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<LoginRequest>,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    let user = state
        .store
        .get_user_by_username(&req.username)
        .await
        .map_err(|e| {
            if e.is_not_found() {
                ApiError::NotFound
            } else {
                ApiError::from(e)
            }
        })?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    let token = state.sessions.mint(&user.username).await;
    tracing::info!(username = %user.username, "login");
    Ok(axum::Json(serde_json::json!({ "token": token })))
}
