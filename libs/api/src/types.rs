use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════
//  Catalog entities
// ════════════════════════════════════════════════════════════════

/// A video game deals are tracked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    /// Store-assigned identifier. Zero on create requests.
    #[serde(default)]
    pub id: i64,
    pub name: String,
}

/// A discount deal on a game.
///
/// Timestamps are Unix epoch milliseconds. `published_ms` is set once,
/// when the deal notification goes out, and never cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    #[serde(default)]
    pub id: i64,
    pub game_id: i64,
    pub title: String,
    pub start_ms: i64,
    #[serde(default)]
    pub end_ms: Option<i64>,
    #[serde(default)]
    pub published_ms: Option<i64>,
    /// Price with the deal applied, 0 if free.
    pub price: f64,
    /// Link to the deal page.
    pub link: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ════════════════════════════════════════════════════════════════
//  Users
// ════════════════════════════════════════════════════════════════

/// An administrative user allowed to mutate the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    pub username: String,
    /// Hex-encoded password digest. Never serialized into responses.
    #[serde(skip_serializing)]
    pub password_hash: String,
}

// ════════════════════════════════════════════════════════════════
//  Subscriptions
// ════════════════════════════════════════════════════════════════

/// A device subscribed to new-deal notifications.
///
/// A persisted record means the registration token is a member of the
/// notification topic — or the mismatch was surfaced loudly as a
/// consistency failure. Records are all-or-nothing: created provisionally
/// by register, removed by unregister or by compensation, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Store-assigned identifier, immutable after creation.
    #[serde(default)]
    pub id: i64,
    /// Device identity on the push provider. Unique across records.
    pub registration_token: String,
}
