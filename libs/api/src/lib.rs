pub mod error;
pub mod push;
pub mod store;
pub mod types;

pub use error::{PushError, StoreError};
pub use push::{PushMessage, PushPublisher, TokenError, TopicMembership, TopicOutcome};
pub use store::{DealStore, GameStore, Store, SubscriptionStore, UserStore};
pub use types::{Deal, Game, Subscription, User};

/// Current Unix time in milliseconds.
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
