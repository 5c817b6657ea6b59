use std::future::Future;
use std::pin::Pin;

use crate::error::StoreError;
use crate::types::{Deal, Game, Subscription, User};

// ════════════════════════════════════════════════════════════════
//  Store traits
// ════════════════════════════════════════════════════════════════
//
// Dyn-compatible async traits: methods return boxed futures so backends
// can live in separate crates without this crate depending on a runtime.
// Each individual insert/delete/update is atomic; multi-step sequences
// across the store and external services are the consistency layer's job.

/// Persistence for subscription records, keyed by registration token.
pub trait SubscriptionStore: Send + Sync {
    /// Insert a new record for `registration_token`.
    /// An existing record with the same token is `StoreError::Duplicate`.
    fn insert(
        &self,
        registration_token: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Subscription, StoreError>> + Send + '_>>;

    /// Delete the record holding `registration_token`.
    /// Zero rows affected is `StoreError::NotFound`.
    fn delete_by_token(
        &self,
        registration_token: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>>;

    fn get_by_token(
        &self,
        registration_token: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Subscription, StoreError>> + Send + '_>>;
}

/// Persistence for games.
pub trait GameStore: Send + Sync {
    fn insert_game(
        &self,
        game: Game,
    ) -> Pin<Box<dyn Future<Output = Result<Game, StoreError>> + Send + '_>>;

    fn update_game(
        &self,
        game: Game,
    ) -> Pin<Box<dyn Future<Output = Result<Game, StoreError>> + Send + '_>>;

    fn delete_game(
        &self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>>;

    fn get_game(
        &self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Game, StoreError>> + Send + '_>>;

    fn list_games(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Game>, StoreError>> + Send + '_>>;
}

/// Persistence for deals.
pub trait DealStore: Send + Sync {
    fn insert_deal(
        &self,
        deal: Deal,
    ) -> Pin<Box<dyn Future<Output = Result<Deal, StoreError>> + Send + '_>>;

    fn update_deal(
        &self,
        deal: Deal,
    ) -> Pin<Box<dyn Future<Output = Result<Deal, StoreError>> + Send + '_>>;

    fn delete_deal(
        &self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>>;

    fn get_deal(
        &self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Deal, StoreError>> + Send + '_>>;

    fn list_deals(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Deal>, StoreError>> + Send + '_>>;
}

/// Persistence for administrative users.
pub trait UserStore: Send + Sync {
    fn insert_user(
        &self,
        user: User,
    ) -> Pin<Box<dyn Future<Output = Result<User, StoreError>> + Send + '_>>;

    fn get_user_by_username(
        &self,
        username: &str,
    ) -> Pin<Box<dyn Future<Output = Result<User, StoreError>> + Send + '_>>;
}

/// Full backend: everything the server wires together.
pub trait Store: SubscriptionStore + GameStore + DealStore + UserStore {}

impl<T: SubscriptionStore + GameStore + DealStore + UserStore> Store for T {}
