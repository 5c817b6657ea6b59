use std::future::Future;
use std::pin::Pin;

use tokio::sync::RwLock;

use deals_api::{
    Deal, DealStore, Game, GameStore, StoreError, Subscription, SubscriptionStore, User, UserStore,
};

// ═══════════════════════════════════════════════════════════════
//  MemoryStore
// ═══════════════════════════════════════════════════════════════

#[derive(Default)]
struct Tables {
    games: Vec<Game>,
    deals: Vec<Deal>,
    users: Vec<User>,
    subscriptions: Vec<Subscription>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory store backend.
///
/// Uniqueness is enforced on `registration_token` and `username`, the
/// same constraints the relational schema carried. Every method is an
/// individually atomic operation under one RwLock.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubscriptionStore for MemoryStore {
    fn insert(
        &self,
        registration_token: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Subscription, StoreError>> + Send + '_>> {
        let token = registration_token.to_string();
        Box::pin(async move {
            let mut t = self.tables.write().await;
            if t.subscriptions.iter().any(|s| s.registration_token == token) {
                return Err(StoreError::Duplicate(token));
            }
            let record = Subscription {
                id: t.next_id(),
                registration_token: token,
            };
            t.subscriptions.push(record.clone());
            Ok(record)
        })
    }

    fn delete_by_token(
        &self,
        registration_token: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        let token = registration_token.to_string();
        Box::pin(async move {
            let mut t = self.tables.write().await;
            let before = t.subscriptions.len();
            t.subscriptions.retain(|s| s.registration_token != token);
            if t.subscriptions.len() == before {
                return Err(StoreError::NotFound(token));
            }
            Ok(())
        })
    }

    fn get_by_token(
        &self,
        registration_token: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Subscription, StoreError>> + Send + '_>> {
        let token = registration_token.to_string();
        Box::pin(async move {
            self.tables
                .read()
                .await
                .subscriptions
                .iter()
                .find(|s| s.registration_token == token)
                .cloned()
                .ok_or(StoreError::NotFound(token))
        })
    }
}

impl GameStore for MemoryStore {
    fn insert_game(
        &self,
        mut game: Game,
    ) -> Pin<Box<dyn Future<Output = Result<Game, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut t = self.tables.write().await;
            game.id = t.next_id();
            t.games.push(game.clone());
            Ok(game)
        })
    }

    fn update_game(
        &self,
        game: Game,
    ) -> Pin<Box<dyn Future<Output = Result<Game, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut t = self.tables.write().await;
            match t.games.iter_mut().find(|g| g.id == game.id) {
                Some(existing) => {
                    *existing = game.clone();
                    Ok(game)
                }
                None => Err(StoreError::NotFound(format!("game {}", game.id))),
            }
        })
    }

    fn delete_game(
        &self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut t = self.tables.write().await;
            let before = t.games.len();
            t.games.retain(|g| g.id != id);
            if t.games.len() == before {
                return Err(StoreError::NotFound(format!("game {id}")));
            }
            Ok(())
        })
    }

    fn get_game(
        &self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Game, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.tables
                .read()
                .await
                .games
                .iter()
                .find(|g| g.id == id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("game {id}")))
        })
    }

    fn list_games(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Game>, StoreError>> + Send + '_>> {
        Box::pin(async move { Ok(self.tables.read().await.games.clone()) })
    }
}

impl DealStore for MemoryStore {
    fn insert_deal(
        &self,
        mut deal: Deal,
    ) -> Pin<Box<dyn Future<Output = Result<Deal, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut t = self.tables.write().await;
            if !t.games.iter().any(|g| g.id == deal.game_id) {
                return Err(StoreError::NotFound(format!("game {}", deal.game_id)));
            }
            deal.id = t.next_id();
            t.deals.push(deal.clone());
            Ok(deal)
        })
    }

    fn update_deal(
        &self,
        deal: Deal,
    ) -> Pin<Box<dyn Future<Output = Result<Deal, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut t = self.tables.write().await;
            match t.deals.iter_mut().find(|d| d.id == deal.id) {
                Some(existing) => {
                    *existing = deal.clone();
                    Ok(deal)
                }
                None => Err(StoreError::NotFound(format!("deal {}", deal.id))),
            }
        })
    }

    fn delete_deal(
        &self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut t = self.tables.write().await;
            let before = t.deals.len();
            t.deals.retain(|d| d.id != id);
            if t.deals.len() == before {
                return Err(StoreError::NotFound(format!("deal {id}")));
            }
            Ok(())
        })
    }

    fn get_deal(
        &self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Deal, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.tables
                .read()
                .await
                .deals
                .iter()
                .find(|d| d.id == id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("deal {id}")))
        })
    }

    fn list_deals(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Deal>, StoreError>> + Send + '_>> {
        Box::pin(async move { Ok(self.tables.read().await.deals.clone()) })
    }
}

impl UserStore for MemoryStore {
    fn insert_user(
        &self,
        mut user: User,
    ) -> Pin<Box<dyn Future<Output = Result<User, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut t = self.tables.write().await;
            if t.users.iter().any(|u| u.username == user.username) {
                return Err(StoreError::Duplicate(user.username));
            }
            user.id = t.next_id();
            t.users.push(user.clone());
            Ok(user)
        })
    }

    fn get_user_by_username(
        &self,
        username: &str,
    ) -> Pin<Box<dyn Future<Output = Result<User, StoreError>> + Send + '_>> {
        let username = username.to_string();
        Box::pin(async move {
            self.tables
                .read()
                .await
                .users
                .iter()
                .find(|u| u.username == username)
                .cloned()
                .ok_or(StoreError::NotFound(username))
        })
    }
}
