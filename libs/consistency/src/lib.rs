pub mod error;
pub mod escalation;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};

use deals_api::{Subscription, SubscriptionStore, TopicMembership, TopicOutcome};

pub use error::{ConsistencyError, ConsistencyOutcome, Phase};
pub use escalation::{
    CompositeReporter, DeadLetterReporter, Escalation, EscalationReporter, LogReporter,
};

// ═══════════════════════════════════════════════════════════════
//  Token locks
// ═══════════════════════════════════════════════════════════════

/// Per-token serialization for the two-phase sequences.
///
/// Concurrent register/unregister calls for the *same* token take the
/// same lock and run one after the other; calls for different tokens do
/// not contend. The store's uniqueness constraint on the registration
/// token remains the backstop underneath.
#[derive(Default)]
struct TokenLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TokenLocks {
    async fn acquire(&self, token: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            // Drop entries nobody holds any more so the table stays
            // bounded by the number of in-flight tokens.
            map.retain(|_, l| Arc::strong_count(l) > 1);
            map.entry(token.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

// ═══════════════════════════════════════════════════════════════
//  Coordinator
// ═══════════════════════════════════════════════════════════════

fn default_service_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Subscription consistency coordinator.
///
/// Sole entry point mutating subscription state, on either side. Keeps
/// "subscription records in the store" and "subscribed tokens on the
/// notification topic" in agreement although each side fails
/// independently: the store is touched first on create and last on
/// delete, so the side mutated second — the one that may need undoing —
/// is always compensated with a same-system store delete rather than a
/// second call to the less controllable external service.
pub struct Coordinator {
    store: Arc<dyn SubscriptionStore>,
    topics: Arc<dyn TopicMembership>,
    reporter: Arc<dyn EscalationReporter>,
    topic: String,
    service_timeout: Duration,
    locks: TokenLocks,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        topics: Arc<dyn TopicMembership>,
        reporter: Arc<dyn EscalationReporter>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            store,
            topics,
            reporter,
            topic: topic.into(),
            service_timeout: default_service_timeout(),
            locks: TokenLocks::default(),
        }
    }

    /// Bound every topic service call; a timeout is a transport failure
    /// for compensation purposes.
    pub fn with_service_timeout(mut self, timeout: Duration) -> Self {
        self.service_timeout = timeout;
        self
    }

    /// Register `token`: provisional store insert, then topic subscribe,
    /// compensating the insert if the subscribe does not take.
    ///
    /// Tokens that are empty or all whitespace are rejected up front;
    /// no push provider issues such a token, so neither side is touched.
    ///
    /// `Ok(record)` is `Committed`: the token is recorded and subscribed.
    /// Every `Err` maps to an outcome via [`ConsistencyError::outcome`].
    pub async fn register(&self, token: &str) -> Result<Subscription, ConsistencyError> {
        if token.trim().is_empty() {
            return Err(ConsistencyError::Validation(
                "registration token must not be empty",
            ));
        }

        let _guard = self.locks.acquire(token).await;

        // Store first: on failure nothing external has changed and the
        // whole call is a clean abort.
        let record = self.store.insert(token).await?;

        let outcome = self.bounded(self.topics.subscribe(&[token.to_string()], &self.topic)).await;
        if outcome.applied_for(token) {
            tracing::debug!(token, record_id = record.id, topic = %self.topic, "subscription committed");
            return Ok(record);
        }

        let reason = outcome
            .failure_reason()
            .unwrap_or_else(|| "unspecified service failure".to_string());
        tracing::warn!(token, topic = %self.topic, %reason, "topic subscribe failed, compensating");

        match self.store.delete_by_token(token).await {
            Ok(()) => Err(ConsistencyError::Service {
                phase: Phase::RegisterSubscribe,
                reason,
            }),
            Err(comp) => {
                let comp = comp.to_string();
                self.reporter.escalate(&Escalation::new(
                    token,
                    Some(record.id),
                    Phase::RegisterCompensation,
                    reason.clone(),
                    Some(comp.clone()),
                ));
                Err(ConsistencyError::Inconsistent {
                    token: token.to_string(),
                    record_id: Some(record.id),
                    phase: Phase::RegisterCompensation,
                    original: reason,
                    compensation: Some(comp),
                })
            }
        }
    }

    /// Unregister `token`: topic unsubscribe first, store delete last.
    ///
    /// `Ok(())` is `Committed`: the token is gone from both sides.
    pub async fn unregister(&self, token: &str) -> Result<(), ConsistencyError> {
        if token.trim().is_empty() {
            return Err(ConsistencyError::Validation(
                "registration token must not be empty",
            ));
        }

        let _guard = self.locks.acquire(token).await;

        let outcome = self.bounded(self.topics.unsubscribe(&[token.to_string()], &self.topic)).await;
        if !outcome.applied_for(token) {
            // Store untouched: the token stays both recorded and
            // subscribed, the two sides still agree.
            let reason = outcome
                .failure_reason()
                .unwrap_or_else(|| "unspecified service failure".to_string());
            tracing::warn!(token, topic = %self.topic, %reason, "topic unsubscribe failed");
            return Err(ConsistencyError::Service {
                phase: Phase::UnregisterUnsubscribe,
                reason,
            });
        }

        match self.store.delete_by_token(token).await {
            Ok(()) => {
                tracing::debug!(token, topic = %self.topic, "subscription removed from both sides");
                Ok(())
            }
            Err(e) => {
                // Token already unsubscribed on the service side but the
                // record lingers in the store.
                let detail = e.to_string();
                self.reporter.escalate(&Escalation::new(
                    token,
                    None,
                    Phase::UnregisterDelete,
                    detail.clone(),
                    None,
                ));
                Err(ConsistencyError::Inconsistent {
                    token: token.to_string(),
                    record_id: None,
                    phase: Phase::UnregisterDelete,
                    original: detail,
                    compensation: None,
                })
            }
        }
    }

    async fn bounded(
        &self,
        call: impl std::future::Future<Output = TopicOutcome>,
    ) -> TopicOutcome {
        match tokio::time::timeout(self.service_timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => TopicOutcome::Transport {
                reason: format!("topic service call timed out after {:?}", self.service_timeout),
            },
        }
    }
}
