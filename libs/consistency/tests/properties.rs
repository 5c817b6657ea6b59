//! Register/unregister consistency properties, driven through scripted
//! store and topic-service doubles with call counting.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use deals_api::{
    StoreError, Subscription, SubscriptionStore, TokenError, TopicMembership, TopicOutcome,
};
use subscription_consistency::{
    ConsistencyError, ConsistencyOutcome, Coordinator, Escalation, EscalationReporter,
};

const TOPIC: &str = "deals";

// ═══════════════════════════════════════════════════════════════
//  Doubles
// ═══════════════════════════════════════════════════════════════

#[derive(Default)]
struct StoreDouble {
    records: StdMutex<HashMap<String, Subscription>>,
    next_id: AtomicUsize,
    fail_delete: StdMutex<Option<String>>,
    insert_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl StoreDouble {
    fn fail_next_delete(&self, reason: &str) {
        *self.fail_delete.lock().unwrap() = Some(reason.to_string());
    }
}

impl SubscriptionStore for StoreDouble {
    fn insert(
        &self,
        registration_token: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Subscription, StoreError>> + Send + '_>> {
        let token = registration_token.to_string();
        Box::pin(async move {
            self.insert_calls.fetch_add(1, Ordering::SeqCst);
            let mut records = self.records.lock().unwrap();
            if records.contains_key(&token) {
                return Err(StoreError::Duplicate(token));
            }
            let record = Subscription {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1,
                registration_token: token.clone(),
            };
            records.insert(token, record.clone());
            Ok(record)
        })
    }

    fn delete_by_token(
        &self,
        registration_token: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        let token = registration_token.to_string();
        Box::pin(async move {
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(reason) = self.fail_delete.lock().unwrap().take() {
                return Err(StoreError::Backend(reason));
            }
            match self.records.lock().unwrap().remove(&token) {
                Some(_) => Ok(()),
                None => Err(StoreError::NotFound(token)),
            }
        })
    }

    fn get_by_token(
        &self,
        registration_token: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Subscription, StoreError>> + Send + '_>> {
        let token = registration_token.to_string();
        Box::pin(async move {
            self.records
                .lock()
                .unwrap()
                .get(&token)
                .cloned()
                .ok_or(StoreError::NotFound(token))
        })
    }
}

/// Topic service double: membership set plus scripted next outcomes.
#[derive(Default)]
struct TopicDouble {
    members: StdMutex<Vec<String>>,
    next_subscribe: StdMutex<Option<TopicOutcome>>,
    next_unsubscribe: StdMutex<Option<TopicOutcome>>,
    subscribe_calls: AtomicUsize,
    unsubscribe_calls: AtomicUsize,
}

impl TopicDouble {
    fn fail_subscribe(&self, outcome: TopicOutcome) {
        *self.next_subscribe.lock().unwrap() = Some(outcome);
    }

    fn fail_unsubscribe(&self, outcome: TopicOutcome) {
        *self.next_unsubscribe.lock().unwrap() = Some(outcome);
    }

    fn is_member(&self, token: &str) -> bool {
        self.members.lock().unwrap().iter().any(|t| t == token)
    }
}

impl TopicMembership for TopicDouble {
    fn subscribe(
        &self,
        tokens: &[String],
        _topic: &str,
    ) -> Pin<Box<dyn Future<Output = TopicOutcome> + Send + '_>> {
        let tokens = tokens.to_vec();
        Box::pin(async move {
            self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(outcome) = self.next_subscribe.lock().unwrap().take() {
                return outcome;
            }
            self.members.lock().unwrap().extend(tokens);
            TopicOutcome::Applied
        })
    }

    fn unsubscribe(
        &self,
        tokens: &[String],
        _topic: &str,
    ) -> Pin<Box<dyn Future<Output = TopicOutcome> + Send + '_>> {
        let tokens = tokens.to_vec();
        Box::pin(async move {
            self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(outcome) = self.next_unsubscribe.lock().unwrap().take() {
                return outcome;
            }
            self.members.lock().unwrap().retain(|t| !tokens.contains(t));
            TopicOutcome::Applied
        })
    }
}

#[derive(Default)]
struct ReporterDouble {
    escalations: StdMutex<Vec<Escalation>>,
}

impl EscalationReporter for ReporterDouble {
    fn escalate(&self, escalation: &Escalation) {
        self.escalations.lock().unwrap().push(escalation.clone());
    }
}

struct Fixture {
    store: Arc<StoreDouble>,
    topics: Arc<TopicDouble>,
    reporter: Arc<ReporterDouble>,
    coordinator: Coordinator,
}

fn fixture() -> Fixture {
    let store = Arc::new(StoreDouble::default());
    let topics = Arc::new(TopicDouble::default());
    let reporter = Arc::new(ReporterDouble::default());
    let coordinator = Coordinator::new(
        store.clone(),
        topics.clone(),
        reporter.clone(),
        TOPIC,
    );
    Fixture {
        store,
        topics,
        reporter,
        coordinator,
    }
}

// ═══════════════════════════════════════════════════════════════
//  P1–P5
// ═══════════════════════════════════════════════════════════════

#[tokio::test]
async fn p1_commit_records_and_subscribes() {
    let f = fixture();

    let record = f.coordinator.register("tok-p1").await.unwrap();
    assert_eq!(record.registration_token, "tok-p1");

    assert!(f.store.get_by_token("tok-p1").await.is_ok());
    assert!(f.topics.is_member("tok-p1"));
}

#[tokio::test]
async fn p2_subscribe_failure_rolls_back_the_insert() {
    let f = fixture();
    f.topics.fail_subscribe(TopicOutcome::PerToken {
        errors: vec![TokenError {
            token: "tok-p2".into(),
            reason: "invalid registration".into(),
        }],
    });

    let err = f.coordinator.register("tok-p2").await.unwrap_err();
    assert_eq!(err.outcome(), ConsistencyOutcome::RolledBack);
    assert!(matches!(err, ConsistencyError::Service { .. }));

    let lookup = f.store.get_by_token("tok-p2").await.unwrap_err();
    assert!(lookup.is_not_found());
}

#[tokio::test]
async fn p3_double_failure_escalates_exactly_once() {
    let f = fixture();
    f.topics.fail_subscribe(TopicOutcome::Transport {
        reason: "connection reset".into(),
    });
    f.store.fail_next_delete("store offline");

    let err = f.coordinator.register("tok-p3").await.unwrap_err();
    assert_eq!(err.outcome(), ConsistencyOutcome::Inconsistent);

    let escalations = f.reporter.escalations.lock().unwrap();
    assert_eq!(escalations.len(), 1);
    assert_eq!(escalations[0].token, "tok-p3");
    assert!(escalations[0].record_id.is_some());
    assert!(escalations[0].original.contains("connection reset"));
    assert_eq!(
        escalations[0].compensation.as_deref(),
        Some("store backend: store offline")
    );
}

#[tokio::test]
async fn p4_unregister_removes_both_sides() {
    let f = fixture();
    f.coordinator.register("tok-p4").await.unwrap();

    f.coordinator.unregister("tok-p4").await.unwrap();

    assert!(f.store.get_by_token("tok-p4").await.unwrap_err().is_not_found());
    assert!(!f.topics.is_member("tok-p4"));
}

#[tokio::test]
async fn p5_unsubscribe_failure_leaves_store_untouched() {
    let f = fixture();
    f.coordinator.register("tok-p5").await.unwrap();

    f.topics.fail_unsubscribe(TopicOutcome::Transport {
        reason: "gateway timeout".into(),
    });

    let err = f.coordinator.unregister("tok-p5").await.unwrap_err();
    assert_eq!(err.outcome(), ConsistencyOutcome::RolledBack);
    assert!(matches!(err, ConsistencyError::Service { .. }));

    // Still recorded, still subscribed: the sides agree.
    assert!(f.store.get_by_token("tok-p5").await.is_ok());
    assert!(f.topics.is_member("tok-p5"));
}

// ═══════════════════════════════════════════════════════════════
//  End-to-end scenarios
// ═══════════════════════════════════════════════════════════════

#[tokio::test]
async fn scenario_a_commit_then_lookup() {
    let f = fixture();

    let record = f.coordinator.register("tok-1").await.unwrap();

    let found = f.store.get_by_token("tok-1").await.unwrap();
    assert_eq!(found, record);
}

#[tokio::test]
async fn scenario_b_zero_success_count_rolls_back() {
    let f = fixture();
    // Delivered response, nothing applied.
    f.topics.fail_subscribe(TopicOutcome::PerToken {
        errors: vec![TokenError {
            token: "tok-2".into(),
            reason: "NOT_FOUND".into(),
        }],
    });

    let err = f.coordinator.register("tok-2").await.unwrap_err();
    assert_eq!(err.outcome(), ConsistencyOutcome::RolledBack);
    assert!(f.store.get_by_token("tok-2").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn scenario_c_failed_compensation_reaches_the_escalation_log() {
    let f = fixture();
    f.topics.fail_subscribe(TopicOutcome::Transport {
        reason: "tls handshake".into(),
    });
    f.store.fail_next_delete("lock wait timeout");

    let err = f.coordinator.register("tok-3").await.unwrap_err();
    assert_eq!(err.outcome(), ConsistencyOutcome::Inconsistent);
    assert!(err.to_string().contains("tok-3"));

    let escalations = f.reporter.escalations.lock().unwrap();
    assert_eq!(escalations.len(), 1);
    assert_eq!(escalations[0].token, "tok-3");
}

#[tokio::test]
async fn scenario_d_empty_token_touches_nothing() {
    let f = fixture();

    let err = f.coordinator.register("").await.unwrap_err();
    assert!(matches!(err, ConsistencyError::Validation(_)));
    assert_eq!(err.outcome(), ConsistencyOutcome::RolledBack);

    let err = f.coordinator.unregister("").await.unwrap_err();
    assert!(matches!(err, ConsistencyError::Validation(_)));

    // All-whitespace counts as empty.
    let err = f.coordinator.register("  \t").await.unwrap_err();
    assert!(matches!(err, ConsistencyError::Validation(_)));

    assert_eq!(f.store.insert_calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.store.delete_calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.topics.subscribe_calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.topics.unsubscribe_calls.load(Ordering::SeqCst), 0);
}

// ═══════════════════════════════════════════════════════════════
//  Edge behavior
// ═══════════════════════════════════════════════════════════════

#[tokio::test]
async fn duplicate_registration_is_a_clean_store_error() {
    let f = fixture();
    f.coordinator.register("tok-dup").await.unwrap();

    let err = f.coordinator.register("tok-dup").await.unwrap_err();
    assert!(matches!(
        err,
        ConsistencyError::Store(StoreError::Duplicate(_))
    ));
    // Only the first registration reached the service.
    assert_eq!(f.topics.subscribe_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unregister_of_unknown_token_after_unsubscribe_is_inconsistent() {
    let f = fixture();

    // Never registered: unsubscribe succeeds (provider treats it as a
    // no-op), store delete affects zero rows. The two sides genuinely
    // disagree about nothing, but the coordinator cannot tell "was never
    // there" from "failed to remove" and must say so loudly.
    let err = f.coordinator.unregister("tok-ghost").await.unwrap_err();
    assert_eq!(err.outcome(), ConsistencyOutcome::Inconsistent);
    assert_eq!(f.reporter.escalations.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn service_timeout_is_a_transport_failure_and_rolls_back() {
    struct StallingTopics;
    impl TopicMembership for StallingTopics {
        fn subscribe(
            &self,
            _tokens: &[String],
            _topic: &str,
        ) -> Pin<Box<dyn Future<Output = TopicOutcome> + Send + '_>> {
            Box::pin(async {
                std::future::pending::<()>().await;
                unreachable!()
            })
        }
        fn unsubscribe(
            &self,
            _tokens: &[String],
            _topic: &str,
        ) -> Pin<Box<dyn Future<Output = TopicOutcome> + Send + '_>> {
            Box::pin(async { TopicOutcome::Applied })
        }
    }

    let store = Arc::new(StoreDouble::default());
    let reporter = Arc::new(ReporterDouble::default());
    let coordinator = Coordinator::new(
        store.clone(),
        Arc::new(StallingTopics),
        reporter.clone(),
        TOPIC,
    )
    .with_service_timeout(std::time::Duration::from_millis(20));

    let err = coordinator.register("tok-slow").await.unwrap_err();
    assert_eq!(err.outcome(), ConsistencyOutcome::RolledBack);
    assert!(err.to_string().contains("timed out"));
    assert!(store.get_by_token("tok-slow").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn concurrent_same_token_registrations_commit_exactly_one() {
    let f = fixture();
    let coordinator = Arc::new(f.coordinator);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let c = coordinator.clone();
        handles.push(tokio::spawn(async move { c.register("tok-race").await }));
    }

    let mut committed = 0;
    let mut duplicates = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => committed += 1,
            Err(ConsistencyError::Store(StoreError::Duplicate(_))) => duplicates += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(committed, 1);
    assert_eq!(duplicates, 7);
    assert!(f.topics.is_member("tok-race"));
}
