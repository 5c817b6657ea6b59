use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::PushError;

// ════════════════════════════════════════════════════════════════
//  Topic membership
// ════════════════════════════════════════════════════════════════

/// Per-token failure inside an otherwise delivered batch call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenError {
    pub token: String,
    pub reason: String,
}

/// Normalized outcome of a batch subscribe/unsubscribe call.
///
/// The provider can fail transport-wide (network, auth) or per token
/// inside a delivered response. Callers must treat both the same way for
/// an affected token: "did not succeed", so adapters collapse the two
/// shapes into one type and downstream logic is a plain match.
#[derive(Debug, Clone, PartialEq)]
pub enum TopicOutcome {
    /// Every token in the batch was applied.
    Applied,
    /// The call was delivered but some tokens were rejected.
    PerToken { errors: Vec<TokenError> },
    /// The call never produced a usable response.
    Transport { reason: String },
}

impl TopicOutcome {
    /// Whether `token` came out of the call subscribed/unsubscribed.
    pub fn applied_for(&self, token: &str) -> bool {
        match self {
            TopicOutcome::Applied => true,
            TopicOutcome::PerToken { errors } => !errors.iter().any(|e| e.token == token),
            TopicOutcome::Transport { .. } => false,
        }
    }

    /// Human-readable failure description for logs and escalations.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            TopicOutcome::Applied => None,
            TopicOutcome::PerToken { errors } => Some(
                errors
                    .iter()
                    .map(|e| format!("{}: {}", e.token, e.reason))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            TopicOutcome::Transport { reason } => Some(reason.clone()),
        }
    }
}

/// Membership management on a named notification topic.
///
/// Both calls are infallible at the type level: every failure mode is a
/// `TopicOutcome` variant, never an `Err`.
pub trait TopicMembership: Send + Sync {
    fn subscribe(
        &self,
        tokens: &[String],
        topic: &str,
    ) -> Pin<Box<dyn Future<Output = TopicOutcome> + Send + '_>>;

    fn unsubscribe(
        &self,
        tokens: &[String],
        topic: &str,
    ) -> Pin<Box<dyn Future<Output = TopicOutcome> + Send + '_>>;
}

// ════════════════════════════════════════════════════════════════
//  Publishing
// ════════════════════════════════════════════════════════════════

/// Notification published to every device on a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    /// Link opened when the notification is activated.
    pub link: String,
    /// Deal the notification announces.
    pub deal_id: i64,
}

/// Send a message to all subscribers of a topic.
pub trait PushPublisher: Send + Sync {
    fn publish(
        &self,
        topic: &str,
        message: &PushMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), PushError>> + Send + '_>>;
}
