use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use deals_api::{
    PushError, PushMessage, PushPublisher, TokenError, TopicMembership, TopicOutcome,
};

// ═══════════════════════════════════════════════════════════════
//  FcmClient
// ═══════════════════════════════════════════════════════════════

/// Topic membership + publishing over the push provider's HTTP API.
///
/// Batch membership calls go to `iid/v1:batchAdd` / `iid/v1:batchRemove`;
/// topic sends go to `fcm/send`. The provider reports per-token results
/// as an ordered `results` array of empty-or-error objects, and may also
/// fail transport-wide; both shapes collapse into [`TopicOutcome`].
pub struct FcmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FcmClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, PushError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PushError::Transport(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn batch(&self, endpoint: &str, tokens: Vec<String>, topic: String) -> TopicOutcome {
        let body = serde_json::json!({
            "to": format!("/topics/{topic}"),
            "registration_tokens": tokens,
        });

        let resp = self
            .http
            .post(format!("{}/iid/v1:{endpoint}", self.base_url))
            .header("Authorization", format!("key={}", self.api_key))
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => {
                return TopicOutcome::Transport {
                    reason: format!("{endpoint} request: {e}"),
                };
            }
        };

        let status = resp.status();
        let text = match resp.text().await {
            Ok(t) => t,
            Err(e) => {
                return TopicOutcome::Transport {
                    reason: format!("{endpoint} read: {e}"),
                };
            }
        };

        normalize_batch_response(&tokens, status.as_u16(), &text)
    }
}

/// Map a delivered batch response onto the normalized outcome.
///
/// Non-2xx is transport-wide. A 2xx body carries `results`, one object
/// per requested token in order; an empty object means success, an
/// `error` field names the per-token failure. A malformed body counts as
/// transport failure, the tokens' state is unknown.
fn normalize_batch_response(tokens: &[String], status: u16, body: &str) -> TopicOutcome {
    if !(200..300).contains(&status) {
        return TopicOutcome::Transport {
            reason: format!("status {status}: {body}"),
        };
    }

    let parsed: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            return TopicOutcome::Transport {
                reason: format!("malformed response: {e}"),
            };
        }
    };

    let results = match parsed.get("results").and_then(|r| r.as_array()) {
        Some(r) if r.len() == tokens.len() => r,
        _ => {
            return TopicOutcome::Transport {
                reason: "response results do not match request tokens".to_string(),
            };
        }
    };

    let errors: Vec<TokenError> = tokens
        .iter()
        .zip(results)
        .filter_map(|(token, result)| {
            result.get("error").and_then(|e| e.as_str()).map(|reason| TokenError {
                token: token.clone(),
                reason: reason.to_string(),
            })
        })
        .collect();

    if errors.is_empty() {
        TopicOutcome::Applied
    } else {
        TopicOutcome::PerToken { errors }
    }
}

impl TopicMembership for FcmClient {
    fn subscribe(
        &self,
        tokens: &[String],
        topic: &str,
    ) -> Pin<Box<dyn Future<Output = TopicOutcome> + Send + '_>> {
        let tokens = tokens.to_vec();
        let topic = topic.to_string();
        Box::pin(self.batch("batchAdd", tokens, topic))
    }

    fn unsubscribe(
        &self,
        tokens: &[String],
        topic: &str,
    ) -> Pin<Box<dyn Future<Output = TopicOutcome> + Send + '_>> {
        let tokens = tokens.to_vec();
        let topic = topic.to_string();
        Box::pin(self.batch("batchRemove", tokens, topic))
    }
}

impl PushPublisher for FcmClient {
    fn publish(
        &self,
        topic: &str,
        message: &PushMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), PushError>> + Send + '_>> {
        let topic = topic.to_string();
        let message = message.clone();
        Box::pin(async move {
            let body = serde_json::json!({
                "to": format!("/topics/{topic}"),
                "webpush": {
                    // https://tools.ietf.org/html/rfc8030#section-5.3
                    "headers": { "Urgency": "normal" },
                    "notification": {
                        "title": message.title,
                        "body": message.body,
                        "vibrate": [200, 100, 200],
                        "renotify": true,
                        "require_interaction": true,
                        "actions": [{
                            "action": format!("open:deal:{}", message.deal_id),
                            "title": "Open",
                        }],
                        "data": { "link": message.link },
                    },
                },
            });

            let resp = self
                .http
                .post(format!("{}/fcm/send", self.base_url))
                .header("Authorization", format!("key={}", self.api_key))
                .header("Content-Type", "application/json")
                .body(body.to_string())
                .send()
                .await
                .map_err(|e| PushError::Transport(format!("send request: {e}")))?;

            let status = resp.status();
            if status.is_success() {
                tracing::debug!(%topic, deal_id = message.deal_id, "notification published");
                Ok(())
            } else {
                let text = resp.text().await.unwrap_or_default();
                Err(PushError::Rejected(format!("status {status}: {text}")))
            }
        })
    }
}
