//! Subscription activation on successful payment.
//!
//! When an order genuinely transitions into SUCCEEDED the engine fires
//! exactly one activation event. Duplicate deliveries never reach this
//! module: the idempotency comparator absorbs them before a transition
//! is recorded, which is what keeps activation at-most-once per
//! transition.
//!
//! Delivery is fire-and-forget over a webhook URL configured via
//! `ACTIVATION_WEBHOOK_URL`. Failures are logged, never surfaced to the
//! gateway.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use reqwest::Client;
use serde::Serialize;

/// Retry delays in milliseconds. Quick retries so the background task
/// finishes well before any gateway retry would arrive.
const ACTIVATION_RETRY_DELAYS: &[u64] = &[100, 200];

/// Payload emitted when an order reaches SUCCEEDED.
#[derive(Debug, Clone, Serialize)]
pub struct ActivationEvent {
    pub order_id: String,
    pub external_order_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub timestamp: i64,
}

/// Seam between the update engine and whatever reacts to a successful
/// payment. Implementations must not block the caller.
pub trait SubscriptionActivator: Send + Sync {
    fn activate(&self, event: ActivationEvent);
}

/// Production activator: posts the event to a webhook in a background
/// task. Panics in the task are logged rather than silently swallowed.
pub struct WebhookActivator {
    client: Client,
    url: String,
}

impl WebhookActivator {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

impl SubscriptionActivator for WebhookActivator {
    fn activate(&self, event: ActivationEvent) {
        let client = self.client.clone();
        let url = self.url.clone();
        let order_id = event.order_id.clone();
        tokio::spawn(
            AssertUnwindSafe(async move {
                send_activation(&client, &url, &event).await;
            })
            .catch_unwind()
            .map(move |result| {
                if let Err(panic) = result {
                    let panic_msg = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(
                        "Activation task panicked for order '{}': {}",
                        order_id,
                        panic_msg
                    );
                }
            }),
        );
    }
}

/// Used when no activation webhook is configured.
pub struct NoopActivator;

impl SubscriptionActivator for NoopActivator {
    fn activate(&self, event: ActivationEvent) {
        tracing::debug!(order_id = %event.order_id, "activation webhook not configured, skipping");
    }
}

async fn send_activation(client: &Client, url: &str, event: &ActivationEvent) {
    for (attempt, delay_ms) in std::iter::once(&0u64)
        .chain(ACTIVATION_RETRY_DELAYS.iter())
        .enumerate()
    {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
        }

        match client
            .post(url)
            .json(event)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                if attempt > 0 {
                    tracing::debug!("Activation webhook succeeded after {} retries", attempt);
                }
                return;
            }
            Ok(resp) => {
                tracing::debug!("Activation webhook returned {}", resp.status());
            }
            Err(e) => {
                tracing::debug!("Activation webhook failed: {}", e);
            }
        }
    }

    tracing::warn!(
        order_id = %event.order_id,
        "Activation webhook failed after {} attempts",
        ACTIVATION_RETRY_DELAYS.len() + 1
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delays_are_quick() {
        let total_delay: u64 = ACTIVATION_RETRY_DELAYS.iter().sum();
        assert!(total_delay < 500, "Retry delays should be quick");
    }

    #[test]
    fn test_activation_event_serialization() {
        let event = ActivationEvent {
            order_id: "og_ord_123".to_string(),
            external_order_id: "ext_456".to_string(),
            user_id: "user_789".to_string(),
            subscription_id: None,
            transaction_id: Some("txn_abc".to_string()),
            amount_cents: 4900,
            currency: "RON".to_string(),
            timestamp: 1234567890,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"order_id\":\"og_ord_123\""));
        assert!(json.contains("\"amount_cents\":4900"));
        assert!(!json.contains("subscription_id"));
    }
}
