use serde::{Deserialize, Serialize};

use super::{Order, OrderStatus};

/// Inbound status-update request, as delivered by a gateway webhook or an
/// equivalent direct status-update call. `amount` is in major units
/// (e.g. `100` = 100.00 RON) and is converted to minor units during
/// validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub order_id: String,
    pub status: Option<String>,
    pub transaction_id: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    /// Raw vendor payload, kept verbatim for the audit trail.
    pub raw_data: Option<serde_json::Value>,
}

/// A validated, normalized update event. Built from an [`UpdateRequest`]
/// once the payload has passed validation; this is what the comparator,
/// the validator, and the repository operate on.
#[derive(Debug, Clone)]
pub struct UpdateEvent {
    pub status: OrderStatus,
    pub transaction_id: Option<String>,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
}

impl UpdateEvent {
    /// Whether the event carries a non-empty transaction id - the
    /// proof-of-capture required for recovery transitions.
    pub fn has_transaction_id(&self) -> bool {
        self.transaction_id
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}

/// Expected business rejections. These are soft outcomes rendered as a
/// `success=false` response body, never as an HTTP error - gateways retry
/// aggressively on 5xx but treat a 200-with-failure-body as final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateRejection {
    AuthenticationRejected,
    RateExceeded,
    OrderNotFound,
    ValidationFailed,
    InvalidTransition,
    RepositoryFailure,
}

impl UpdateRejection {
    /// Short human-readable reason returned to the caller. Deliberately
    /// generic for `RepositoryFailure` - the real cause stays server-side.
    pub fn message(&self) -> &'static str {
        match self {
            Self::AuthenticationRejected => "Authentication rejected",
            Self::RateExceeded => "Rate limit exceeded",
            Self::OrderNotFound => "Order not found",
            Self::ValidationFailed => "Validation failed",
            Self::InvalidTransition => "Invalid transition",
            Self::RepositoryFailure => "Internal error",
        }
    }
}

/// Outbound result shape. `order` is populated only on success; a
/// duplicate delivery returns the same shape as a genuine transition so
/// callers cannot tell them apart by the response alone.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub message: String,
    pub order: Option<Order>,
}

impl UpdateResponse {
    pub fn ok(message: &str, order: Order) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            order: Some(order),
        }
    }

    pub fn rejected(rejection: UpdateRejection) -> Self {
        Self {
            success: false,
            message: rejection.message().to_string(),
            order: None,
        }
    }
}
