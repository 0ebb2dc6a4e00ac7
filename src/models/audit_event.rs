use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use super::OrderStatus;

/// Classification of an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditEventType {
    /// A genuine state-machine transition was persisted.
    StatusTransition,
    /// A retried/duplicate delivery was recognized; nothing was written.
    DuplicateDelivery,
    /// The update was rejected (invalid transition, validation, not found).
    RejectedUpdate,
}

/// Immutable, append-only audit record. Never mutated or deleted by the
/// engine; only the operator-controlled retention purge may trim old rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: String,
    pub order_id: String,
    pub event_type: AuditEventType,
    pub old_status: Option<OrderStatus>,
    pub new_status: Option<OrderStatus>,
    /// Gateway-side order identifier, when known.
    pub provider_order_id: Option<String>,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
    /// Raw inbound payload, stored verbatim as JSON text.
    pub raw_payload: Option<serde_json::Value>,
    /// Throttle origin (credential fingerprint or client address).
    pub origin: Option<String>,
    pub created_at: i64,
}

/// Data required to append a new audit event.
#[derive(Debug, Clone)]
pub struct NewAuditEvent {
    pub order_id: String,
    pub event_type: AuditEventType,
    pub old_status: Option<OrderStatus>,
    pub new_status: Option<OrderStatus>,
    pub provider_order_id: Option<String>,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
    pub raw_payload: Option<serde_json::Value>,
    pub origin: Option<String>,
}
