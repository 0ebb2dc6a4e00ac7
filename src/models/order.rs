use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Canonical order status. The five values below are the only statuses
/// ever persisted; vendor vocabulary is mapped onto them by the
/// normalizer before anything touches storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Succeeded,
    Failed,
    Canceled,
    Refunded,
}

impl OrderStatus {
    /// Metadata key stamped with the transition time when an order lands
    /// on this status. PENDING is the creation state and has no stamp.
    pub fn timestamp_key(&self) -> Option<&'static str> {
        match self {
            Self::Pending => None,
            Self::Succeeded => Some("succeeded_at"),
            Self::Failed => Some("failed_at"),
            Self::Canceled => Some("canceled_at"),
            Self::Refunded => Some("refunded_at"),
        }
    }

    /// All canonical statuses, for exhaustive transition-table checks.
    pub const ALL: [OrderStatus; 5] = [
        Self::Pending,
        Self::Succeeded,
        Self::Failed,
        Self::Canceled,
        Self::Refunded,
    ];
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// Free-form order metadata. Carries `lastTransactionId` and the
/// per-status timestamps; merged on write, existing keys are never dropped.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// One payment attempt, tied to a user and optionally a subscription.
///
/// Orders are created in PENDING by the external checkout flow and from
/// then on mutated only through validated transitions. They are never
/// deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Gateway-side order identifier.
    pub external_order_id: String,
    pub user_id: String,
    pub subscription_id: Option<String>,
    pub status: OrderStatus,
    /// Amount in minor units (e.g. bani for RON, cents for EUR).
    pub amount_cents: i64,
    /// ISO 4217 code, uppercase.
    pub currency: String,
    pub metadata: Metadata,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// The transaction id recorded by the last accepted transition, if any.
    pub fn last_transaction_id(&self) -> Option<&str> {
        self.metadata
            .get("lastTransactionId")
            .and_then(|v| v.as_str())
    }
}

/// Data required to create a new order (used by the external checkout
/// flow and by test fixtures - the engine itself never creates orders).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrder {
    pub external_order_id: String,
    pub user_id: String,
    pub subscription_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
}
