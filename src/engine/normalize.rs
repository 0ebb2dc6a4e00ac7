//! Status Normalizer: pure mapping from vendor status strings to the
//! canonical [`OrderStatus`] enum.
//!
//! Gateways disagree on vocabulary ("CONFIRMED", "PAID", "paid ",
//! "CANCELLED") and the direct update path may already speak canonical
//! statuses. Everything is uppercase-trimmed before matching. Unknown
//! non-empty tokens pass through uppercased so the audit trail records
//! exactly what the vendor sent; the engine itself fails closed on them.

use crate::models::OrderStatus;

/// A normalized status token: either one of the five canonical statuses
/// or an unrecognized vendor token, uppercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusToken {
    Canonical(OrderStatus),
    Other(String),
}

/// Normalize a raw vendor status string. Returns `None` for empty or
/// whitespace-only input. No side effects, no failure modes.
pub fn normalize_status(raw: &str) -> Option<StatusToken> {
    let token = raw.trim().to_uppercase();
    if token.is_empty() {
        return None;
    }

    let canonical = match token.as_str() {
        // Netopia reports captures as CONFIRMED/PAID; the retry cron uses SUCCESS.
        "CONFIRMED" | "PAID" | "SUCCESS" | "SUCCEEDED" => OrderStatus::Succeeded,
        "PENDING" => OrderStatus::Pending,
        "CANCELLED" | "CANCELED" => OrderStatus::Canceled,
        "FAILED" => OrderStatus::Failed,
        "REFUNDED" => OrderStatus::Refunded,
        _ => return Some(StatusToken::Other(token)),
    };

    Some(StatusToken::Canonical(canonical))
}
