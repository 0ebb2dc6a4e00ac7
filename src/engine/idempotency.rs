//! Idempotency Comparator: decides whether an incoming event is a no-op
//! duplicate of the order's current state.
//!
//! Gateways deliver webhooks at-least-once; retries of an already-applied
//! event must not write anything, must not re-trigger side effects, and
//! must still answer with the same success shape as the first delivery.

use crate::models::{Order, UpdateEvent};

/// An event is a duplicate iff ALL of the following hold:
/// - the new status equals the stored status;
/// - the transaction id, if provided, equals the stored
///   `lastTransactionId`, or both are absent;
/// - the amount, if provided, equals the stored amount;
/// - the currency, if provided, equals the stored currency.
pub fn is_duplicate(order: &Order, event: &UpdateEvent) -> bool {
    if event.status != order.status {
        return false;
    }

    let tx_matches = match (event.transaction_id.as_deref(), order.last_transaction_id()) {
        (Some(incoming), Some(stored)) => incoming == stored,
        (None, None) => true,
        _ => false,
    };
    if !tx_matches {
        return false;
    }

    if let Some(amount) = event.amount_cents {
        if amount != order.amount_cents {
            return false;
        }
    }

    if let Some(ref currency) = event.currency {
        if currency != &order.currency {
            return false;
        }
    }

    true
}
