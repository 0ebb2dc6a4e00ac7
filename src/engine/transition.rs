//! Transition Validator: the order-status state machine.
//!
//! | Old       | Allowed new                  | Extra condition            |
//! |-----------|------------------------------|----------------------------|
//! | PENDING   | SUCCEEDED, FAILED, CANCELED  | none                       |
//! | SUCCEEDED | REFUNDED                     | none                       |
//! | FAILED    | SUCCEEDED                    | non-empty transaction id   |
//! | CANCELED  | SUCCEEDED                    | non-empty transaction id   |
//! | REFUNDED  | (none)                       | duplicates only            |
//!
//! Any pair not covered is rejected. REFUNDED is terminal: a repeated
//! REFUNDED delivery is absorbed by the idempotency comparator before it
//! reaches this validator, so every REFUNDED -> x event seen here is a
//! genuine mutation attempt against a terminal order and is rejected.
//! Rejections are soft failures so webhook endpoints can acknowledge
//! receipt without triggering upstream retry storms.

use crate::models::{OrderStatus, UpdateEvent, UpdateRejection};

/// Validate the `old -> event.status` edge. Returns `Ok(())` when the
/// transition is permitted, or the rejection to report otherwise.
pub fn validate_transition(
    old: OrderStatus,
    event: &UpdateEvent,
) -> Result<(), UpdateRejection> {
    use OrderStatus::*;

    match (old, event.status) {
        (Pending, Succeeded) | (Pending, Failed) | (Pending, Canceled) => Ok(()),

        (Succeeded, Refunded) => Ok(()),

        // Late capture after a FAILED/CANCELED verdict needs proof: the
        // gateway transaction id of the successful charge.
        (Failed, Succeeded) | (Canceled, Succeeded) => {
            if event.has_transaction_id() {
                Ok(())
            } else {
                Err(UpdateRejection::InvalidTransition)
            }
        }

        _ => Err(UpdateRejection::InvalidTransition),
    }
}
