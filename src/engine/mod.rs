//! The update engine: the single pipeline every status update flows
//! through, whether it arrived as a gateway webhook or a direct call.
//!
//! Stages, in order: throttle, payload validation, atomic
//! read / dedup / validate / write, audit, activation. The pipeline is
//! infallible from the caller's point of view: every failure mode maps
//! to a `success=false` response body so the HTTP layer can always
//! acknowledge receipt.

pub mod idempotency;
pub mod normalize;
pub mod transition;

use crate::activation::ActivationEvent;
use crate::db::queries::{self, TransitionOutcome};
use crate::db::AppState;
use crate::models::{
    AuditEventType, NewAuditEvent, Order, OrderStatus, UpdateEvent, UpdateRejection, UpdateRequest,
    UpdateResponse,
};
use normalize::StatusToken;

/// Run one update delivery through the full pipeline.
///
/// `origin` identifies the sender for throttling and audit purposes
/// (credential fingerprint, or client address for unauthenticated
/// rejection paths).
pub fn process_update(state: &AppState, request: &UpdateRequest, origin: &str) -> UpdateResponse {
    // Throttled requests get no audit record: a retry storm must not be
    // able to flood the audit trail either.
    if !state.throttle.check(&request.order_id, origin) {
        tracing::warn!(order_id = %request.order_id, origin, "update throttled");
        return UpdateResponse::rejected(UpdateRejection::RateExceeded);
    }

    let event = match build_event(request) {
        Ok(event) => event,
        Err(rejection) => {
            tracing::info!(order_id = %request.order_id, "update payload rejected");
            state.audit.record(rejection_audit(request, origin, None, None));
            return UpdateResponse::rejected(rejection);
        }
    };

    let outcome = state
        .db
        .get()
        .map_err(crate::error::AppError::from)
        .and_then(|mut conn| queries::transition_order(&mut conn, &request.order_id, &event));

    match outcome {
        Ok(TransitionOutcome::Transitioned { order, old_status }) => {
            tracing::info!(
                order_id = %order.id,
                from = %old_status,
                to = %order.status,
                "order transitioned"
            );
            state.audit.record(NewAuditEvent {
                order_id: order.id.clone(),
                event_type: AuditEventType::StatusTransition,
                old_status: Some(old_status),
                new_status: Some(order.status),
                provider_order_id: Some(order.external_order_id.clone()),
                amount_cents: Some(order.amount_cents),
                currency: Some(order.currency.clone()),
                raw_payload: request.raw_data.clone(),
                origin: Some(origin.to_string()),
            });

            if order.status == OrderStatus::Succeeded {
                state.activator.activate(activation_event(&order, &event));
            }

            UpdateResponse::ok("Order status updated", order)
        }

        Ok(TransitionOutcome::Duplicate(order)) => {
            tracing::info!(order_id = %order.id, status = %order.status, "duplicate delivery absorbed");
            state.audit.record(NewAuditEvent {
                order_id: order.id.clone(),
                event_type: AuditEventType::DuplicateDelivery,
                old_status: Some(order.status),
                new_status: Some(order.status),
                provider_order_id: Some(order.external_order_id.clone()),
                amount_cents: event.amount_cents,
                currency: event.currency.clone(),
                raw_payload: request.raw_data.clone(),
                origin: Some(origin.to_string()),
            });
            // Same shape as a genuine transition; no write happened.
            UpdateResponse::ok("Order status updated", order)
        }

        Ok(TransitionOutcome::Rejected { order, rejection }) => {
            tracing::info!(
                order_id = %order.id,
                from = %order.status,
                to = %event.status,
                "transition rejected"
            );
            state.audit.record(rejection_audit(
                request,
                origin,
                Some(order.status),
                Some(event.status),
            ));
            UpdateResponse::rejected(rejection)
        }

        Ok(TransitionOutcome::NotFound) => {
            tracing::info!(order_id = %request.order_id, "update for unknown order");
            state
                .audit
                .record(rejection_audit(request, origin, None, Some(event.status)));
            UpdateResponse::rejected(UpdateRejection::OrderNotFound)
        }

        Err(e) => {
            tracing::error!(order_id = %request.order_id, "update processing failed: {e}");
            state
                .audit
                .record(rejection_audit(request, origin, None, Some(event.status)));
            UpdateResponse::rejected(UpdateRejection::RepositoryFailure)
        }
    }
}

/// Validate and normalize the inbound payload into an [`UpdateEvent`].
///
/// Fails closed: a missing status, an unrecognized vendor status token,
/// a non-positive or non-finite amount, or a malformed currency code all
/// reject the whole update.
fn build_event(request: &UpdateRequest) -> Result<UpdateEvent, UpdateRejection> {
    let raw_status = request
        .status
        .as_deref()
        .ok_or(UpdateRejection::ValidationFailed)?;

    let status = match normalize::normalize_status(raw_status) {
        Some(StatusToken::Canonical(status)) => status,
        Some(StatusToken::Other(token)) => {
            tracing::warn!(token = %token, "unrecognized vendor status token");
            return Err(UpdateRejection::ValidationFailed);
        }
        None => return Err(UpdateRejection::ValidationFailed),
    };

    let amount_cents = match request.amount {
        Some(amount) => {
            if !amount.is_finite() || amount <= 0.0 {
                return Err(UpdateRejection::ValidationFailed);
            }
            Some((amount * 100.0).round() as i64)
        }
        None => None,
    };

    let currency = match request.currency.as_deref() {
        Some(raw) => {
            let code = raw.trim().to_uppercase();
            if !queries::is_valid_currency(&code) {
                return Err(UpdateRejection::ValidationFailed);
            }
            Some(code)
        }
        None => None,
    };

    let transaction_id = request
        .transaction_id
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from);

    Ok(UpdateEvent {
        status,
        transaction_id,
        amount_cents,
        currency,
    })
}

fn rejection_audit(
    request: &UpdateRequest,
    origin: &str,
    old_status: Option<OrderStatus>,
    new_status: Option<OrderStatus>,
) -> NewAuditEvent {
    NewAuditEvent {
        order_id: request.order_id.clone(),
        event_type: AuditEventType::RejectedUpdate,
        old_status,
        new_status,
        provider_order_id: None,
        amount_cents: None,
        currency: None,
        raw_payload: request.raw_data.clone(),
        origin: Some(origin.to_string()),
    }
}

fn activation_event(order: &Order, event: &UpdateEvent) -> ActivationEvent {
    ActivationEvent {
        order_id: order.id.clone(),
        external_order_id: order.external_order_id.clone(),
        user_id: order.user_id.clone(),
        subscription_id: order.subscription_id.clone(),
        transaction_id: event
            .transaction_id
            .clone()
            .or_else(|| order.last_transaction_id().map(str::to_string)),
        amount_cents: order.amount_cents,
        currency: order.currency.clone(),
        timestamp: order.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(status: Option<&str>) -> UpdateRequest {
        UpdateRequest {
            order_id: "og_ord_test".to_string(),
            status: status.map(String::from),
            transaction_id: None,
            amount: None,
            currency: None,
            raw_data: None,
        }
    }

    #[test]
    fn test_build_event_requires_status() {
        assert_eq!(
            build_event(&request(None)).unwrap_err(),
            UpdateRejection::ValidationFailed
        );
        assert_eq!(
            build_event(&request(Some("  "))).unwrap_err(),
            UpdateRejection::ValidationFailed
        );
    }

    #[test]
    fn test_build_event_rejects_unknown_status() {
        assert_eq!(
            build_event(&request(Some("ON_HOLD"))).unwrap_err(),
            UpdateRejection::ValidationFailed
        );
    }

    #[test]
    fn test_build_event_converts_amount_to_cents() {
        let mut req = request(Some("paid"));
        req.amount = Some(49.99);
        let event = build_event(&req).unwrap();
        assert_eq!(event.status, OrderStatus::Succeeded);
        assert_eq!(event.amount_cents, Some(4999));
    }

    #[test]
    fn test_build_event_rejects_bad_amounts() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut req = request(Some("paid"));
            req.amount = Some(bad);
            assert!(build_event(&req).is_err(), "amount {bad} should be rejected");
        }
    }

    #[test]
    fn test_build_event_normalizes_currency() {
        let mut req = request(Some("paid"));
        req.currency = Some(" ron ".to_string());
        assert_eq!(build_event(&req).unwrap().currency, Some("RON".to_string()));

        req.currency = Some("R0N".to_string());
        assert!(build_event(&req).is_err());
        req.currency = Some("EURO".to_string());
        assert!(build_event(&req).is_err());
    }

    #[test]
    fn test_build_event_drops_blank_transaction_id() {
        let mut req = request(Some("paid"));
        req.transaction_id = Some("   ".to_string());
        assert_eq!(build_event(&req).unwrap().transaction_id, None);

        req.transaction_id = Some(" txn_1 ".to_string());
        assert_eq!(
            build_event(&req).unwrap().transaction_id,
            Some("txn_1".to_string())
        );
    }
}
