//! End-to-end tests for the update pipeline: normalization, dedup,
//! transitions, audit records, and the activation trigger.

mod common;

use common::*;

const ORIGIN: &str = "test-origin";

// ============ Genuine transitions ============

#[test]
fn test_pending_to_succeeded_updates_order_and_activates() {
    let (state, activator) = test_state();
    let order = create_test_order(&state, "ntp-100");

    let mut request = update_request(&order.id, Some("confirmed"), Some("tx-1"));
    request.amount = Some(149.50);
    request.currency = Some("ron".to_string());

    let response = engine::process_update(&state, &request, ORIGIN);
    assert!(response.success, "update should succeed: {}", response.message);

    let updated = reload_order(&state, &order.id);
    assert_eq!(updated.status, OrderStatus::Succeeded);
    assert_eq!(updated.amount_cents, 14950);
    assert_eq!(updated.currency, "RON");
    assert_eq!(updated.last_transaction_id(), Some("tx-1"));
    assert!(updated.metadata.contains_key("succeeded_at"));

    let events = activator.events();
    assert_eq!(events.len(), 1, "exactly one activation");
    assert_eq!(events[0].order_id, order.id);
    assert_eq!(events[0].transaction_id.as_deref(), Some("tx-1"));
}

#[test]
fn test_pending_to_failed_does_not_activate() {
    let (state, activator) = test_state();
    let order = create_test_order(&state, "ntp-101");

    let response = engine::process_update(
        &state,
        &update_request(&order.id, Some("FAILED"), None),
        ORIGIN,
    );
    assert!(response.success);
    assert_eq!(reload_order(&state, &order.id).status, OrderStatus::Failed);
    assert_eq!(activator.count(), 0);
}

#[test]
fn test_missing_amount_and_currency_keep_stored_values() {
    let (state, _) = test_state();
    let order = create_test_order(&state, "ntp-102");

    let response = engine::process_update(
        &state,
        &update_request(&order.id, Some("paid"), Some("tx-1")),
        ORIGIN,
    );
    assert!(response.success);

    let updated = reload_order(&state, &order.id);
    assert_eq!(updated.amount_cents, 10000);
    assert_eq!(updated.currency, "RON");
}

#[test]
fn test_metadata_merge_preserves_existing_keys() {
    let (state, _) = test_state();
    let order = create_test_order(&state, "ntp-103");

    // First transition stamps failed_at.
    assert!(
        engine::process_update(
            &state,
            &update_request(&order.id, Some("FAILED"), None),
            ORIGIN
        )
        .success
    );
    // Recovery with proof of capture.
    assert!(
        engine::process_update(
            &state,
            &update_request(&order.id, Some("SUCCESS"), Some("tx-late")),
            ORIGIN
        )
        .success
    );

    let updated = reload_order(&state, &order.id);
    assert_eq!(updated.status, OrderStatus::Succeeded);
    assert!(updated.metadata.contains_key("failed_at"), "old stamp survives");
    assert!(updated.metadata.contains_key("succeeded_at"));
    assert_eq!(updated.last_transaction_id(), Some("tx-late"));
}

// ============ Idempotent redelivery ============

#[test]
fn test_duplicate_deliveries_are_absorbed() {
    let (state, activator) = test_state();
    let order = create_test_order(&state, "ntp-200");

    let request = update_request(&order.id, Some("confirmed"), Some("tx-1"));
    assert!(engine::process_update(&state, &request, ORIGIN).success);
    let after_first = reload_order(&state, &order.id);

    // Gateway retries the same notification several times.
    for _ in 0..5 {
        let response = engine::process_update(&state, &request, ORIGIN);
        assert!(response.success, "duplicates answer with the success shape");
        assert_eq!(
            response.order.as_ref().map(|o| o.status),
            Some(OrderStatus::Succeeded)
        );
    }

    let after_retries = reload_order(&state, &order.id);
    assert_eq!(after_retries.updated_at, after_first.updated_at, "no write");
    assert_eq!(after_retries.metadata, after_first.metadata);
    assert_eq!(activator.count(), 1, "activation fires once, not per retry");

    let trail = state.audit.list_for_order(&order.id).unwrap();
    let transitions = trail
        .iter()
        .filter(|e| e.event_type == AuditEventType::StatusTransition)
        .count();
    let duplicates = trail
        .iter()
        .filter(|e| e.event_type == AuditEventType::DuplicateDelivery)
        .count();
    assert_eq!(transitions, 1);
    assert_eq!(duplicates, 5);
}

#[test]
fn test_refunded_redelivery_is_duplicate_not_transition() {
    let (state, _) = test_state();
    let order = create_test_order(&state, "ntp-201");

    assert!(
        engine::process_update(
            &state,
            &update_request(&order.id, Some("paid"), Some("tx-1")),
            ORIGIN
        )
        .success
    );
    assert!(
        engine::process_update(
            &state,
            &update_request(&order.id, Some("REFUNDED"), Some("tx-1")),
            ORIGIN
        )
        .success
    );

    // Retried refund notification: absorbed, still success.
    let response = engine::process_update(
        &state,
        &update_request(&order.id, Some("REFUNDED"), Some("tx-1")),
        ORIGIN,
    );
    assert!(response.success);
    assert_eq!(reload_order(&state, &order.id).status, OrderStatus::Refunded);
}

// ============ Rejections ============

#[test]
fn test_refunded_is_terminal_for_genuine_mutations() {
    let (state, activator) = test_state();
    let order = create_test_order(&state, "ntp-300");

    assert!(
        engine::process_update(
            &state,
            &update_request(&order.id, Some("paid"), Some("tx-1")),
            ORIGIN
        )
        .success
    );
    assert!(
        engine::process_update(
            &state,
            &update_request(&order.id, Some("REFUNDED"), Some("tx-1")),
            ORIGIN
        )
        .success
    );
    let activations_before = activator.count();

    for target in ["PENDING", "SUCCEEDED", "FAILED", "CANCELED"] {
        let response = engine::process_update(
            &state,
            &update_request(&order.id, Some(target), Some("tx-new")),
            ORIGIN,
        );
        assert!(!response.success, "REFUNDED -> {target} must be rejected");
        assert_eq!(response.message, "Invalid transition");
    }

    assert_eq!(reload_order(&state, &order.id).status, OrderStatus::Refunded);
    assert_eq!(activator.count(), activations_before);
}

#[test]
fn test_recovery_without_transaction_id_is_rejected() {
    let (state, activator) = test_state();
    let order = create_test_order(&state, "ntp-301");

    assert!(
        engine::process_update(
            &state,
            &update_request(&order.id, Some("CANCELLED"), None),
            ORIGIN
        )
        .success
    );

    let response = engine::process_update(
        &state,
        &update_request(&order.id, Some("paid"), None),
        ORIGIN,
    );
    assert!(!response.success);
    assert_eq!(response.message, "Invalid transition");
    assert_eq!(reload_order(&state, &order.id).status, OrderStatus::Canceled);
    assert_eq!(activator.count(), 0);

    // With proof the same recovery goes through.
    let response = engine::process_update(
        &state,
        &update_request(&order.id, Some("paid"), Some("tx-late")),
        ORIGIN,
    );
    assert!(response.success);
    assert_eq!(reload_order(&state, &order.id).status, OrderStatus::Succeeded);
    assert_eq!(activator.count(), 1);
}

#[test]
fn test_unknown_status_token_fails_closed() {
    let (state, _) = test_state();
    let order = create_test_order(&state, "ntp-302");

    let response = engine::process_update(
        &state,
        &update_request(&order.id, Some("ON_HOLD"), None),
        ORIGIN,
    );
    assert!(!response.success);
    assert_eq!(response.message, "Validation failed");
    assert_eq!(reload_order(&state, &order.id).status, OrderStatus::Pending);
}

#[test]
fn test_missing_status_fails_validation() {
    let (state, _) = test_state();
    let order = create_test_order(&state, "ntp-303");

    let response = engine::process_update(&state, &update_request(&order.id, None, None), ORIGIN);
    assert!(!response.success);
    assert_eq!(response.message, "Validation failed");
}

#[test]
fn test_invalid_amount_fails_validation() {
    let (state, _) = test_state();
    let order = create_test_order(&state, "ntp-304");

    let mut request = update_request(&order.id, Some("paid"), Some("tx-1"));
    request.amount = Some(-5.0);

    let response = engine::process_update(&state, &request, ORIGIN);
    assert!(!response.success);
    assert_eq!(response.message, "Validation failed");
    assert_eq!(reload_order(&state, &order.id).status, OrderStatus::Pending);
}

#[test]
fn test_unknown_order_is_rejected() {
    let (state, _) = test_state();

    let response = engine::process_update(
        &state,
        &update_request("og_ord_ffffffffffffffffffffffffffffffff", Some("paid"), None),
        ORIGIN,
    );
    assert!(!response.success);
    assert_eq!(response.message, "Order not found");
}

#[test]
fn test_succeeded_cannot_fail_or_cancel() {
    let (state, _) = test_state();
    let order = create_test_order(&state, "ntp-305");

    assert!(
        engine::process_update(
            &state,
            &update_request(&order.id, Some("paid"), Some("tx-1")),
            ORIGIN
        )
        .success
    );

    for target in ["FAILED", "CANCELED", "PENDING"] {
        let response = engine::process_update(
            &state,
            &update_request(&order.id, Some(target), Some("tx-2")),
            ORIGIN,
        );
        assert!(!response.success, "SUCCEEDED -> {target} must be rejected");
    }
    assert_eq!(reload_order(&state, &order.id).status, OrderStatus::Succeeded);
}
