//! Audit trail tests: per-request records, dead-letter fallback, and
//! retention purge.

mod common;

use common::*;

const ORIGIN: &str = "test-origin";

fn new_event(order_id: &str, event_type: AuditEventType) -> NewAuditEvent {
    NewAuditEvent {
        order_id: order_id.to_string(),
        event_type,
        old_status: Some(OrderStatus::Pending),
        new_status: Some(OrderStatus::Succeeded),
        provider_order_id: None,
        amount_cents: Some(10000),
        currency: Some("RON".to_string()),
        raw_payload: None,
        origin: Some(ORIGIN.to_string()),
    }
}

#[test]
fn test_every_processed_request_is_audited() {
    let (state, _) = test_state();
    let order = create_test_order(&state, "ntp-600");

    // Transition, duplicate, rejection: three deliveries, three records.
    engine::process_update(
        &state,
        &update_request(&order.id, Some("paid"), Some("tx-1")),
        ORIGIN,
    );
    engine::process_update(
        &state,
        &update_request(&order.id, Some("paid"), Some("tx-1")),
        ORIGIN,
    );
    engine::process_update(
        &state,
        &update_request(&order.id, Some("CANCELED"), None),
        ORIGIN,
    );

    let trail = state.audit.list_for_order(&order.id).unwrap();
    assert_eq!(trail.len(), 3);

    let types: Vec<AuditEventType> = trail.iter().map(|e| e.event_type).collect();
    assert!(types.contains(&AuditEventType::StatusTransition));
    assert!(types.contains(&AuditEventType::DuplicateDelivery));
    assert!(types.contains(&AuditEventType::RejectedUpdate));

    for event in &trail {
        assert_eq!(event.origin.as_deref(), Some(ORIGIN));
    }
}

#[test]
fn test_transition_record_captures_old_and_new_status() {
    let (state, _) = test_state();
    let order = create_test_order(&state, "ntp-601");

    engine::process_update(
        &state,
        &update_request(&order.id, Some("FAILED"), None),
        ORIGIN,
    );

    let trail = state.audit.list_for_order(&order.id).unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].event_type, AuditEventType::StatusTransition);
    assert_eq!(trail[0].old_status, Some(OrderStatus::Pending));
    assert_eq!(trail[0].new_status, Some(OrderStatus::Failed));
    assert_eq!(trail[0].provider_order_id.as_deref(), Some("ntp-601"));
}

#[test]
fn test_failed_writes_are_parked_and_recovered() {
    let pool = memory_pool();
    init_audit_db(&pool.get().unwrap()).unwrap();
    let logger = AuditLogger::new(pool.clone(), true);

    // Break the audit store.
    pool.get().unwrap().execute_batch("DROP TABLE audit_events").unwrap();

    logger.record(new_event("og_ord_1", AuditEventType::StatusTransition));
    logger.record(new_event("og_ord_1", AuditEventType::DuplicateDelivery));
    assert_eq!(logger.pending_dead_letters(), 2);

    // Repair it and let the maintenance path retry.
    init_audit_db(&pool.get().unwrap()).unwrap();
    let flushed = logger.drain_dead_letters();
    assert_eq!(flushed, 2);
    assert_eq!(logger.pending_dead_letters(), 0);

    let trail = logger.list_for_order("og_ord_1").unwrap();
    assert_eq!(trail.len(), 2);
}

#[test]
fn test_disabled_logger_records_nothing() {
    let pool = memory_pool();
    init_audit_db(&pool.get().unwrap()).unwrap();
    let logger = AuditLogger::new(pool, false);

    logger.record(new_event("og_ord_1", AuditEventType::StatusTransition));
    assert_eq!(logger.pending_dead_letters(), 0);
    assert!(logger.list_for_order("og_ord_1").unwrap().is_empty());
}

#[test]
fn test_retention_purge_keeps_recent_records() {
    let pool = memory_pool();
    init_audit_db(&pool.get().unwrap()).unwrap();

    let logger = AuditLogger::new(pool.clone(), true);
    logger.record(new_event("og_ord_recent", AuditEventType::StatusTransition));

    // Backdate one record far beyond retention.
    let old_ts = chrono::Utc::now().timestamp() - 90 * 86400;
    pool.get()
        .unwrap()
        .execute(
            "INSERT INTO audit_events (id, order_id, event_type, created_at)
             VALUES ('og_evt_old', 'og_ord_old', 'status_transition', ?1)",
            rusqlite::params![old_ts],
        )
        .unwrap();

    let purged = queries::purge_old_audit_events(&pool.get().unwrap(), 30).unwrap();
    assert_eq!(purged, 1);
    assert!(logger.list_for_order("og_ord_old").unwrap().is_empty());
    assert_eq!(logger.list_for_order("og_ord_recent").unwrap().len(), 1);
}
