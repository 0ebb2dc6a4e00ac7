//! Database operations for orders and audit events.
//!
//! The heart of this module is [`transition_order`]: a single atomic
//! read / re-validate / write unit. Duplicate detection and transition
//! validation run INSIDE the transaction, against the row as it is at
//! write time, so two concurrent deliveries for the same order serialize
//! here and cannot both apply.

use chrono::Utc;
use rusqlite::{params, Connection, TransactionBehavior};

use super::from_row::{query_all, query_one, AUDIT_EVENT_COLS, ORDER_COLS};
use crate::engine::{idempotency, transition};
use crate::error::{AppError, Result};
use crate::id::EntityType;
use crate::models::{
    AuditEvent, CreateOrder, NewAuditEvent, Order, OrderStatus, UpdateEvent, UpdateRejection,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

// ============ Orders ============

/// Create a new order in PENDING. Belongs to the external checkout flow;
/// exposed here for the dev seed and for test fixtures.
pub fn create_order(conn: &Connection, input: &CreateOrder) -> Result<Order> {
    if input.amount_cents <= 0 {
        return Err(AppError::BadRequest("amount must be positive".to_string()));
    }
    if !is_valid_currency(&input.currency) {
        return Err(AppError::BadRequest("invalid currency code".to_string()));
    }

    let id = EntityType::Order.gen_id();
    let timestamp = now();

    conn.execute(
        "INSERT INTO orders (id, external_order_id, user_id, subscription_id, status, amount_cents, currency, metadata, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '{}', ?8, ?8)",
        params![
            &id,
            &input.external_order_id,
            &input.user_id,
            &input.subscription_id,
            OrderStatus::Pending.as_ref(),
            input.amount_cents,
            &input.currency,
            timestamp,
        ],
    )?;

    get_order(conn, &id)?.ok_or_else(|| AppError::Internal("order vanished after insert".to_string()))
}

pub fn get_order(conn: &Connection, id: &str) -> Result<Option<Order>> {
    query_one(
        conn,
        &format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLS),
        &[&id],
    )
}

pub fn get_order_by_external_id(conn: &Connection, external_id: &str) -> Result<Option<Order>> {
    query_one(
        conn,
        &format!("SELECT {} FROM orders WHERE external_order_id = ?1", ORDER_COLS),
        &[&external_id],
    )
}

/// Currency must be a 3-letter uppercase ISO code.
pub fn is_valid_currency(currency: &str) -> bool {
    currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase())
}

// ============ Atomic transition ============

/// Outcome of an atomic transition attempt.
#[derive(Debug)]
pub enum TransitionOutcome {
    /// A genuine transition was persisted.
    Transitioned {
        order: Order,
        old_status: OrderStatus,
    },
    /// The event duplicates current state; nothing was written.
    Duplicate(Order),
    /// The state machine rejected the edge; nothing was written.
    Rejected {
        order: Order,
        rejection: UpdateRejection,
    },
    /// No order with that id exists.
    NotFound,
}

/// Atomically apply a validated update event to an order.
///
/// Runs read, duplicate check, transition validation, and the conditional
/// write in one immediate transaction. The UPDATE is additionally guarded
/// by `AND status = <old>` so a lost race surfaces as a repository error
/// rather than a silent double-apply.
///
/// On a genuine transition: optional amount/currency overrides are
/// applied, new metadata keys are merged into existing metadata (existing
/// keys are never dropped), and the status-specific timestamp is stamped.
pub fn transition_order(
    conn: &mut Connection,
    order_id: &str,
    event: &UpdateEvent,
) -> Result<TransitionOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let Some(order) = query_one::<Order>(
        &tx,
        &format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLS),
        &[&order_id],
    )?
    else {
        return Ok(TransitionOutcome::NotFound);
    };

    if idempotency::is_duplicate(&order, event) {
        return Ok(TransitionOutcome::Duplicate(order));
    }

    if let Err(rejection) = transition::validate_transition(order.status, event) {
        return Ok(TransitionOutcome::Rejected { order, rejection });
    }

    let timestamp = now();

    let mut metadata = order.metadata.clone();
    if let Some(ref transaction_id) = event.transaction_id {
        metadata.insert(
            "lastTransactionId".to_string(),
            serde_json::Value::from(transaction_id.clone()),
        );
    }
    if let Some(key) = event.status.timestamp_key() {
        metadata.insert(key.to_string(), serde_json::Value::from(timestamp));
    }
    let metadata_str = serde_json::to_string(&metadata)?;

    let amount_cents = event.amount_cents.unwrap_or(order.amount_cents);
    let currency = event.currency.as_deref().unwrap_or(&order.currency);

    let affected = tx.execute(
        "UPDATE orders SET status = ?1, amount_cents = ?2, currency = ?3, metadata = ?4, updated_at = ?5
         WHERE id = ?6 AND status = ?7",
        params![
            event.status.as_ref(),
            amount_cents,
            currency,
            &metadata_str,
            timestamp,
            &order.id,
            order.status.as_ref(),
        ],
    )?;

    if affected == 0 {
        // Another transition won the race between read and write.
        return Err(AppError::Internal(format!(
            "concurrent transition detected for order {}",
            order.id
        )));
    }

    let updated = query_one::<Order>(
        &tx,
        &format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLS),
        &[&order_id],
    )?
    .ok_or_else(|| AppError::Internal("order vanished during transition".to_string()))?;

    tx.commit()?;

    Ok(TransitionOutcome::Transitioned {
        order: updated,
        old_status: order.status,
    })
}

// ============ Audit events ============

/// Append one immutable audit event.
pub fn create_audit_event(conn: &Connection, input: &NewAuditEvent) -> Result<AuditEvent> {
    let id = EntityType::AuditEvent.gen_id();
    let timestamp = now();
    let raw_payload = input.raw_payload.as_ref().map(|v| v.to_string());

    conn.execute(
        "INSERT INTO audit_events (id, order_id, event_type, old_status, new_status, provider_order_id, amount_cents, currency, raw_payload, origin, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            &id,
            &input.order_id,
            input.event_type.as_ref(),
            input.old_status.map(|s| s.as_ref().to_string()),
            input.new_status.map(|s| s.as_ref().to_string()),
            &input.provider_order_id,
            input.amount_cents,
            &input.currency,
            raw_payload,
            &input.origin,
            timestamp,
        ],
    )?;

    Ok(AuditEvent {
        id,
        order_id: input.order_id.clone(),
        event_type: input.event_type,
        old_status: input.old_status,
        new_status: input.new_status,
        provider_order_id: input.provider_order_id.clone(),
        amount_cents: input.amount_cents,
        currency: input.currency.clone(),
        raw_payload: input.raw_payload.clone(),
        origin: input.origin.clone(),
        created_at: timestamp,
    })
}

/// List audit events for an order, newest first.
pub fn list_audit_events(conn: &Connection, order_id: &str) -> Result<Vec<AuditEvent>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM audit_events WHERE order_id = ?1 ORDER BY created_at DESC, id DESC",
            AUDIT_EVENT_COLS
        ),
        &[&order_id],
    )
}

/// Purge audit events beyond the retention period. Returns the number of
/// deleted records. Called on startup when AUDIT_RETENTION_DAYS > 0.
pub fn purge_old_audit_events(conn: &Connection, retention_days: i64) -> Result<usize> {
    let cutoff = now() - (retention_days * 86400);
    let deleted = conn.execute(
        "DELETE FROM audit_events WHERE created_at < ?1",
        params![cutoff],
    )?;
    Ok(deleted)
}
