//! Test utilities and fixtures for Ordergate integration tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

pub use ordergate::activation::{ActivationEvent, SubscriptionActivator};
pub use ordergate::audit::AuditLogger;
pub use ordergate::crypto::sha256_hex;
pub use ordergate::db::{init_audit_db, init_db, queries, AppState, DbPool};
pub use ordergate::engine;
pub use ordergate::models::*;
pub use ordergate::rate_limit::UpdateRateLimiter;

/// Credential accepted by test states.
pub const TEST_KEY: &str = "whk_test_key_1";

/// Activator that records events instead of firing webhooks, so tests can
/// assert exactly-once side effects.
#[derive(Default)]
pub struct RecordingActivator {
    events: Mutex<Vec<ActivationEvent>>,
}

impl RecordingActivator {
    pub fn events(&self) -> Vec<ActivationEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl SubscriptionActivator for RecordingActivator {
    fn activate(&self, event: ActivationEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Single-connection in-memory pool. One connection means every checkout
/// sees the same database.
pub fn memory_pool() -> DbPool {
    let manager = SqliteConnectionManager::memory();
    Pool::builder()
        .max_size(1)
        .build(manager)
        .expect("Failed to build in-memory pool")
}

/// Full application state backed by in-memory databases, with a generous
/// throttle so unrelated tests never trip it.
pub fn test_state() -> (AppState, Arc<RecordingActivator>) {
    test_state_with_throttle(1000, 60)
}

pub fn test_state_with_throttle(
    max_updates: usize,
    window_secs: u64,
) -> (AppState, Arc<RecordingActivator>) {
    let db = memory_pool();
    let audit_pool = memory_pool();

    init_db(&db.get().unwrap()).expect("Failed to initialize schema");
    init_audit_db(&audit_pool.get().unwrap()).expect("Failed to initialize audit schema");

    let activator = Arc::new(RecordingActivator::default());
    let mut key_hashes = HashSet::new();
    key_hashes.insert(sha256_hex(TEST_KEY));

    let state = AppState {
        db,
        audit: Arc::new(AuditLogger::new(audit_pool, true)),
        throttle: Arc::new(UpdateRateLimiter::new(max_updates, window_secs)),
        activator: activator.clone(),
        webhook_key_hashes: Arc::new(key_hashes),
    };

    (state, activator)
}

/// Create a PENDING test order.
pub fn create_test_order(state: &AppState, external_id: &str) -> Order {
    let conn = state.db.get().expect("Failed to get connection");
    queries::create_order(
        &conn,
        &CreateOrder {
            external_order_id: external_id.to_string(),
            user_id: "user-1".to_string(),
            subscription_id: Some("sub-1".to_string()),
            amount_cents: 10000,
            currency: "RON".to_string(),
        },
    )
    .expect("Failed to create test order")
}

/// Build an update request payload.
pub fn update_request(
    order_id: &str,
    status: Option<&str>,
    transaction_id: Option<&str>,
) -> UpdateRequest {
    UpdateRequest {
        order_id: order_id.to_string(),
        status: status.map(String::from),
        transaction_id: transaction_id.map(String::from),
        amount: None,
        currency: None,
        raw_data: None,
    }
}

/// Reload an order from the database.
pub fn reload_order(state: &AppState, id: &str) -> Order {
    let conn = state.db.get().expect("Failed to get connection");
    queries::get_order(&conn, id)
        .expect("Failed to query order")
        .expect("Order should exist")
}
