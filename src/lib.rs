//! Ordergate - Payment order lifecycle and webhook idempotency engine
//!
//! This library receives asynchronous payment-gateway notifications (and
//! equivalent direct status-update calls), normalizes vendor status
//! vocabulary, deduplicates retried deliveries, enforces the order-status
//! state machine, and appends an audit trail - guaranteeing at-most-once
//! execution of side effects under at-least-once, duplicate-prone delivery.

pub mod activation;
pub mod audit;
pub mod config;
pub mod crypto;
pub mod db;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod id;
pub mod models;
pub mod rate_limit;
pub mod util;
