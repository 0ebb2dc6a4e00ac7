mod from_row;
pub mod queries;
mod schema;

pub use schema::{init_audit_db, init_db};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::activation::SubscriptionActivator;
use crate::audit::AuditLogger;
use crate::rate_limit::UpdateRateLimiter;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared across request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Main database pool (orders).
    pub db: DbPool,
    /// Best-effort audit logger (separate database file to isolate growth).
    pub audit: Arc<AuditLogger>,
    /// Per (order, origin) sliding-window throttle.
    pub throttle: Arc<UpdateRateLimiter>,
    /// Collaborator invoked on genuine transitions into SUCCEEDED.
    pub activator: Arc<dyn SubscriptionActivator>,
    /// SHA-256 hex digests of the accepted webhook credentials.
    pub webhook_key_hashes: Arc<HashSet<String>>,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        // Bounded wait on row locks so a stuck writer surfaces as an
        // error instead of blocking a delivery indefinitely.
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(())
    });
    Pool::builder().max_size(10).build(manager)
}
