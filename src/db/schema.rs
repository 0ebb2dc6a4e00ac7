use rusqlite::Connection;

/// Initialize the main database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Orders (one payment attempt; created PENDING by the external
        -- checkout flow, mutated only through validated transitions,
        -- never deleted)
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            external_order_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            subscription_id TEXT,
            status TEXT NOT NULL CHECK (status IN ('PENDING', 'SUCCEEDED', 'FAILED', 'CANCELED', 'REFUNDED')),
            amount_cents INTEGER NOT NULL CHECK (amount_cents > 0),
            currency TEXT NOT NULL CHECK (length(currency) = 3),
            metadata TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_orders_external ON orders(external_order_id);
        CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id);
        CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);
        "#,
    )?;
    Ok(())
}

/// Initialize the audit database schema (separate DB file).
/// Optimized for append-only workload with WAL mode.
pub fn init_audit_db(conn: &Connection) -> rusqlite::Result<()> {
    // WAL mode: writes are sequential appends, much faster for append-only workloads
    // synchronous=NORMAL: safe with WAL, faster than FULL
    // journal_size_limit: prevent WAL from growing indefinitely
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 1000;
        PRAGMA journal_size_limit = 67108864;

        CREATE TABLE IF NOT EXISTS audit_events (
            id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL,
            event_type TEXT NOT NULL CHECK (event_type IN ('status_transition', 'duplicate_delivery', 'rejected_update')),
            old_status TEXT,
            new_status TEXT,
            provider_order_id TEXT,
            amount_cents INTEGER,
            currency TEXT,
            raw_payload TEXT,
            origin TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_audit_events_order ON audit_events(order_id, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_audit_events_time ON audit_events(created_at);
        "#,
    )?;
    Ok(())
}
