//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::{AuditEvent, Order};

/// Parse a string column into an enum type, converting parse errors to
/// rusqlite errors. Graceful handling instead of panicking when the
/// database contains invalid enum values.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Same as [`parse_enum`] for nullable columns.
fn parse_enum_opt<T: std::str::FromStr>(
    row: &Row,
    col: usize,
    col_name: &str,
) -> rusqlite::Result<Option<T>> {
    row.get::<_, Option<String>>(col)?
        .map(|s| {
            s.parse::<T>().map_err(|_| {
                rusqlite::Error::InvalidColumnType(
                    col,
                    col_name.to_string(),
                    rusqlite::types::Type::Text,
                )
            })
        })
        .transpose()
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const ORDER_COLS: &str = "id, external_order_id, user_id, subscription_id, status, amount_cents, currency, metadata, created_at, updated_at";

pub const AUDIT_EVENT_COLS: &str = "id, order_id, event_type, old_status, new_status, provider_order_id, amount_cents, currency, raw_payload, origin, created_at";

// ============ FromRow Implementations ============

impl FromRow for Order {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let metadata_str: String = row.get(7)?;
        Ok(Order {
            id: row.get(0)?,
            external_order_id: row.get(1)?,
            user_id: row.get(2)?,
            subscription_id: row.get(3)?,
            status: parse_enum(row, 4, "status")?,
            amount_cents: row.get(5)?,
            currency: row.get(6)?,
            metadata: serde_json::from_str(&metadata_str).unwrap_or_default(),
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

impl FromRow for AuditEvent {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let raw_payload: Option<String> = row.get(8)?;
        Ok(AuditEvent {
            id: row.get(0)?,
            order_id: row.get(1)?,
            event_type: parse_enum(row, 2, "event_type")?,
            old_status: parse_enum_opt(row, 3, "old_status")?,
            new_status: parse_enum_opt(row, 4, "new_status")?,
            provider_order_id: row.get(5)?,
            amount_cents: row.get(6)?,
            currency: row.get(7)?,
            raw_payload: raw_payload.and_then(|s| serde_json::from_str(&s).ok()),
            origin: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}
