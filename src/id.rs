//! Prefixed ID generation for Ordergate entities.
//!
//! All IDs use an `og_` brand prefix to guarantee collision avoidance with
//! gateway-side identifiers (Netopia order ids, Stripe's `pi_`, etc.).
//!
//! Format: `og_{entity}_{uuid_simple}` (32 hex chars, no hyphens)

use uuid::Uuid;

/// All known entity prefixes for validation.
const ALL_PREFIXES: &[&str] = &["og_ord_", "og_evt_"];

/// Validate that a string is a valid Ordergate prefixed ID.
///
/// This is a cheap check to reject garbage before hitting the database.
/// Validates format: `og_{entity}_{32_hex_chars}`
pub fn is_valid_prefixed_id(s: &str) -> bool {
    let Some(prefix) = ALL_PREFIXES.iter().find(|p| s.starts_with(*p)) else {
        return false;
    };

    let hex_part = &s[prefix.len()..];
    hex_part.len() == 32 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

/// Entity types that have prefixed IDs in Ordergate.
#[derive(Debug, Clone, Copy)]
pub enum EntityType {
    Order,
    AuditEvent,
}

impl EntityType {
    /// Returns the prefix for this entity type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Order => "og_ord",
            Self::AuditEvent => "og_evt",
        }
    }

    /// Generates a new prefixed ID for this entity type.
    pub fn gen_id(&self) -> String {
        format!("{}_{}", self.prefix(), Uuid::new_v4().as_simple())
    }
}
