pub mod orders;
pub mod webhooks;

use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};

use crate::crypto::{key_fingerprint, sha256_hex};
use crate::db::AppState;
use crate::util;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(webhooks::router())
        .merge(orders::router())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Check the Bearer credential against the configured key digests.
/// Returns the credential fingerprint on success.
pub(crate) fn authenticate(state: &AppState, headers: &HeaderMap) -> Option<String> {
    let token = util::extract_bearer_token(headers)?;
    if state.webhook_key_hashes.contains(&sha256_hex(token)) {
        Some(key_fingerprint(token))
    } else {
        None
    }
}

/// Origin label for throttling and audit: the credential fingerprint when
/// authenticated, otherwise the best available client address.
pub(crate) fn request_origin(fingerprint: Option<String>, headers: &HeaderMap) -> String {
    fingerprint
        .or_else(|| util::extract_client_ip(headers))
        .unwrap_or_else(|| "unknown".to_string())
}
