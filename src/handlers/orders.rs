//! Read-side endpoints: order lookup and per-order audit trail.
//! Same Bearer credential as the update endpoint; unlike the webhook
//! route these return real HTTP error statuses since no gateway is on
//! the other end.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};

use super::authenticate;
use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::id::is_valid_prefixed_id;
use crate::models::{AuditEvent, Order};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/audit", get(get_order_audit))
}

async fn get_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    if authenticate(&state, &headers).is_none() {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    // Cheap format check before hitting the database.
    if !is_valid_prefixed_id(&id) {
        return Err(AppError::NotFound("Order not found".to_string()));
    }

    let conn = state.db.get()?;
    let order = queries::get_order(&conn, &id)?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    Ok(Json(order))
}

async fn get_order_audit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<AuditEvent>>> {
    if authenticate(&state, &headers).is_none() {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let events = state.audit.list_for_order(&id)?;
    Ok(Json(events))
}
