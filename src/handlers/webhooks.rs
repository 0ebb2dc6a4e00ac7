//! The payment status update endpoint.
//!
//! One route serves both gateway webhooks and direct status-update calls;
//! both speak the same payload. Every outcome past JSON parsing is an
//! HTTP 200: gateways retry aggressively on error statuses, and a
//! `success=false` body is treated as a final answer. Authentication
//! failures take the same shape for the same reason.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};

use super::{authenticate, request_origin};
use crate::db::AppState;
use crate::engine;
use crate::models::{UpdateRejection, UpdateRequest, UpdateResponse};

pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/payment", post(payment_update))
}

async fn payment_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UpdateRequest>,
) -> Json<UpdateResponse> {
    let fingerprint = authenticate(&state, &headers);
    if fingerprint.is_none() {
        tracing::warn!(
            order_id = %request.order_id,
            ip = ?crate::util::extract_client_ip(&headers),
            "webhook authentication rejected"
        );
        return Json(UpdateResponse::rejected(
            UpdateRejection::AuthenticationRejected,
        ));
    }
    let origin = request_origin(fingerprint, &headers);

    Json(engine::process_update(&state, &request, &origin))
}
