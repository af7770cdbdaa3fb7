//! HTTP handlers.

use axum::{
    body::Bytes,
    extract::State,
    http::{Method, Uri},
    response::Json,
    Extension,
};

use crate::auth::Admission;
use crate::protocol::Response as GuardResponse;

use super::{AppState, RequestId};

/// Liveness check. Not guarded.
pub async fn handle_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "protection_configured": state.guard.is_configured(),
    }))
}

/// Acknowledge a request the guard admitted.
pub async fn handle_admitted(
    Extension(RequestId(request_id)): Extension<RequestId>,
    Extension(admission): Extension<Admission>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Json<GuardResponse> {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    Json(GuardResponse::success_with_id(
        request_id,
        serde_json::json!({
            "client_ip": admission.client_ip,
            "method": method.as_str(),
            "path": path,
            "body_bytes": body.len(),
        }),
    ))
}
