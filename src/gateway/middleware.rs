//! Guard middleware: the request-pipeline entrypoint.

use std::error::Error as StdError;
use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use http_body_util::LengthLimitError;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::audit::AuditEntry;
use crate::auth::resolve_client_ip;
use crate::error::GuardError;
use crate::protocol::{GuardedRequest, Headers, Response as GuardResponse};

use super::AppState;

/// Request ID assigned by the guard, available to downstream handlers.
#[derive(Debug, Clone, Copy)]
pub struct RequestId(pub Uuid);

/// Check every request against the guard before it reaches a handler.
///
/// The body is buffered (up to the configured limit) because the signature
/// covers its exact bytes; admitted requests are forwarded with the same
/// bytes plus [`RequestId`] and [`Admission`](crate::auth::Admission)
/// extensions.
pub async fn guard_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = Uuid::new_v4();
    let start_time = Instant::now();

    let (parts, body) = request.into_parts();
    let remote_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let headers: Headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?)))
        .collect();
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| parts.uri.path());

    let bytes = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let guarded = GuardedRequest::new(parts.method.as_str(), path, Vec::new(), headers)
                .with_remote_addr(remote_addr);
            let err = body_error(&e, state.max_body_size);
            return reject(&state, request_id, &guarded, err, start_time);
        }
    };

    let guarded = GuardedRequest::new(parts.method.as_str(), path, bytes.to_vec(), headers)
        .with_remote_addr(remote_addr);

    let admission = match state.guard.check(&guarded).await {
        Ok(admission) => admission,
        Err(err) => return reject(&state, request_id, &guarded, err, start_time),
    };

    debug!(
        request_id = %request_id,
        client_ip = %admission.client_ip,
        method = %guarded.method(),
        path = %guarded.path(),
        "Request admitted"
    );

    write_audit(
        &state,
        AuditEntry::admitted(
            Utc::now().to_rfc3339(),
            request_id,
            guarded.method().to_string(),
            guarded.path().to_string(),
            admission.client_ip.clone(),
            start_time.elapsed().as_millis() as u64,
        ),
    );

    let mut request = Request::from_parts(parts, Body::from(bytes));
    request.extensions_mut().insert(RequestId(request_id));
    request.extensions_mut().insert(admission);
    next.run(request).await
}

/// Classify a body buffering failure.
///
/// Only an exceeded length limit is a 413; a truncated or otherwise
/// unreadable body is a bad request.
fn body_error(error: &axum::Error, limit: usize) -> GuardError {
    let mut source = Some(error as &(dyn StdError + 'static));
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return GuardError::PayloadTooLarge { max: limit };
        }
        source = err.source();
    }

    GuardError::BadRequest {
        message: error.to_string(),
    }
}

/// Log, audit and answer a rejected request.
fn reject(
    state: &AppState,
    request_id: Uuid,
    request: &GuardedRequest,
    err: GuardError,
    start_time: Instant,
) -> Response {
    let client_ip = resolve_client_ip(request);
    if matches!(err, GuardError::Cache { .. }) {
        error!(
            request_id = %request_id,
            client_ip = %client_ip,
            error = %err,
            "Guard cache failure, rejecting request"
        );
    } else {
        warn!(
            request_id = %request_id,
            client_ip = %client_ip,
            code = err.code(),
            error = %err,
            "Request rejected"
        );
    }

    write_audit(
        state,
        AuditEntry::rejected(
            Utc::now().to_rfc3339(),
            request_id,
            request.method().to_string(),
            request.path().to_string(),
            Some(client_ip),
            err.code().to_string(),
            err.to_string(),
            start_time.elapsed().as_millis() as u64,
        ),
    );

    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(GuardResponse::rejected(request_id, &err))).into_response()
}

fn write_audit(state: &AppState, entry: AuditEntry) {
    if let Some(logger) = &state.audit_logger {
        if let Err(e) = logger.log(&entry) {
            error!(error = %e, "Failed to write audit log entry");
        }
    }
}
