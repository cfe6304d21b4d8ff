// ── Request handlers ──
//
// Two response families, mirroring the real backend: the console family
// wraps everything in the `{success, data, message}` envelope and stays
// on HTTP 200 even for refusals; the home, guest, security, and
// telemetry families return their documented bodies and signal misses
// with a non-2xx plus a `{message}` body.

pub(crate) mod auth;
pub(crate) mod console;
pub(crate) mod guest;
pub(crate) mod home;
pub(crate) mod security;
pub(crate) mod telemetry;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use doma_api::types::{Ack, Envelope};
use serde::Serialize;

/// 200 envelope around a payload.
fn accepted<T: Serialize>(data: T) -> Response {
    Json(Envelope::ok(data)).into_response()
}

/// 200 envelope with no payload, for delete acknowledgements.
fn accepted_empty() -> Response {
    Json(Envelope::<Ack>::ok_empty()).into_response()
}

/// 200 envelope refusing the request.
fn rejected(message: &str) -> Response {
    Json(Envelope::<Ack>::rejected(message)).into_response()
}

/// Bare-family miss: 404 plus a message body.
fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(Ack::new(message))).into_response()
}

/// Bare-family refusal: 400 plus a message body.
fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(Ack::new(message))).into_response()
}
