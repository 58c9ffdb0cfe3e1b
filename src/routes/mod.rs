//! HTTP routes for Turnstile

pub mod claims;
pub mod health;
pub mod posts;

pub use claims::{handle_claim, handle_unclaim};
pub use health::{health_check, version_info};
pub use posts::{handle_create_post, handle_delete_post, handle_get_post, handle_list_posts};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::types::TurnstileError;

/// Build a JSON response with the given status
pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(body)
        .unwrap_or_else(|_| r#"{"error":"Serialization failed"}"#.to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: &'static str,
}

/// Map a service error onto its status code and JSON body
pub(crate) fn error_response(err: &TurnstileError) -> Response<Full<Bytes>> {
    json_response(
        err.status_code(),
        &ErrorBody {
            error: &err.to_string(),
            code: err.code(),
        },
    )
}

/// 404 for unmatched paths
pub(crate) fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    error_response(&TurnstileError::NotFound(path.to_string()))
}
