//! Claim routes
//!
//! - `POST   /api/claims/{post_id}` - claim a slot
//! - `DELETE /api/claims/{post_id}` - release a claim
//!
//! Authentication is an external collaborator: the fronting proxy places the
//! caller's identity in `X-User-Id`, mirroring how the original platform
//! trusts its session principal. Malformed identity is a 400, a missing one
//! a 401, both before any core work happens.
//!
//! Rate limiting runs first, keyed by the claimed identity when one is
//! present and by the client address otherwise, so anonymous floods cannot
//! bypass the throttle.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use tracing::debug;

use crate::routes::{error_response, json_response};
use crate::server::AppState;
use crate::types::{PostId, TurnstileError, UserId};

/// Rate-limit key: identity header if present, client address otherwise.
fn limit_key(req: &Request<Incoming>, addr: SocketAddr) -> String {
    match req.headers().get("X-User-Id").and_then(|h| h.to_str().ok()) {
        Some(user) if !user.is_empty() => format!("claims-{}", user),
        _ => format!("claims-{}", addr.ip()),
    }
}

/// Caller identity, or the error response to send back.
fn identity(req: &Request<Incoming>) -> Result<UserId, Response<Full<Bytes>>> {
    match req.headers().get("X-User-Id") {
        Some(raw) => UserId::from_str(raw.to_str().unwrap_or("")).map_err(|_| {
            error_response(&TurnstileError::BadRequest(
                "X-User-Id must be a UUID".into(),
            ))
        }),
        None => Err(json_response(
            StatusCode::UNAUTHORIZED,
            &serde_json::json!({
                "error": "Missing X-User-Id header",
                "code": "UNAUTHENTICATED",
            }),
        )),
    }
}

fn parse_post_id(raw: &str) -> Result<PostId, Response<Full<Bytes>>> {
    PostId::from_str(raw).map_err(|_| {
        error_response(&TurnstileError::BadRequest("post id must be a UUID".into()))
    })
}

/// Handle POST /api/claims/{post_id}
pub async fn handle_claim(
    req: Request<Incoming>,
    state: Arc<AppState>,
    raw_post_id: &str,
    addr: SocketAddr,
) -> Response<Full<Bytes>> {
    if !state.limiter.check_and_record(&limit_key(&req, addr)) {
        return error_response(&TurnstileError::RateLimited(
            "claim attempts exhausted, retry later".into(),
        ));
    }

    let post_id = match parse_post_id(raw_post_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let user_id = match identity(&req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    debug!(post_id = %post_id, user_id = %user_id, "claim request");

    match state.claims.claim(post_id, user_id, chrono::Utc::now()).await {
        Ok(receipt) => {
            state.snapshots.invalidate(&post_id);
            json_response(StatusCode::OK, &receipt)
        }
        Err(err) => error_response(&err),
    }
}

/// Handle DELETE /api/claims/{post_id}
pub async fn handle_unclaim(
    req: Request<Incoming>,
    state: Arc<AppState>,
    raw_post_id: &str,
    addr: SocketAddr,
) -> Response<Full<Bytes>> {
    if !state.limiter.check_and_record(&limit_key(&req, addr)) {
        return error_response(&TurnstileError::RateLimited(
            "claim attempts exhausted, retry later".into(),
        ));
    }

    let post_id = match parse_post_id(raw_post_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let user_id = match identity(&req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    debug!(post_id = %post_id, user_id = %user_id, "unclaim request");

    match state
        .claims
        .unclaim(post_id, user_id, chrono::Utc::now())
        .await
    {
        Ok(receipt) => {
            state.snapshots.invalidate(&post_id);
            json_response(StatusCode::OK, &receipt)
        }
        Err(err) => error_response(&err),
    }
}
