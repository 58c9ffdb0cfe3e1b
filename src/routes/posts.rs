//! Post routes
//!
//! - `POST   /api/posts`            - create a post
//! - `GET    /api/posts`            - list snapshots, newest first, cursor paged
//! - `GET    /api/posts/{post_id}`  - single snapshot (cache-served)
//! - `DELETE /api/posts/{post_id}`  - delete a post through the controller
//!
//! Snapshots come from the admission controller's read-only view; nothing
//! here reads claim counts directly.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

use crate::post::NewPost;
use crate::routes::{error_response, json_response};
use crate::server::AppState;
use crate::types::{PostId, TurnstileError, UserId};

#[derive(Serialize)]
struct PostListResponse {
    posts: Vec<crate::post::PostSnapshot>,
    /// Cursor for the next page; absent when this page is the last.
    #[serde(skip_serializing_if = "Option::is_none")]
    next: Option<PostId>,
}

#[derive(Serialize)]
struct PostDeleteResponse {
    deleted: PostId,
    /// Claims that were live when the post went away.
    displaced_claims: usize,
}

fn parse_post_id(raw: &str) -> Result<PostId, Response<Full<Bytes>>> {
    PostId::from_str(raw).map_err(|_| {
        error_response(&TurnstileError::BadRequest("post id must be a UUID".into()))
    })
}

fn owner_identity(req: &Request<Incoming>) -> Result<UserId, Response<Full<Bytes>>> {
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

/// Handle POST /api/posts
pub async fn handle_create_post(
    req: Request<Incoming>,
    state: Arc<AppState>,
    addr: SocketAddr,
) -> Response<Full<Bytes>> {
    let owner = match owner_identity(&req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(addr = %addr, "failed to read post body: {}", e);
            return error_response(&TurnstileError::BadRequest("unreadable body".into()));
        }
    };

    let new_post: NewPost = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            return error_response(&TurnstileError::BadRequest(format!("invalid post: {}", e)))
        }
    };

    let now = chrono::Utc::now();
    match state.registry.create(new_post, owner, now) {
        Ok(post) => {
            debug!(post_id = %post.id, owner = %owner, "post created via API");
            match state.controller.snapshot(&post.id, now).await {
                Some(snapshot) => json_response(StatusCode::CREATED, &snapshot),
                None => error_response(&TurnstileError::Internal(
                    "post vanished during creation".into(),
                )),
            }
        }
        Err(err) => error_response(&err),
    }
}

/// Handle GET /api/posts
///
/// Query parameters: `after` (cursor post id) and `limit`.
pub async fn handle_list_posts(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let query = req.uri().query().unwrap_or("");
    let mut after: Option<PostId> = None;
    let mut limit = state.args.list_page_size;

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        match key {
            "after" => match PostId::from_str(value) {
                Ok(id) => after = Some(id),
                Err(_) => {
                    return error_response(&TurnstileError::BadRequest(
                        "after must be a post id".into(),
                    ))
                }
            },
            "limit" => match value.parse::<usize>() {
                Ok(n) if n >= 1 => limit = n.min(state.args.list_page_max),
                _ => {
                    return error_response(&TurnstileError::BadRequest(
                        "limit must be a positive integer".into(),
                    ))
                }
            },
            _ => {}
        }
    }

    let now = chrono::Utc::now();
    let page = state.registry.list(after, limit);
    let mut snapshots = Vec::with_capacity(page.len());
    for post in &page {
        // A post retired mid-listing just drops off the page.
        if let Some(snap) = state.controller.snapshot(&post.id, now).await {
            snapshots.push(snap);
        }
    }

    let next = (snapshots.len() == limit).then(|| snapshots[snapshots.len() - 1].id);
    json_response(StatusCode::OK, &PostListResponse { posts: snapshots, next })
}

/// Handle GET /api/posts/{post_id}
pub async fn handle_get_post(
    state: Arc<AppState>,
    raw_post_id: &str,
) -> Response<Full<Bytes>> {
    let post_id = match parse_post_id(raw_post_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if let Some(snapshot) = state.snapshots.get(&post_id) {
        return json_response(StatusCode::OK, &snapshot);
    }

    match state.controller.snapshot(&post_id, chrono::Utc::now()).await {
        Some(snapshot) => {
            state.snapshots.put(snapshot.clone());
            json_response(StatusCode::OK, &snapshot)
        }
        None => error_response(&TurnstileError::NotFound(post_id.to_string())),
    }
}

/// Handle DELETE /api/posts/{post_id}
pub async fn handle_delete_post(
    req: Request<Incoming>,
    state: Arc<AppState>,
    raw_post_id: &str,
) -> Response<Full<Bytes>> {
    let post_id = match parse_post_id(raw_post_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    // Deletion is authenticated like every other mutation; authorization
    // beyond that (owner or moderator) is the collaborator's concern.
    if let Err(resp) = owner_identity(&req) {
        return resp;
    }

    match state.claims.remove_post(post_id).await {
        Ok(displaced) => {
            state.snapshots.invalidate(&post_id);
            json_response(
                StatusCode::OK,
                &PostDeleteResponse {
                    deleted: post_id,
                    displaced_claims: displaced,
                },
            )
        }
        Err(err) => error_response(&err),
    }
}
