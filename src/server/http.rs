//! HTTP server implementation
//!
//! hyper http1 with TokioIo, a `service_fn` per connection and a
//! `match (method, path)` router. No framework; the route surface is small
//! enough that the match IS the routing table.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::cache::{self, CacheConfig, SnapshotCache};
use crate::claim::AdmissionController;
use crate::config::Args;
use crate::post::PostRegistry;
use crate::routes;
use crate::services::{ClaimService, LogNotifier, RateLimiter};
use crate::types::TurnstileError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub started_at: Instant,
    /// Post records; creation and lookup only, deletion goes through claims
    pub registry: Arc<PostRegistry>,
    /// The admission core - sole owner of claim state
    pub controller: Arc<AdmissionController>,
    /// Claim service façade over the controller
    pub claims: ClaimService,
    /// TTL cache for post snapshots on the read paths
    pub snapshots: Arc<SnapshotCache>,
    /// Per-caller throttle for the claim endpoints
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(args: Args) -> Self {
        let registry = Arc::new(PostRegistry::new());
        let controller = Arc::new(AdmissionController::new(Arc::clone(&registry)));
        let claims = ClaimService::new(
            Arc::clone(&registry),
            Arc::clone(&controller),
            Arc::new(LogNotifier),
        );
        let snapshots = Arc::new(SnapshotCache::new(CacheConfig {
            ttl: Duration::from_secs(args.snapshot_ttl_seconds),
            max_entries: args.snapshot_max_entries,
        }));
        let limiter = RateLimiter::new(
            Duration::from_secs(args.claim_rate_window_seconds),
            args.claim_rate_limit,
        );

        Self {
            args,
            started_at: Instant::now(),
            registry,
            controller,
            claims,
            snapshots,
            limiter,
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), TurnstileError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Turnstile listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    // Start snapshot cache cleanup task
    cache::spawn_cleanup_task(
        Arc::clone(&state.snapshots),
        Duration::from_secs(state.args.snapshot_cleanup_seconds),
    );
    info!(
        "Snapshot cache enabled (ttl {}s, max {} entries)",
        state.args.snapshot_ttl_seconds, state.args.snapshot_max_entries
    );

    // Sweep idle rate-limiter keys once per window
    {
        let state = Arc::clone(&state);
        let every = Duration::from_secs(state.args.claim_rate_window_seconds.max(60));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                state.limiter.sweep();
            }
        });
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        // Post collection
        (Method::POST, "/api/posts") => {
            routes::handle_create_post(req, Arc::clone(&state), addr).await
        }
        (Method::GET, "/api/posts") => routes::handle_list_posts(req, Arc::clone(&state)).await,

        // Claim and post items: /api/claims/{id}, /api/posts/{id}
        (method, path) => {
            if let Some(post_id) = path.strip_prefix("/api/claims/") {
                match method {
                    Method::POST => {
                        routes::handle_claim(req, Arc::clone(&state), post_id, addr).await
                    }
                    Method::DELETE => {
                        routes::handle_unclaim(req, Arc::clone(&state), post_id, addr).await
                    }
                    _ => routes::not_found_response(path),
                }
            } else if let Some(post_id) = path.strip_prefix("/api/posts/") {
                match method {
                    Method::GET => routes::handle_get_post(Arc::clone(&state), post_id).await,
                    Method::DELETE => {
                        routes::handle_delete_post(req, Arc::clone(&state), post_id).await
                    }
                    _ => routes::not_found_response(path),
                }
            } else {
                routes::not_found_response(path)
            }
        }
    };

    Ok(response)
}
