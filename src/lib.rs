//! Turnstile - first-come-first-serve claim admission service
//!
//! Users post shareable items with a fixed quota and a claim window; other
//! users race for the slots. The admission core serializes decisions per
//! post, so a hot post is safe under arbitrary concurrency without a global
//! lock and without over-allocating a single slot.
//!
//! ## Components
//!
//! - **Claim core** ([`claim`]): admission controller, claim ledger, typed
//!   decisions, persistence seam
//! - **Posts** ([`post`]): immutable post records and their registry
//! - **Services** ([`services`]): claim façade, rate limiter, notification seam
//! - **Cache** ([`cache`]): TTL snapshot cache for read paths
//! - **HTTP** ([`server`], [`routes`]): hyper front end

pub mod cache;
pub mod claim;
pub mod config;
pub mod post;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{PostId, Result, TurnstileError, UserId};
