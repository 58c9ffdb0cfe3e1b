//! Post records and the post registry
//!
//! Posts are the things users race to claim. Identity, quota and the claim
//! window are fixed at creation; the only mutable state a post carries is
//! its claim state, and that is owned by the admission controller, not by
//! this module.

pub mod record;
pub mod registry;

pub use record::{NewPost, Post, PostPhase, PostSnapshot};
pub use registry::PostRegistry;
