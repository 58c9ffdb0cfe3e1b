//! Claim admission core
//!
//! Decides, under concurrent callers, who gets one of a post's fixed number
//! of slots on a first-come-first-serve basis. The moving parts:
//!
//! - **Ledger**: per-post claimant sets behind per-post async mutexes. The
//!   live claim count is the set size, so count and membership cannot diverge.
//! - **Admission controller**: the only writer of claim state. Every
//!   evaluation for a given post runs inside that post's critical section;
//!   admission order is the order callers enter it. Posts never contend with
//!   each other.
//! - **Store**: persistence seam, consulted before the in-memory mutation so
//!   a backend fault leaves state untouched.
//!
//! The core knows nothing about HTTP, identity headers or caching; it takes
//! `(post_id, user_id, now)` and returns a typed decision.

pub mod admission;
pub mod decision;
pub mod ledger;
pub mod store;

pub use admission::AdmissionController;
pub use decision::{ClaimDecision, UnclaimDecision};
pub use ledger::{ClaimLedger, PostSlots};
pub use store::{ClaimStore, MemoryStore, StoreError};
