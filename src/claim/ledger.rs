//! Claim ledger
//!
//! The authoritative record of which users hold live claims on which posts.
//! Each post's claimant set lives behind its own async mutex; the admission
//! controller locks it for the duration of a decision. The claim count is
//! the set size, never a separately maintained counter.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::types::{PostId, UserId};

/// Live claim state for a single post.
///
/// Only ever mutated while the post's mutex is held.
#[derive(Debug, Default)]
pub struct PostSlots {
    claimants: HashMap<UserId, DateTime<Utc>>,
}

impl PostSlots {
    /// Number of live claims. This IS the post's claim count.
    pub fn claim_count(&self) -> usize {
        self.claimants.len()
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.claimants.contains_key(user)
    }

    /// Record a claim. Returns false if the user already held one.
    pub fn insert(&mut self, user: UserId, at: DateTime<Utc>) -> bool {
        self.claimants.insert(user, at).is_none()
    }

    /// Remove a claim. Returns false if the user held none.
    pub fn remove(&mut self, user: &UserId) -> bool {
        self.claimants.remove(user).is_some()
    }

    /// When the user's live claim was admitted, if any.
    pub fn claimed_at(&self, user: &UserId) -> Option<DateTime<Utc>> {
        self.claimants.get(user).copied()
    }

    /// Users currently holding a claim, in no particular order.
    pub fn claimants(&self) -> Vec<UserId> {
        self.claimants.keys().copied().collect()
    }
}

/// Arena of per-post claim state, keyed by post id.
///
/// Entries are created lazily on first use and reused for the post's
/// lifetime. Looking up two different posts never contends; looking up the
/// same post hands out the same `Arc`, which is what serializes decisions.
pub struct ClaimLedger {
    posts: DashMap<PostId, Arc<Mutex<PostSlots>>>,
}

impl ClaimLedger {
    pub fn new() -> Self {
        Self {
            posts: DashMap::new(),
        }
    }

    /// Entry for a post, created empty if the post was never claimed against.
    pub fn entry(&self, post: PostId) -> Arc<Mutex<PostSlots>> {
        self.posts
            .entry(post)
            .or_insert_with(|| Arc::new(Mutex::new(PostSlots::default())))
            .clone()
    }

    /// Existing entry, without creating one.
    pub fn get(&self, post: &PostId) -> Option<Arc<Mutex<PostSlots>>> {
        self.posts.get(post).map(|e| Arc::clone(e.value()))
    }

    /// Drop a post's entry. Safe once the post's registry record is gone:
    /// late callers holding the old entry re-check the registry and bail.
    pub fn remove(&self, post: &PostId) {
        self.posts.remove(post);
    }

    /// Number of posts with ledger state.
    pub fn post_count(&self) -> usize {
        self.posts.len()
    }
}

impl Default for ClaimLedger {
    fn default() -> Self {
        Self::new()
    }
}
