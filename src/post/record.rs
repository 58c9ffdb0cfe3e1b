//! Post record types

use std::num::NonZeroU32;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{PostId, UserId};

/// A shareable post with a fixed number of claimable slots.
///
/// Immutable after creation. Changing a live post's quota or window is out
/// of scope — reject and recreate instead.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: PostId,
    pub owner: UserId,
    pub title: String,
    pub description: String,
    /// Total claimable slots, at least one.
    pub quota: NonZeroU32,
    /// Start of the claim window, inclusive.
    pub open_at: DateTime<Utc>,
    /// End of the claim window, inclusive. Always after `open_at`.
    pub close_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Whether `now` falls inside the claim window.
    pub fn window_contains(&self, now: DateTime<Utc>) -> bool {
        now >= self.open_at && now <= self.close_at
    }

    /// Lifecycle phase as of `now`, derived from the window.
    pub fn phase(&self, now: DateTime<Utc>) -> PostPhase {
        if now < self.open_at {
            PostPhase::Scheduled
        } else if now > self.close_at {
            PostPhase::Closed
        } else {
            PostPhase::Open
        }
    }
}

/// Derived lifecycle phase of a post. Never stored; computed from the
/// window at read time so it cannot drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostPhase {
    Scheduled,
    Open,
    Closed,
}

/// Fields supplied by the caller when creating a post.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub quota: u32,
    pub open_at: DateTime<Utc>,
    pub close_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Read model of a post plus its current claim state.
///
/// Built only through the admission controller's snapshot operation, so
/// nothing outside the critical section ever reads the raw claim count.
#[derive(Debug, Clone, Serialize)]
pub struct PostSnapshot {
    pub id: PostId,
    pub owner: UserId,
    pub title: String,
    pub description: String,
    pub quota: u32,
    pub open_at: DateTime<Utc>,
    pub close_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub phase: PostPhase,
    pub claim_count: u32,
    pub remaining: u32,
}

impl PostSnapshot {
    pub fn new(post: &Post, claim_count: usize, now: DateTime<Utc>) -> Self {
        let quota = post.quota.get();
        let claim_count = claim_count as u32;
        Self {
            id: post.id,
            owner: post.owner,
            title: post.title.clone(),
            description: post.description.clone(),
            quota,
            open_at: post.open_at,
            close_at: post.close_at,
            tags: post.tags.clone(),
            created_at: post.created_at,
            phase: post.phase(now),
            claim_count,
            remaining: quota.saturating_sub(claim_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn post(open_offset_min: i64, close_offset_min: i64) -> (Post, DateTime<Utc>) {
        let now = Utc::now();
        let post = Post {
            id: PostId::new(),
            owner: UserId::new(),
            title: "test".into(),
            description: "test".into(),
            quota: NonZeroU32::new(3).unwrap(),
            open_at: now + Duration::minutes(open_offset_min),
            close_at: now + Duration::minutes(close_offset_min),
            tags: vec![],
            created_at: now,
        };
        (post, now)
    }

    #[test]
    fn phase_follows_window() {
        let (p, now) = post(10, 70);
        assert_eq!(p.phase(now), PostPhase::Scheduled);
        assert_eq!(p.phase(now + Duration::minutes(30)), PostPhase::Open);
        assert_eq!(p.phase(now + Duration::minutes(80)), PostPhase::Closed);
    }

    #[test]
    fn window_is_closed_interval() {
        let (p, _) = post(10, 70);
        assert!(p.window_contains(p.open_at));
        assert!(p.window_contains(p.close_at));
        assert!(!p.window_contains(p.open_at - Duration::seconds(1)));
        assert!(!p.window_contains(p.close_at + Duration::seconds(1)));
    }

    #[test]
    fn snapshot_remaining_never_underflows() {
        let (p, now) = post(-10, 70);
        let snap = PostSnapshot::new(&p, 5, now);
        assert_eq!(snap.remaining, 0);
        assert_eq!(snap.claim_count, 5);
    }
}
