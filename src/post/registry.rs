//! Post registry
//!
//! Thread-safe store of post records, keyed by post id. Creation validates
//! the structural invariants (`close_at > open_at`, quota at least one);
//! content rules like title length belong to the caller.
//!
//! Deletion does NOT live here: it must go through
//! [`AdmissionController::retire`](crate::claim::AdmissionController::retire)
//! so the record and the claim state are dropped under the same per-post
//! critical section.

use std::num::NonZeroU32;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::info;

use crate::post::record::{NewPost, Post};
use crate::types::{PostId, Result, TurnstileError, UserId};

/// Thread-safe registry of post records.
pub struct PostRegistry {
    posts: DashMap<PostId, Arc<Post>>,
}

impl PostRegistry {
    pub fn new() -> Self {
        Self {
            posts: DashMap::new(),
        }
    }

    /// Create a post from caller-supplied fields.
    pub fn create(&self, new: NewPost, owner: UserId, now: DateTime<Utc>) -> Result<Arc<Post>> {
        let quota = NonZeroU32::new(new.quota)
            .ok_or_else(|| TurnstileError::BadRequest("quota must be at least 1".into()))?;
        if new.close_at <= new.open_at {
            return Err(TurnstileError::BadRequest(
                "close_at must be after open_at".into(),
            ));
        }

        let post = Arc::new(Post {
            id: PostId::new(),
            owner,
            title: new.title,
            description: new.description,
            quota,
            open_at: new.open_at,
            close_at: new.close_at,
            tags: new.tags,
            created_at: now,
        });

        self.posts.insert(post.id, Arc::clone(&post));
        info!(post_id = %post.id, owner = %owner, quota = quota.get(), "post created");
        Ok(post)
    }

    pub fn get(&self, id: &PostId) -> Option<Arc<Post>> {
        self.posts.get(id).map(|e| Arc::clone(e.value()))
    }

    pub fn contains(&self, id: &PostId) -> bool {
        self.posts.contains_key(id)
    }

    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    /// List posts newest-first, starting strictly after the `after` cursor.
    ///
    /// The cursor is the id of the last post the caller saw; an unknown
    /// cursor yields an empty page rather than restarting from the top.
    pub fn list(&self, after: Option<PostId>, limit: usize) -> Vec<Arc<Post>> {
        let mut all: Vec<Arc<Post>> = self
            .posts
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();
        // Stable order: newest first, id as tiebreak
        all.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.0.cmp(&a.id.0))
        });

        let start = match after {
            Some(cursor) => match all.iter().position(|p| p.id == cursor) {
                Some(idx) => idx + 1,
                None => return Vec::new(),
            },
            None => 0,
        };

        all.into_iter().skip(start).take(limit).collect()
    }

    /// Raw removal of the record. Only the admission controller calls this,
    /// while holding the post's critical section.
    pub(crate) fn remove_unchecked(&self, id: &PostId) -> Option<Arc<Post>> {
        self.posts.remove(id).map(|(_, post)| post)
    }
}

impl Default for PostRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_post(quota: u32, open_min: i64, close_min: i64) -> NewPost {
        let now = Utc::now();
        NewPost {
            title: "camera kit".into(),
            description: "three loaner bodies".into(),
            quota,
            open_at: now + Duration::minutes(open_min),
            close_at: now + Duration::minutes(close_min),
            tags: vec!["gear".into()],
        }
    }

    #[test]
    fn create_validates_quota_and_window() {
        let registry = PostRegistry::new();
        let owner = UserId::new();
        let now = Utc::now();

        let err = registry.create(new_post(0, 0, 60), owner, now).unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");

        let err = registry.create(new_post(3, 60, 60), owner, now).unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");

        let post = registry.create(new_post(3, 0, 60), owner, now).unwrap();
        assert_eq!(post.quota.get(), 3);
        assert!(registry.contains(&post.id));
    }

    #[test]
    fn list_pages_newest_first() {
        let registry = PostRegistry::new();
        let owner = UserId::new();
        let base = Utc::now();

        let mut ids = Vec::new();
        for i in 0..5 {
            let mut np = new_post(1, 0, 60);
            np.title = format!("post {}", i);
            // Distinct creation times so ordering is deterministic
            let post = registry.create(np, owner, base + Duration::seconds(i)).unwrap();
            ids.push(post.id);
        }

        let first_page = registry.list(None, 2);
        assert_eq!(first_page.len(), 2);
        assert_eq!(first_page[0].id, ids[4]);
        assert_eq!(first_page[1].id, ids[3]);

        let second_page = registry.list(Some(first_page[1].id), 2);
        assert_eq!(second_page.len(), 2);
        assert_eq!(second_page[0].id, ids[2]);

        // Unknown cursor yields an empty page
        assert!(registry.list(Some(PostId::new()), 2).is_empty());
    }
}
