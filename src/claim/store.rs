//! Claim persistence contract
//!
//! The controller consults the store inside the post's critical section,
//! BEFORE touching the in-memory ledger: if the store refuses, the decision
//! is abandoned and no state changes. Implementations own the other half of
//! the bargain — the per-post write must be atomic, and should stay short
//! because the post's critical section is held across it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;

use crate::types::{PostId, UserId};

/// Failure reported by a store backend.
#[derive(Debug, thiserror::Error)]
#[error("claim store unavailable: {0}")]
pub struct StoreError(pub String);

/// Durable record of admission decisions.
#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Record a successful admission of `user` on `post`.
    async fn record_claim(
        &self,
        post: PostId,
        user: UserId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Record a successful release of `user`'s claim on `post`.
    async fn record_release(
        &self,
        post: PostId,
        user: UserId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Record the retirement of `post` and all its live claims.
    async fn record_retire(&self, post: PostId) -> Result<(), StoreError>;
}

/// One recorded store event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalEntry {
    Claim { post: PostId, user: UserId },
    Release { post: PostId, user: UserId },
    Retire { post: PostId },
}

/// In-memory store: infallible, so the critical section never waits on I/O.
///
/// Keeps a journal of recorded events, which doubles as the inspection
/// surface in tests.
#[derive(Default)]
pub struct MemoryStore {
    journal: Mutex<Vec<JournalEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn journal(&self) -> Vec<JournalEntry> {
        self.journal.lock().expect("journal lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.journal.lock().expect("journal lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, entry: JournalEntry) {
        self.journal.lock().expect("journal lock poisoned").push(entry);
    }
}

#[async_trait]
impl ClaimStore for MemoryStore {
    async fn record_claim(
        &self,
        post: PostId,
        user: UserId,
        _at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.push(JournalEntry::Claim { post, user });
        Ok(())
    }

    async fn record_release(
        &self,
        post: PostId,
        user: UserId,
        _at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.push(JournalEntry::Release { post, user });
        Ok(())
    }

    async fn record_retire(&self, post: PostId) -> Result<(), StoreError> {
        self.push(JournalEntry::Retire { post });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn journal_records_in_order() {
        let store = MemoryStore::new();
        let post = PostId::new();
        let user = UserId::new();
        let now = Utc::now();

        store.record_claim(post, user, now).await.unwrap();
        store.record_release(post, user, now).await.unwrap();
        store.record_retire(post).await.unwrap();

        assert_eq!(
            store.journal(),
            vec![
                JournalEntry::Claim { post, user },
                JournalEntry::Release { post, user },
                JournalEntry::Retire { post },
            ]
        );
    }
}
