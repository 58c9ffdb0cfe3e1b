//! Admission controller
//!
//! The single arbiter of whether a claim or unclaim succeeds for a given
//! post. All decisions for one post are evaluated inside that post's async
//! mutex, so "first come first serve" is the order callers enter the
//! critical section — never a comparison of client-supplied timestamps.
//! Decisions on different posts proceed in parallel.
//!
//! Precondition order on claim, first failure wins:
//! post exists → window open → window not closed → not already claimed →
//! slot free. Unclaim is allowed after close: closing is a one-way gate on
//! new admissions, not on releases.
//!
//! The caller supplies `now`, which keeps every decision deterministic
//! under test. A caller that gives up while waiting for the critical
//! section leaves no trace; once inside, the decision runs to completion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::claim::decision::{ClaimDecision, UnclaimDecision};
use crate::claim::ledger::ClaimLedger;
use crate::claim::store::{ClaimStore, MemoryStore};
use crate::post::{PostRegistry, PostSnapshot};
use crate::types::{PostId, Result, TurnstileError, UserId};

/// Serializes claim state changes per post and owns all of them.
///
/// Nothing else in the process mutates claim state; everything else reads
/// it through [`snapshot`](Self::snapshot).
pub struct AdmissionController {
    registry: Arc<PostRegistry>,
    ledger: ClaimLedger,
    store: Arc<dyn ClaimStore>,
}

impl AdmissionController {
    /// Controller backed by the in-memory store.
    pub fn new(registry: Arc<PostRegistry>) -> Self {
        Self::with_store(registry, Arc::new(MemoryStore::new()))
    }

    /// Controller with a caller-provided persistence backend.
    pub fn with_store(registry: Arc<PostRegistry>, store: Arc<dyn ClaimStore>) -> Self {
        Self {
            registry,
            ledger: ClaimLedger::new(),
            store,
        }
    }

    /// Attempt to claim a slot on `post_id` for `user_id` as of `now`.
    pub async fn try_claim(
        &self,
        post_id: PostId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<ClaimDecision> {
        // Cheap probe before queuing on the post's mutex. Existence is
        // re-checked under the lock; this only avoids creating ledger
        // entries for posts that never existed.
        if !self.registry.contains(&post_id) {
            return Ok(ClaimDecision::NotFound);
        }

        let entry = self.ledger.entry(post_id);
        let mut slots = entry.lock().await;

        // Re-resolve under the lock: a concurrent retire may have won the
        // race between the probe above and lock acquisition.
        let Some(post) = self.registry.get(&post_id) else {
            drop(slots);
            self.ledger.remove(&post_id);
            return Ok(ClaimDecision::NotFound);
        };

        if now < post.open_at {
            debug!(post_id = %post_id, user_id = %user_id, "claim before window");
            return Ok(ClaimDecision::NotYetOpen);
        }
        if now > post.close_at {
            debug!(post_id = %post_id, user_id = %user_id, "claim after window");
            return Ok(ClaimDecision::Closed);
        }
        if slots.contains(&user_id) {
            return Ok(ClaimDecision::AlreadyClaimed);
        }

        let quota = post.quota.get() as usize;
        if slots.claim_count() >= quota {
            return Ok(ClaimDecision::QuotaFull);
        }

        // Persist before mutating: if the store refuses, nothing changed.
        self.store
            .record_claim(post_id, user_id, now)
            .await
            .map_err(|e| TurnstileError::Unavailable(e.to_string()))?;

        slots.insert(user_id, now);
        let remaining = (quota - slots.claim_count()) as u32;
        info!(post_id = %post_id, user_id = %user_id, remaining, "claim admitted");
        Ok(ClaimDecision::Admitted { remaining })
    }

    /// Attempt to release `user_id`'s claim on `post_id` as of `now`.
    ///
    /// Allowed after the window closes; the freed slot simply stays
    /// unclaimed because new admissions are gated on the window.
    pub async fn try_unclaim(
        &self,
        post_id: PostId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<UnclaimDecision> {
        if !self.registry.contains(&post_id) {
            return Ok(UnclaimDecision::NotFound);
        }

        let entry = self.ledger.entry(post_id);
        let mut slots = entry.lock().await;

        let Some(post) = self.registry.get(&post_id) else {
            drop(slots);
            self.ledger.remove(&post_id);
            return Ok(UnclaimDecision::NotFound);
        };

        if !slots.contains(&user_id) {
            return Ok(UnclaimDecision::NotClaimed);
        }

        self.store
            .record_release(post_id, user_id, now)
            .await
            .map_err(|e| TurnstileError::Unavailable(e.to_string()))?;

        slots.remove(&user_id);
        let quota = post.quota.get() as usize;
        let remaining = (quota - slots.claim_count()) as u32;
        info!(post_id = %post_id, user_id = %user_id, remaining, "claim released");
        Ok(UnclaimDecision::Released { remaining })
    }

    /// Retire a post: drop its record and its claim state under the same
    /// critical section, so no claim can race the deletion.
    ///
    /// Returns the users whose claims were live at retirement, for the
    /// caller to notify. No further cascade.
    pub async fn retire(&self, post_id: PostId) -> Result<Vec<UserId>> {
        let entry = self.ledger.entry(post_id);
        let slots = entry.lock().await;

        if self.registry.get(&post_id).is_none() {
            drop(slots);
            self.ledger.remove(&post_id);
            return Err(TurnstileError::NotFound(post_id.to_string()));
        }

        self.store
            .record_retire(post_id)
            .await
            .map_err(|e| TurnstileError::Unavailable(e.to_string()))?;

        let survivors = slots.claimants();
        // Remove the record while the lock is held: claimers waiting on
        // this mutex re-check the registry and observe NotFound.
        self.registry.remove_unchecked(&post_id);
        drop(slots);
        self.ledger.remove(&post_id);

        info!(post_id = %post_id, live_claims = survivors.len(), "post retired");
        Ok(survivors)
    }

    /// Read-only view of a post and its claim state as of `now`.
    pub async fn snapshot(&self, post_id: &PostId, now: DateTime<Utc>) -> Option<PostSnapshot> {
        let post = self.registry.get(post_id)?;
        let count = match self.ledger.get(post_id) {
            Some(entry) => entry.lock().await.claim_count(),
            None => 0,
        };
        Some(PostSnapshot::new(&post, count, now))
    }

    /// Current live claim count, if the post exists.
    pub async fn claim_count(&self, post_id: &PostId) -> Option<usize> {
        if !self.registry.contains(post_id) {
            return None;
        }
        match self.ledger.get(post_id) {
            Some(entry) => Some(entry.lock().await.claim_count()),
            None => Some(0),
        }
    }

    /// Whether `user_id` currently holds a claim on `post_id`.
    pub async fn holds_claim(&self, post_id: &PostId, user_id: &UserId) -> bool {
        match self.ledger.get(post_id) {
            Some(entry) => entry.lock().await.contains(user_id),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::store::StoreError;
    use crate::post::NewPost;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::num::NonZeroU32;

    struct Fixture {
        registry: Arc<PostRegistry>,
        controller: AdmissionController,
        base: DateTime<Utc>,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Arc::new(PostRegistry::new());
            let controller = AdmissionController::new(Arc::clone(&registry));
            Self {
                registry,
                controller,
                base: Utc::now(),
            }
        }

        /// Post with `quota` slots opening at T+10m and closing at T+70m.
        fn post(&self, quota: u32) -> PostId {
            let new = NewPost {
                title: "loaner".into(),
                description: "first come first serve".into(),
                quota,
                open_at: self.base + Duration::minutes(10),
                close_at: self.base + Duration::minutes(70),
                tags: vec![],
            };
            self.registry
                .create(new, UserId::new(), self.base)
                .unwrap()
                .id
        }

        fn at(&self, minutes: i64) -> DateTime<Utc> {
            self.base + Duration::minutes(minutes)
        }
    }

    #[tokio::test]
    async fn window_walk() {
        let fx = Fixture::new();
        let post = fx.post(3);
        let user = UserId::new();

        let d = fx.controller.try_claim(post, user, fx.at(5)).await.unwrap();
        assert_eq!(d, ClaimDecision::NotYetOpen);

        let d = fx.controller.try_claim(post, user, fx.at(30)).await.unwrap();
        assert_eq!(d, ClaimDecision::Admitted { remaining: 2 });

        let other = UserId::new();
        let d = fx.controller.try_claim(post, other, fx.at(80)).await.unwrap();
        assert_eq!(d, ClaimDecision::Closed);
    }

    #[tokio::test]
    async fn window_bounds_are_inclusive() {
        let fx = Fixture::new();
        let post = fx.post(2);

        let d = fx
            .controller
            .try_claim(post, UserId::new(), fx.at(10))
            .await
            .unwrap();
        assert!(d.is_admitted());

        let d = fx
            .controller
            .try_claim(post, UserId::new(), fx.at(70))
            .await
            .unwrap();
        assert!(d.is_admitted());
    }

    #[tokio::test]
    async fn second_claim_by_same_user_is_rejected() {
        let fx = Fixture::new();
        let post = fx.post(3);
        let user = UserId::new();

        assert!(fx
            .controller
            .try_claim(post, user, fx.at(30))
            .await
            .unwrap()
            .is_admitted());
        let d = fx.controller.try_claim(post, user, fx.at(31)).await.unwrap();
        assert_eq!(d, ClaimDecision::AlreadyClaimed);
        assert_eq!(fx.controller.claim_count(&post).await, Some(1));
    }

    #[tokio::test]
    async fn quota_full_after_quota_admissions() {
        let fx = Fixture::new();
        let post = fx.post(2);

        assert_eq!(
            fx.controller
                .try_claim(post, UserId::new(), fx.at(30))
                .await
                .unwrap(),
            ClaimDecision::Admitted { remaining: 1 }
        );
        assert_eq!(
            fx.controller
                .try_claim(post, UserId::new(), fx.at(30))
                .await
                .unwrap(),
            ClaimDecision::Admitted { remaining: 0 }
        );
        assert_eq!(
            fx.controller
                .try_claim(post, UserId::new(), fx.at(30))
                .await
                .unwrap(),
            ClaimDecision::QuotaFull
        );
        assert_eq!(fx.controller.claim_count(&post).await, Some(2));
    }

    #[tokio::test]
    async fn already_claimed_wins_over_quota_full() {
        // Precondition order: a holder re-claiming a full post must see
        // AlreadyClaimed, not QuotaFull.
        let fx = Fixture::new();
        let post = fx.post(1);
        let holder = UserId::new();

        assert!(fx
            .controller
            .try_claim(post, holder, fx.at(30))
            .await
            .unwrap()
            .is_admitted());
        let d = fx
            .controller
            .try_claim(post, holder, fx.at(31))
            .await
            .unwrap();
        assert_eq!(d, ClaimDecision::AlreadyClaimed);
    }

    #[tokio::test]
    async fn window_wins_over_quota_full() {
        // A full post claimed before open still reports NotYetOpen.
        let fx = Fixture::new();
        let post = fx.post(1);

        assert!(fx
            .controller
            .try_claim(post, UserId::new(), fx.at(30))
            .await
            .unwrap()
            .is_admitted());
        let d = fx
            .controller
            .try_claim(post, UserId::new(), fx.at(5))
            .await
            .unwrap();
        assert_eq!(d, ClaimDecision::NotYetOpen);
    }

    #[tokio::test]
    async fn release_reuses_slot() {
        let fx = Fixture::new();
        let post = fx.post(1);
        let first = UserId::new();
        let second = UserId::new();

        assert!(fx
            .controller
            .try_claim(post, first, fx.at(30))
            .await
            .unwrap()
            .is_admitted());
        assert_eq!(
            fx.controller
                .try_claim(post, second, fx.at(31))
                .await
                .unwrap(),
            ClaimDecision::QuotaFull
        );

        assert_eq!(
            fx.controller
                .try_unclaim(post, first, fx.at(32))
                .await
                .unwrap(),
            UnclaimDecision::Released { remaining: 1 }
        );
        assert_eq!(
            fx.controller
                .try_claim(post, second, fx.at(33))
                .await
                .unwrap(),
            ClaimDecision::Admitted { remaining: 0 }
        );
        assert_eq!(fx.controller.claim_count(&post).await, Some(1));
    }

    #[tokio::test]
    async fn unclaim_without_claim_is_rejected() {
        let fx = Fixture::new();
        let post = fx.post(2);

        let d = fx
            .controller
            .try_unclaim(post, UserId::new(), fx.at(30))
            .await
            .unwrap();
        assert_eq!(d, UnclaimDecision::NotClaimed);
        assert_eq!(fx.controller.claim_count(&post).await, Some(0));
    }

    #[tokio::test]
    async fn unclaim_after_close_releases_but_does_not_reopen() {
        let fx = Fixture::new();
        let post = fx.post(1);
        let holder = UserId::new();

        assert!(fx
            .controller
            .try_claim(post, holder, fx.at(30))
            .await
            .unwrap()
            .is_admitted());

        // Release after the window closed: allowed.
        assert_eq!(
            fx.controller
                .try_unclaim(post, holder, fx.at(80))
                .await
                .unwrap(),
            UnclaimDecision::Released { remaining: 1 }
        );

        // The freed slot is not claimable past close.
        assert_eq!(
            fx.controller
                .try_claim(post, UserId::new(), fx.at(81))
                .await
                .unwrap(),
            ClaimDecision::Closed
        );
        assert_eq!(fx.controller.claim_count(&post).await, Some(0));
    }

    #[tokio::test]
    async fn unknown_post_is_not_found() {
        let fx = Fixture::new();
        let ghost = PostId::new();
        let user = UserId::new();

        assert_eq!(
            fx.controller.try_claim(ghost, user, fx.at(30)).await.unwrap(),
            ClaimDecision::NotFound
        );
        assert_eq!(
            fx.controller
                .try_unclaim(ghost, user, fx.at(30))
                .await
                .unwrap(),
            UnclaimDecision::NotFound
        );
        assert!(fx.controller.claim_count(&ghost).await.is_none());
    }

    #[tokio::test]
    async fn retire_removes_record_and_claims() {
        let fx = Fixture::new();
        let post = fx.post(3);
        let holder = UserId::new();

        assert!(fx
            .controller
            .try_claim(post, holder, fx.at(30))
            .await
            .unwrap()
            .is_admitted());

        let survivors = fx.controller.retire(post).await.unwrap();
        assert_eq!(survivors, vec![holder]);
        assert!(!fx.registry.contains(&post));

        // Decisions on the retired post resolve to NotFound.
        assert_eq!(
            fx.controller
                .try_claim(post, UserId::new(), fx.at(31))
                .await
                .unwrap(),
            ClaimDecision::NotFound
        );
        assert_eq!(
            fx.controller
                .try_unclaim(post, holder, fx.at(31))
                .await
                .unwrap(),
            UnclaimDecision::NotFound
        );

        // Retiring twice is an error, not a decision.
        assert!(fx.controller.retire(post).await.is_err());
    }

    #[tokio::test]
    async fn snapshot_reflects_claim_state() {
        let fx = Fixture::new();
        let post = fx.post(3);

        let snap = fx.controller.snapshot(&post, fx.at(30)).await.unwrap();
        assert_eq!(snap.claim_count, 0);
        assert_eq!(snap.remaining, 3);

        fx.controller
            .try_claim(post, UserId::new(), fx.at(30))
            .await
            .unwrap();

        let snap = fx.controller.snapshot(&post, fx.at(30)).await.unwrap();
        assert_eq!(snap.claim_count, 1);
        assert_eq!(snap.remaining, 2);
        assert!(fx.controller.snapshot(&PostId::new(), fx.at(30)).await.is_none());
    }

    /// Store that refuses every write.
    struct BrokenStore;

    #[async_trait]
    impl ClaimStore for BrokenStore {
        async fn record_claim(
            &self,
            _post: PostId,
            _user: UserId,
            _at: DateTime<Utc>,
        ) -> std::result::Result<(), StoreError> {
            Err(StoreError("backend down".into()))
        }

        async fn record_release(
            &self,
            _post: PostId,
            _user: UserId,
            _at: DateTime<Utc>,
        ) -> std::result::Result<(), StoreError> {
            Err(StoreError("backend down".into()))
        }

        async fn record_retire(&self, _post: PostId) -> std::result::Result<(), StoreError> {
            Err(StoreError("backend down".into()))
        }
    }

    #[tokio::test]
    async fn store_fault_leaves_state_untouched() {
        let registry = Arc::new(PostRegistry::new());
        let controller = AdmissionController::with_store(Arc::clone(&registry), Arc::new(BrokenStore));
        let base = Utc::now();

        let post = registry
            .create(
                NewPost {
                    title: "x".into(),
                    description: "x".into(),
                    quota: 2,
                    open_at: base,
                    close_at: base + Duration::hours(1),
                    tags: vec![],
                },
                UserId::new(),
                base,
            )
            .unwrap()
            .id;
        let user = UserId::new();

        let err = controller
            .try_claim(post, user, base + Duration::minutes(1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNAVAILABLE");

        // No half-applied increment or membership.
        assert_eq!(controller.claim_count(&post).await, Some(0));
        assert!(!controller.holds_claim(&post, &user).await);
    }

    #[test]
    fn registry_shares_one_immutable_record() {
        // The registry hands out the same Arc<Post> to every reader, and
        // Post has no interior mutability, so quota and window cannot
        // change while claims are live.
        let fx = Fixture::new();
        let post_id = fx.post(3);
        let a = fx.registry.get(&post_id).unwrap();
        let b = fx.registry.get(&post_id).unwrap();
        assert_eq!(a.quota, NonZeroU32::new(3).unwrap());
        assert!(Arc::ptr_eq(&a, &b));
    }
}
