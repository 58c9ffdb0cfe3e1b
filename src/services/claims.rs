//! Claim service façade
//!
//! Adapts external claim/unclaim requests into admission controller calls
//! and maps decisions onto the error taxonomy. The one business rule that
//! lives here rather than in the core is the owner check: ownership is
//! immutable, so it needs no serialization, and keeping it out of the
//! critical section keeps the core's preconditions exactly the specified
//! five.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::claim::{AdmissionController, ClaimDecision, UnclaimDecision};
use crate::post::PostRegistry;
use crate::services::notify::ClaimNotifier;
use crate::types::{PostId, Result, TurnstileError, UserId};

/// Successful claim, as reported to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimReceipt {
    pub post_id: PostId,
    pub user_id: UserId,
    /// Slots left after this admission.
    pub remaining: u32,
    pub claimed_at: DateTime<Utc>,
}

/// Successful release, as reported to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseReceipt {
    pub post_id: PostId,
    pub user_id: UserId,
    /// Slots free after this release.
    pub remaining: u32,
    pub released_at: DateTime<Utc>,
}

/// Front door for claim and unclaim requests.
pub struct ClaimService {
    registry: Arc<PostRegistry>,
    controller: Arc<AdmissionController>,
    notifier: Arc<dyn ClaimNotifier>,
}

impl ClaimService {
    pub fn new(
        registry: Arc<PostRegistry>,
        controller: Arc<AdmissionController>,
        notifier: Arc<dyn ClaimNotifier>,
    ) -> Self {
        Self {
            registry,
            controller,
            notifier,
        }
    }

    /// Claim a slot on `post_id` for `user_id`.
    pub async fn claim(
        &self,
        post_id: PostId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<ClaimReceipt> {
        let Some(post) = self.registry.get(&post_id) else {
            return Err(TurnstileError::NotFound(post_id.to_string()));
        };
        if post.owner == user_id {
            warn!(post_id = %post_id, user_id = %user_id, "owner tried to claim own post");
            return Err(TurnstileError::OwnerCannotClaim);
        }

        match self.controller.try_claim(post_id, user_id, now).await? {
            ClaimDecision::Admitted { remaining } => {
                let notifier = Arc::clone(&self.notifier);
                tokio::spawn(async move {
                    notifier.claim_admitted(&post, user_id, remaining).await;
                });
                Ok(ClaimReceipt {
                    post_id,
                    user_id,
                    remaining,
                    claimed_at: now,
                })
            }
            ClaimDecision::NotFound => Err(TurnstileError::NotFound(post_id.to_string())),
            ClaimDecision::NotYetOpen => Err(TurnstileError::NotYetOpen),
            ClaimDecision::Closed => Err(TurnstileError::Closed),
            ClaimDecision::AlreadyClaimed => Err(TurnstileError::AlreadyClaimed),
            ClaimDecision::QuotaFull => Err(TurnstileError::QuotaFull),
        }
    }

    /// Release `user_id`'s claim on `post_id`.
    pub async fn unclaim(
        &self,
        post_id: PostId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<ReleaseReceipt> {
        let post = self.registry.get(&post_id);

        match self.controller.try_unclaim(post_id, user_id, now).await? {
            UnclaimDecision::Released { remaining } => {
                if let Some(post) = post {
                    let notifier = Arc::clone(&self.notifier);
                    tokio::spawn(async move {
                        notifier.claim_released(&post, user_id).await;
                    });
                }
                Ok(ReleaseReceipt {
                    post_id,
                    user_id,
                    remaining,
                    released_at: now,
                })
            }
            UnclaimDecision::NotFound => Err(TurnstileError::NotFound(post_id.to_string())),
            UnclaimDecision::NotClaimed => Err(TurnstileError::NotClaimed),
        }
    }

    /// Delete a post through the admission controller's critical section
    /// and notify any displaced claimants.
    pub async fn remove_post(&self, post_id: PostId) -> Result<usize> {
        let Some(post) = self.registry.get(&post_id) else {
            return Err(TurnstileError::NotFound(post_id.to_string()));
        };

        let displaced = self.controller.retire(post_id).await?;
        let count = displaced.len();
        if count > 0 {
            let notifier = Arc::clone(&self.notifier);
            tokio::spawn(async move {
                notifier.post_retired(&post, &displaced).await;
            });
        }
        Ok(count)
    }
}
