//! Notification seam
//!
//! Successful admissions and releases are announced through this trait,
//! always off the request path. Actual delivery (mail, push, webhooks) is an
//! external collaborator; the shipped implementation just logs.

use async_trait::async_trait;

use crate::post::Post;
use crate::types::UserId;

/// Receiver of claim lifecycle events.
#[async_trait]
pub trait ClaimNotifier: Send + Sync {
    async fn claim_admitted(&self, post: &Post, user: UserId, remaining: u32);

    async fn claim_released(&self, post: &Post, user: UserId);

    /// The post was deleted while these users still held claims.
    async fn post_retired(&self, post: &Post, holders: &[UserId]);
}

/// Notifier that writes structured log lines and nothing else.
pub struct LogNotifier;

#[async_trait]
impl ClaimNotifier for LogNotifier {
    async fn claim_admitted(&self, post: &Post, user: UserId, remaining: u32) {
        tracing::info!(
            post_id = %post.id,
            user_id = %user,
            title = %post.title,
            remaining,
            "notify: claim admitted"
        );
    }

    async fn claim_released(&self, post: &Post, user: UserId) {
        tracing::info!(
            post_id = %post.id,
            user_id = %user,
            title = %post.title,
            "notify: claim released"
        );
    }

    async fn post_retired(&self, post: &Post, holders: &[UserId]) {
        tracing::info!(
            post_id = %post.id,
            title = %post.title,
            displaced = holders.len(),
            "notify: post retired with live claims"
        );
    }
}
