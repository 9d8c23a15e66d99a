//! Content store seam for the block cascade.
//!
//! The cascade only needs one capability from the content side: make every
//! cross-authored like and comment between two students disappear, inside
//! the cascade's own transaction. Hiding that behind a trait keeps the
//! cascade testable without the post/story schema.

use async_trait::async_trait;
use campus_common::AppResult;
use campus_db::repositories::{CommentRepository, LikeRepository};
use sea_orm::DatabaseTransaction;

/// Outward interface the block cascade purges interactions through.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Delete every like and comment either student left on the other's
    /// content, on the given transaction. Returns how many rows went away.
    async fn purge_interactions_between(
        &self,
        txn: &DatabaseTransaction,
        user_a: &str,
        user_b: &str,
    ) -> AppResult<u64>;
}

/// The sea-orm backed content store.
#[derive(Clone)]
pub struct DbContentStore {
    like_repo: LikeRepository,
    comment_repo: CommentRepository,
}

impl DbContentStore {
    /// Create a new content store over the interaction repositories.
    #[must_use]
    pub const fn new(like_repo: LikeRepository, comment_repo: CommentRepository) -> Self {
        Self {
            like_repo,
            comment_repo,
        }
    }
}

#[async_trait]
impl ContentStore for DbContentStore {
    async fn purge_interactions_between(
        &self,
        txn: &DatabaseTransaction,
        user_a: &str,
        user_b: &str,
    ) -> AppResult<u64> {
        // Symmetric purge: what A left on B's content and what B left on
        // A's, likes and comments alike.
        let mut purged = 0;
        purged += self
            .like_repo
            .delete_authored_on_content_of(txn, user_a, user_b)
            .await?;
        purged += self
            .like_repo
            .delete_authored_on_content_of(txn, user_b, user_a)
            .await?;
        purged += self
            .comment_repo
            .delete_authored_on_content_of(txn, user_a, user_b)
            .await?;
        purged += self
            .comment_repo
            .delete_authored_on_content_of(txn, user_b, user_a)
            .await?;
        Ok(purged)
    }
}
