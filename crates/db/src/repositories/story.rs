//! Story repository.
//!
//! Lifecycle transitions (feature, extend, archive) are expressed as
//! conditional updates keyed on the story id and its current state, so a
//! concurrent sweep and a user action resolve to one of the two valid end
//! states instead of a torn write.

use std::sync::Arc;

use crate::entities::{Story, story};
use crate::repositories::map_db_err;
use campus_common::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};

/// Story repository for database operations.
#[derive(Clone)]
pub struct StoryRepository {
    db: Arc<DatabaseConnection>,
}

impl StoryRepository {
    /// Create a new story repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a story by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<story::Model>> {
        Story::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a story by ID, failing if it does not resolve.
    pub async fn get_by_id(&self, id: &str) -> AppResult<story::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::StoryNotFound(id.to_string()))
    }

    /// Create a new story.
    pub async fn create(&self, model: story::ActiveModel) -> AppResult<story::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Stories of an author that have not been archived, newest first.
    ///
    /// Expiry is evaluated by the caller against its clock; the store only
    /// distinguishes archived from unarchived.
    pub async fn find_unarchived_by_author(&self, author_id: &str) -> AppResult<Vec<story::Model>> {
        Story::find()
            .filter(story::Column::AuthorId.eq(author_id))
            .filter(story::Column::ArchivedAt.is_null())
            .order_by_desc(story::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Archived stories of an author, newest first.
    pub async fn find_archived_by_author(&self, author_id: &str) -> AppResult<Vec<story::Model>> {
        Story::find()
            .filter(story::Column::AuthorId.eq(author_id))
            .filter(story::Column::ArchivedAt.is_not_null())
            .order_by_desc(story::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Stories belonging to a featured group, newest first.
    pub async fn find_by_group(&self, group_id: &str) -> AppResult<Vec<story::Model>> {
        Story::find()
            .filter(story::Column::FeaturedStoryId.eq(group_id))
            .order_by_desc(story::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count unarchived stories of an author.
    pub async fn count_unarchived_by_author(&self, author_id: &str) -> AppResult<u64> {
        Story::find()
            .filter(story::Column::AuthorId.eq(author_id))
            .filter(story::Column::ArchivedAt.is_null())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark a story featured and attach it to a group, on the given
    /// connection. Conditional on the story being unfeatured and
    /// unarchived; returns whether the transition happened.
    pub async fn set_featured_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        story_id: &str,
        group_id: &str,
    ) -> AppResult<bool> {
        let result = Story::update_many()
            .col_expr(story::Column::IsFeatured, Expr::value(true))
            .col_expr(story::Column::FeaturedStoryId, Expr::value(group_id))
            .filter(story::Column::Id.eq(story_id))
            .filter(story::Column::IsFeatured.eq(false))
            .filter(story::Column::ArchivedAt.is_null())
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Replace a story's expiry, conditional on the expiry it was computed
    /// from. Returns whether the story was still in that state.
    pub async fn extend_expiry(
        &self,
        story_id: &str,
        from_expires_at: DateTime<Utc>,
        to_expires_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = Story::update_many()
            .col_expr(
                story::Column::ExpiresAt,
                Expr::value(to_expires_at.fixed_offset()),
            )
            .filter(story::Column::Id.eq(story_id))
            .filter(story::Column::ExpiresAt.eq(from_expires_at.fixed_offset()))
            .filter(story::Column::IsFeatured.eq(false))
            .filter(story::Column::ArchivedAt.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Archive one story regardless of expiry (manual archive).
    /// Conditional on it not being archived yet.
    pub async fn archive_by_id(&self, story_id: &str, now: DateTime<Utc>) -> AppResult<bool> {
        let result = Story::update_many()
            .col_expr(story::Column::ArchivedAt, Expr::value(now.fixed_offset()))
            .filter(story::Column::Id.eq(story_id))
            .filter(story::Column::ArchivedAt.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Archive every expired, unfeatured, unarchived story in one batch.
    /// Returns the number of stories archived; already-archived stories are
    /// untouched, so re-running is a no-op.
    pub async fn archive_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = Story::update_many()
            .col_expr(story::Column::ArchivedAt, Expr::value(now.fixed_offset()))
            .filter(story::Column::ExpiresAt.lte(now.fixed_offset()))
            .filter(story::Column::IsFeatured.eq(false))
            .filter(story::Column::ArchivedAt.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Persist a recomputed popularity score.
    pub async fn set_score(&self, story_id: &str, score: i64) -> AppResult<()> {
        Story::update_many()
            .col_expr(story::Column::Score, Expr::value(score))
            .filter(story::Column::Id.eq(story_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Unarchived, unfeatured stories whose expiry is still ahead of `now`
    /// (the recompute sweep's working set).
    pub async fn find_live(&self, now: DateTime<Utc>) -> AppResult<Vec<story::Model>> {
        Story::find()
            .filter(story::Column::ArchivedAt.is_null())
            .filter(
                story::Column::IsFeatured
                    .eq(true)
                    .or(story::Column::ExpiresAt.gt(now.fixed_offset())),
            )
            .order_by_desc(story::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
