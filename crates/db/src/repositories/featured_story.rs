//! Featured story group repository.

use std::sync::Arc;

use crate::entities::{FeaturedStory, featured_story};
use crate::repositories::map_db_err;
use campus_common::{AppError, AppResult};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};

/// Featured story group repository for database operations.
#[derive(Clone)]
pub struct FeaturedStoryRepository {
    db: Arc<DatabaseConnection>,
}

impl FeaturedStoryRepository {
    /// Create a new featured story repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a group by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<featured_story::Model>> {
        FeaturedStory::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a group by ID, failing if it does not resolve.
    pub async fn get_by_id(&self, id: &str) -> AppResult<featured_story::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::GroupNotFound(id.to_string()))
    }

    /// Create a new group on the given connection.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: featured_story::ActiveModel,
    ) -> AppResult<featured_story::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }

    /// Groups owned by a student, newest first.
    pub async fn find_by_author(&self, author_id: &str) -> AppResult<Vec<featured_story::Model>> {
        FeaturedStory::find()
            .filter(featured_story::Column::AuthorId.eq(author_id))
            .order_by_desc(featured_story::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count groups owned by a student.
    pub async fn count_by_author(&self, author_id: &str) -> AppResult<u64> {
        FeaturedStory::find()
            .filter(featured_story::Column::AuthorId.eq(author_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a group's title and/or cover.
    pub async fn update_meta(
        &self,
        id: &str,
        title: Option<&str>,
        cover_media_url: Option<&str>,
    ) -> AppResult<()> {
        if title.is_none() && cover_media_url.is_none() {
            return Ok(());
        }

        let mut update = FeaturedStory::update_many().filter(featured_story::Column::Id.eq(id));

        if let Some(title) = title {
            update = update.col_expr(featured_story::Column::Title, Expr::value(title));
        }
        if let Some(cover) = cover_media_url {
            update = update.col_expr(featured_story::Column::CoverMediaUrl, Expr::value(cover));
        }

        update
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
