//! Story viewer repository.

use std::sync::Arc;

use crate::entities::{StoryViewer, story_viewer};
use campus_common::{AppError, AppResult};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Story viewer repository for database operations.
#[derive(Clone)]
pub struct StoryViewerRepository {
    db: Arc<DatabaseConnection>,
}

impl StoryViewerRepository {
    /// Create a new story viewer repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record a view, first-view-wins.
    ///
    /// The unique (story, viewer) index plus `ON CONFLICT DO NOTHING` makes
    /// this idempotent; repeat views leave the original `viewed_at`
    /// untouched. Returns whether this was the first view.
    pub async fn record_view(&self, model: story_viewer::ActiveModel) -> AppResult<bool> {
        let inserted = StoryViewer::insert(model)
            .on_conflict(
                OnConflict::columns([
                    story_viewer::Column::StoryId,
                    story_viewer::Column::ViewerId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(inserted > 0)
    }

    /// Viewers of a story, most recent first (paginated).
    pub async fn find_by_story(
        &self,
        story_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<story_viewer::Model>> {
        let mut query = StoryViewer::find()
            .filter(story_viewer::Column::StoryId.eq(story_id))
            .order_by_desc(story_viewer::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(story_viewer::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count views of a story.
    pub async fn count_for_story(&self, story_id: &str) -> AppResult<u64> {
        StoryViewer::find()
            .filter(story_viewer::Column::StoryId.eq(story_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
