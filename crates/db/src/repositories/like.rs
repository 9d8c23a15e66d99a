//! Like repository.
//!
//! The engine never creates likes (the content managers above it do); it
//! counts them for popularity and purges them across a block.

use std::sync::Arc;

use crate::entities::{Like, Post, Story, like, post, story};
use campus_common::{AppError, AppResult};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter,
};

/// Like repository for database operations.
#[derive(Clone)]
pub struct LikeRepository {
    db: Arc<DatabaseConnection>,
}

impl LikeRepository {
    /// Create a new like repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Count likes on a post.
    pub async fn count_for_post(&self, post_id: &str) -> AppResult<u64> {
        Like::find()
            .filter(like::Column::PostId.eq(post_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count likes on a story.
    pub async fn count_for_story(&self, story_id: &str) -> AppResult<u64> {
        Like::find()
            .filter(like::Column::StoryId.eq(story_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count likes authored by a student.
    pub async fn count_by_student(&self, student_id: &str) -> AppResult<u64> {
        Like::find()
            .filter(like::Column::StudentId.eq(student_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete every like `interactor_id` left on content owned by
    /// `owner_id`, on the given connection. One direction of the block
    /// cascade's purge.
    pub async fn delete_authored_on_content_of<C: ConnectionTrait>(
        &self,
        conn: &C,
        interactor_id: &str,
        owner_id: &str,
    ) -> AppResult<u64> {
        let posts_of_owner = Query::select()
            .column(post::Column::Id)
            .from(Post)
            .and_where(Expr::col(post::Column::AuthorId).eq(owner_id))
            .to_owned();
        let stories_of_owner = Query::select()
            .column(story::Column::Id)
            .from(Story)
            .and_where(Expr::col(story::Column::AuthorId).eq(owner_id))
            .to_owned();

        let result = Like::delete_many()
            .filter(like::Column::StudentId.eq(interactor_id))
            .filter(
                Condition::any()
                    .add(like::Column::PostId.in_subquery(posts_of_owner))
                    .add(like::Column::StoryId.in_subquery(stories_of_owner)),
            )
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_delete_cross_likes_reports_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                }])
                .into_connection(),
        );

        let repo = LikeRepository::new(db.clone());
        let purged = repo
            .delete_authored_on_content_of(db.as_ref(), "u2", "u1")
            .await
            .unwrap();

        assert_eq!(purged, 2);
    }
}
