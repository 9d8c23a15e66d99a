//! Comment repository.
//!
//! Mirrors the like repository: counts for popularity, cross-purge for the
//! block cascade. Comment authoring lives in the content managers.

use std::sync::Arc;

use crate::entities::{Comment, Post, Story, comment, post, story};
use campus_common::{AppError, AppResult};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter,
};

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Count comments on a post.
    pub async fn count_for_post(&self, post_id: &str) -> AppResult<u64> {
        Comment::find()
            .filter(comment::Column::PostId.eq(post_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count comments on a story.
    pub async fn count_for_story(&self, story_id: &str) -> AppResult<u64> {
        Comment::find()
            .filter(comment::Column::StoryId.eq(story_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count comments authored by a student.
    pub async fn count_by_student(&self, student_id: &str) -> AppResult<u64> {
        Comment::find()
            .filter(comment::Column::StudentId.eq(student_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete every comment `interactor_id` left on content owned by
    /// `owner_id`, on the given connection.
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

        let result = Comment::delete_many()
            .filter(comment::Column::StudentId.eq(interactor_id))
            .filter(
                Condition::any()
                    .add(comment::Column::PostId.in_subquery(posts_of_owner))
                    .add(comment::Column::StoryId.in_subquery(stories_of_owner)),
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
    async fn test_delete_cross_comments_reports_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = CommentRepository::new(db.clone());
        let purged = repo
            .delete_authored_on_content_of(db.as_ref(), "u1", "u2")
            .await
            .unwrap();

        assert_eq!(purged, 1);
    }
}
