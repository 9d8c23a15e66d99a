//! Popularity service.
//!
//! Derived, recomputable metrics over engagement counts. Nothing here
//! mutates relationship or lifecycle state, so every method is safe to
//! call concurrently with the rest of the engine.

use std::sync::Arc;

use campus_common::{AppResult, Clock, SystemClock};
use campus_db::repositories::{
    CommentRepository, FeaturedStoryRepository, FollowingRepository, LikeRepository,
    PostRepository, StoryRepository, StoryViewerRepository, StudentRepository,
};

/// Popularity service for score computation.
#[derive(Clone)]
pub struct PopularityService {
    student_repo: StudentRepository,
    post_repo: PostRepository,
    story_repo: StoryRepository,
    like_repo: LikeRepository,
    comment_repo: CommentRepository,
    following_repo: FollowingRepository,
    featured_repo: FeaturedStoryRepository,
    viewer_repo: StoryViewerRepository,
    clock: Arc<dyn Clock>,
}

impl PopularityService {
    /// Create a new popularity service using the system clock.
    #[must_use]
    pub fn new(
        student_repo: StudentRepository,
        post_repo: PostRepository,
        story_repo: StoryRepository,
        like_repo: LikeRepository,
        comment_repo: CommentRepository,
        following_repo: FollowingRepository,
        featured_repo: FeaturedStoryRepository,
        viewer_repo: StoryViewerRepository,
    ) -> Self {
        Self {
            student_repo,
            post_repo,
            story_repo,
            like_repo,
            comment_repo,
            following_repo,
            featured_repo,
            viewer_repo,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock (pins the recompute sweep's working set in tests).
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Engagement score of a post: `likes*3 + comments*2 + tags`.
    pub async fn post_score(&self, post_id: &str) -> AppResult<i64> {
        self.post_repo.get_by_id(post_id).await?;

        let likes = self.like_repo.count_for_post(post_id).await?;
        let comments = self.comment_repo.count_for_post(post_id).await?;
        let tags = self.post_repo.count_tags(post_id).await?;

        Ok((likes * 3 + comments * 2 + tags) as i64)
    }

    /// Engagement score of a story: `likes*3 + comments*2 + views`.
    pub async fn story_score(&self, story_id: &str) -> AppResult<i64> {
        self.story_repo.get_by_id(story_id).await?;

        let likes = self.like_repo.count_for_story(story_id).await?;
        let comments = self.comment_repo.count_for_story(story_id).await?;
        let views = self.viewer_repo.count_for_story(story_id).await?;

        Ok((likes * 3 + comments * 2 + views) as i64)
    }

    /// Profile score:
    /// `followers*5 + likes*2 + comments + posts*3 + stories*2 + featured*4`.
    pub async fn profile_score(&self, student_id: &str) -> AppResult<i64> {
        self.student_repo.get_by_id(student_id).await?;

        let followers = self.following_repo.count_followers(student_id).await?;
        let likes = self.like_repo.count_by_student(student_id).await?;
        let comments = self.comment_repo.count_by_student(student_id).await?;
        let posts = self.post_repo.count_by_author(student_id).await?;
        let stories = self.story_repo.count_unarchived_by_author(student_id).await?;
        let featured = self.featured_repo.count_by_author(student_id).await?;

        Ok((followers * 5 + likes * 2 + comments + posts * 3 + stories * 2 + featured * 4) as i64)
    }

    /// Periodic sweep: persist fresh scores for every live story.
    ///
    /// A story that cannot be scored (e.g. deleted mid-sweep) is logged
    /// and skipped; the batch never aborts. Returns how many scores were
    /// written.
    pub async fn recompute_story_scores(&self) -> AppResult<u64> {
        let stories = self.story_repo.find_live(self.clock.now()).await?;

        let mut updated = 0;
        for story in stories {
            let score = match self.story_score(&story.id).await {
                Ok(score) => score,
                Err(e) => {
                    tracing::warn!(story_id = %story.id, error = %e, "Skipping story during score recompute");
                    continue;
                }
            };
            if let Err(e) = self.story_repo.set_score(&story.id, score).await {
                tracing::warn!(story_id = %story.id, error = %e, "Failed to persist story score");
                continue;
            }
            updated += 1;
        }

        Ok(updated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use campus_common::AppError;
    use campus_db::entities::{post, student};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::collections::BTreeMap;

    fn test_student(id: &str) -> student::Model {
        student::Model {
            id: id.to_string(),
            username: format!("user_{id}"),
            is_private: false,
            is_active: true,
            is_deleted: false,
            created_at: Utc::now().into(),
        }
    }

    fn test_post(id: &str, author: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            author_id: author.to_string(),
            caption: None,
            created_at: Utc::now().into(),
        }
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, sea_orm::Value> {
        let mut row = BTreeMap::new();
        row.insert("num_items", sea_orm::Value::BigInt(Some(n)));
        row
    }

    fn service(db: Arc<DatabaseConnection>) -> PopularityService {
        PopularityService::new(
            StudentRepository::new(db.clone()),
            PostRepository::new(db.clone()),
            StoryRepository::new(db.clone()),
            LikeRepository::new(db.clone()),
            CommentRepository::new(db.clone()),
            FollowingRepository::new(db.clone()),
            FeaturedStoryRepository::new(db.clone()),
            StoryViewerRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_post_score_weights() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_post("p1", "u1")]])
                // likes=4, comments=2, tags=1 -> 12 + 4 + 1 = 17
                .append_query_results([[count_row(4)]])
                .append_query_results([[count_row(2)]])
                .append_query_results([[count_row(1)]])
                .into_connection(),
        );

        assert_eq!(service(db).post_score("p1").await.unwrap(), 17);
    }

    #[tokio::test]
    async fn test_post_score_missing_post() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let result = service(db).post_score("missing").await;
        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_profile_score_weights() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_student("u1")]])
                // followers=2, likes=1, comments=3, posts=1, stories=2, featured=1
                // -> 10 + 2 + 3 + 3 + 4 + 4 = 26
                .append_query_results([[count_row(2)]])
                .append_query_results([[count_row(1)]])
                .append_query_results([[count_row(3)]])
                .append_query_results([[count_row(1)]])
                .append_query_results([[count_row(2)]])
                .append_query_results([[count_row(1)]])
                .into_connection(),
        );

        assert_eq!(service(db).profile_score("u1").await.unwrap(), 26);
    }
}
