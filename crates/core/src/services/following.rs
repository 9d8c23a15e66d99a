//! Following service.

use std::sync::Arc;

use crate::services::notification::{self, NotificationEvent, NotificationSink};
use campus_common::{AppError, AppResult, IdGenerator};
use campus_db::{
    entities::following,
    repositories::{BlockingRepository, FollowingRepository, StudentRepository},
};
use sea_orm::Set;

/// Following service for business logic.
///
/// Follows into a private profile are created only by the friend request
/// workflow; [`FollowingService::follow`] is the direct path for public
/// targets.
#[derive(Clone)]
pub struct FollowingService {
    following_repo: FollowingRepository,
    blocking_repo: BlockingRepository,
    student_repo: StudentRepository,
    sink: Option<Arc<dyn NotificationSink>>,
    id_gen: IdGenerator,
}

impl FollowingService {
    /// Create a new following service.
    #[must_use]
    pub const fn new(
        following_repo: FollowingRepository,
        blocking_repo: BlockingRepository,
        student_repo: StudentRepository,
    ) -> Self {
        Self {
            following_repo,
            blocking_repo,
            student_repo,
            sink: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the notification sink.
    pub fn set_notification_sink(&mut self, sink: Arc<dyn NotificationSink>) {
        self.sink = Some(sink);
    }

    /// Follow a public profile directly.
    ///
    /// A private target is never followed here — callers get
    /// `PrivateProfile` and go through the friend request workflow instead.
    pub async fn follow(&self, actor_id: &str, target_id: &str) -> AppResult<following::Model> {
        if actor_id == target_id {
            return Err(AppError::SelfAction("follow".to_string()));
        }

        self.student_repo.get_by_id(actor_id).await?;
        let target = self.student_repo.get_usable_by_id(target_id).await?;

        if self.following_repo.is_following(actor_id, target_id).await? {
            return Err(AppError::AlreadyFollowing);
        }

        if self
            .blocking_repo
            .is_blocked_between(actor_id, target_id)
            .await?
        {
            return Err(AppError::Blocked);
        }

        if target.is_private {
            return Err(AppError::PrivateProfile);
        }

        let model = following::ActiveModel {
            id: Set(self.id_gen.generate()),
            follower_id: Set(actor_id.to_string()),
            followed_id: Set(target_id.to_string()),
            followed_since: Set(chrono::Utc::now().into()),
        };

        // The unique pair index resolves a concurrent duplicate: one caller
        // wins, the other sees Conflict.
        let created = self.following_repo.create(model).await?;

        notification::dispatch(
            self.sink.as_ref(),
            target_id,
            NotificationEvent::NewFollower {
                follower_id: actor_id.to_string(),
            },
        )
        .await;

        Ok(created)
    }

    /// Stop following a target.
    pub async fn unfollow(&self, actor_id: &str, target_id: &str) -> AppResult<()> {
        let existed = self
            .following_repo
            .delete_by_pair(actor_id, target_id)
            .await?;
        if !existed {
            return Err(AppError::NotFollowing);
        }
        Ok(())
    }

    /// Remove one of the caller's followers (removal by the followed party).
    pub async fn remove_follower(&self, owner_id: &str, follower_id: &str) -> AppResult<()> {
        let existed = self
            .following_repo
            .delete_by_pair(follower_id, owner_id)
            .await?;
        if !existed {
            return Err(AppError::NotFollowing);
        }
        Ok(())
    }

    /// Check if a student is following another.
    pub async fn is_following(&self, follower_id: &str, followed_id: &str) -> AppResult<bool> {
        self.following_repo
            .is_following(follower_id, followed_id)
            .await
    }

    /// Get students a student is following (paginated).
    pub async fn get_following(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<following::Model>> {
        self.following_repo
            .find_following(user_id, limit, until_id)
            .await
    }

    /// Get followers of a student (paginated).
    pub async fn get_followers(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<following::Model>> {
        self.following_repo
            .find_followers(user_id, limit, until_id)
            .await
    }

    /// Count followers of a student.
    pub async fn count_followers(&self, user_id: &str) -> AppResult<u64> {
        self.following_repo.count_followers(user_id).await
    }

    /// Count students a student is following.
    pub async fn count_following(&self, user_id: &str) -> AppResult<u64> {
        self.following_repo.count_following(user_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use campus_db::entities::student;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::collections::BTreeMap;

    fn test_student(id: &str, is_private: bool) -> student::Model {
        student::Model {
            id: id.to_string(),
            username: format!("user_{id}"),
            is_private,
            is_active: true,
            is_deleted: false,
            created_at: Utc::now().into(),
        }
    }

    fn test_following(id: &str, follower: &str, followed: &str) -> following::Model {
        following::Model {
            id: id.to_string(),
            follower_id: follower.to_string(),
            followed_id: followed.to_string(),
            followed_since: Utc::now().into(),
        }
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, sea_orm::Value> {
        let mut row = BTreeMap::new();
        row.insert("num_items", sea_orm::Value::BigInt(Some(n)));
        row
    }

    fn service(db: Arc<DatabaseConnection>) -> FollowingService {
        FollowingService::new(
            FollowingRepository::new(db.clone()),
            BlockingRepository::new(db.clone()),
            StudentRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_follow_yourself_returns_error() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let result = service(db).follow("u1", "u1").await;
        assert!(matches!(result, Err(AppError::SelfAction(_))));
    }

    #[tokio::test]
    async fn test_follow_already_following_returns_error() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // actor, target, existing follow
                .append_query_results([[test_student("u1", false)]])
                .append_query_results([[test_student("u2", false)]])
                .append_query_results([[test_following("f1", "u1", "u2")]])
                .into_connection(),
        );

        let result = service(db).follow("u1", "u2").await;
        assert!(matches!(result, Err(AppError::AlreadyFollowing)));
    }

    #[tokio::test]
    async fn test_follow_blocked_returns_error() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_student("u1", false)]])
                .append_query_results([[test_student("u2", false)]])
                .append_query_results([Vec::<following::Model>::new()])
                .append_query_results([[count_row(1)]])
                .into_connection(),
        );

        let result = service(db).follow("u1", "u2").await;
        assert!(matches!(result, Err(AppError::Blocked)));
    }

    #[tokio::test]
    async fn test_follow_private_target_rejected() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_student("u1", false)]])
                .append_query_results([[test_student("u2", true)]])
                .append_query_results([Vec::<following::Model>::new()])
                .append_query_results([[count_row(0)]])
                .into_connection(),
        );

        let result = service(db).follow("u1", "u2").await;
        assert!(matches!(result, Err(AppError::PrivateProfile)));
    }

    #[tokio::test]
    async fn test_follow_public_target_creates_relation() {
        let created = test_following("f1", "u1", "u2");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_student("u1", false)]])
                .append_query_results([[test_student("u2", false)]])
                .append_query_results([Vec::<following::Model>::new()])
                .append_query_results([[count_row(0)]])
                .append_query_results([[created]])
                .into_connection(),
        );

        let result = service(db).follow("u1", "u2").await.unwrap();
        assert_eq!(result.follower_id, "u1");
        assert_eq!(result.followed_id, "u2");
    }

    #[tokio::test]
    async fn test_unfollow_when_not_following() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let result = service(db).unfollow("u1", "u2").await;
        assert!(matches!(result, Err(AppError::NotFollowing)));
    }

    #[tokio::test]
    async fn test_remove_follower_deletes_reverse_edge() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        assert!(service(db).remove_follower("u1", "u2").await.is_ok());
    }
}
