//! Blocking service.
//!
//! Blocking is the one relationship mutation with a cascade: the new block
//! edge, the severed follows, the removed requests and the purged
//! cross-interactions all land in a single transaction. Unblocking removes
//! the edge and nothing else — severed state stays severed.

use std::sync::Arc;

use crate::services::content_store::ContentStore;
use campus_common::{AppError, AppResult, IdGenerator};
use campus_db::{
    entities::blocking,
    repositories::{
        BlockingRepository, FollowingRepository, FriendRequestRepository, StudentRepository,
    },
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};

/// Blocking service for business logic.
#[derive(Clone)]
pub struct BlockingService {
    db: Arc<DatabaseConnection>,
    blocking_repo: BlockingRepository,
    following_repo: FollowingRepository,
    request_repo: FriendRequestRepository,
    student_repo: StudentRepository,
    content_store: Arc<dyn ContentStore>,
    id_gen: IdGenerator,
}

impl BlockingService {
    /// Create a new blocking service.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        blocking_repo: BlockingRepository,
        following_repo: FollowingRepository,
        request_repo: FriendRequestRepository,
        student_repo: StudentRepository,
        content_store: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            db,
            blocking_repo,
            following_repo,
            request_repo,
            student_repo,
            content_store,
            id_gen: IdGenerator::new(),
        }
    }

    /// Block a student.
    ///
    /// Creates the block edge, severs follows in both directions, removes
    /// any friend request either way and purges cross-interactions — all
    /// in one transaction. Either all of it happens or none of it does.
    pub async fn block(&self, blocker_id: &str, blocked_id: &str) -> AppResult<blocking::Model> {
        if blocker_id == blocked_id {
            return Err(AppError::SelfAction("block".to_string()));
        }

        self.student_repo.get_by_id(blocker_id).await?;
        self.student_repo.get_usable_by_id(blocked_id).await?;

        if self.blocking_repo.is_blocking(blocker_id, blocked_id).await? {
            return Err(AppError::AlreadyBlocked);
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let model = blocking::ActiveModel {
            id: Set(self.id_gen.generate()),
            blocker_id: Set(blocker_id.to_string()),
            blocked_id: Set(blocked_id.to_string()),
            blocked_since: Set(chrono::Utc::now().into()),
        };
        let block = self.blocking_repo.create_in(&txn, model).await?;

        self.following_repo
            .delete_by_pair_in(&txn, blocker_id, blocked_id)
            .await?;
        self.following_repo
            .delete_by_pair_in(&txn, blocked_id, blocker_id)
            .await?;

        self.request_repo
            .delete_between_in(&txn, blocker_id, blocked_id)
            .await?;

        let purged = self
            .content_store
            .purge_interactions_between(&txn, blocker_id, blocked_id)
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(blocker_id, blocked_id, purged, "Block cascade applied");

        Ok(block)
    }

    /// Unblock a student.
    ///
    /// Does not restore severed follows or purged interactions; those come
    /// back only through new user action.
    pub async fn unblock(&self, blocker_id: &str, blocked_id: &str) -> AppResult<()> {
        let existed = self
            .blocking_repo
            .delete_by_pair(blocker_id, blocked_id)
            .await?;
        if !existed {
            return Err(AppError::NotFound("Not blocking this user".to_string()));
        }
        Ok(())
    }

    /// Check if a student is blocking another student.
    pub async fn is_blocking(&self, blocker_id: &str, blocked_id: &str) -> AppResult<bool> {
        self.blocking_repo.is_blocking(blocker_id, blocked_id).await
    }

    /// Check if either student is blocking the other.
    pub async fn is_blocked_between(&self, user_a: &str, user_b: &str) -> AppResult<bool> {
        self.blocking_repo.is_blocked_between(user_a, user_b).await
    }

    /// Get students a student is blocking (paginated).
    pub async fn get_blocking(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<blocking::Model>> {
        self.blocking_repo
            .find_blocking(user_id, limit, until_id)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::content_store::DbContentStore;
    use campus_db::entities::{blocking as blocking_entity, student};
    use campus_db::repositories::{CommentRepository, LikeRepository};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
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

    fn test_block(id: &str, blocker: &str, blocked: &str) -> blocking_entity::Model {
        blocking_entity::Model {
            id: id.to_string(),
            blocker_id: blocker.to_string(),
            blocked_id: blocked.to_string(),
            blocked_since: Utc::now().into(),
        }
    }

    fn exec_ok(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, sea_orm::Value> {
        let mut row = BTreeMap::new();
        row.insert("num_items", sea_orm::Value::BigInt(Some(n)));
        row
    }

    fn service(db: Arc<DatabaseConnection>) -> BlockingService {
        let content_store = Arc::new(DbContentStore::new(
            LikeRepository::new(db.clone()),
            CommentRepository::new(db.clone()),
        ));
        BlockingService::new(
            db.clone(),
            BlockingRepository::new(db.clone()),
            FollowingRepository::new(db.clone()),
            FriendRequestRepository::new(db.clone()),
            StudentRepository::new(db),
            content_store,
        )
    }

    #[tokio::test]
    async fn test_block_yourself_returns_error() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let result = service(db).block("u1", "u1").await;
        assert!(matches!(result, Err(AppError::SelfAction(_))));
    }

    #[tokio::test]
    async fn test_block_already_blocking_returns_error() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_student("u1")]])
                .append_query_results([[test_student("u2")]])
                .append_query_results([[test_block("b1", "u1", "u2")]])
                .into_connection(),
        );

        let result = service(db).block("u1", "u2").await;
        assert!(matches!(result, Err(AppError::AlreadyBlocked)));
    }

    #[tokio::test]
    async fn test_block_cascade_runs_severance_and_purge() {
        let created = test_block("b1", "u1", "u2");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // guard lookups
                .append_query_results([[test_student("u1")]])
                .append_query_results([[test_student("u2")]])
                .append_query_results([Vec::<blocking_entity::Model>::new()])
                // insert returns the block row
                .append_query_results([[created]])
                // follow deletes (2), request delete (1), purge (4)
                .append_exec_results([
                    exec_ok(1),
                    exec_ok(0),
                    exec_ok(1),
                    exec_ok(1),
                    exec_ok(0),
                    exec_ok(1),
                    exec_ok(0),
                ])
                .into_connection(),
        );

        let block = service(db).block("u1", "u2").await.unwrap();
        assert_eq!(block.blocker_id, "u1");
        assert_eq!(block.blocked_id, "u2");
    }

    #[tokio::test]
    async fn test_unblock_when_not_blocking() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec_ok(0)])
                .into_connection(),
        );

        let result = service(db).unblock("u1", "u2").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_is_blocked_between_symmetric() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(1)]])
                .into_connection(),
        );

        assert!(service(db).is_blocked_between("u2", "u1").await.unwrap());
    }
}
