//! Friend request repository.
//!
//! Listings only ever surface PENDING rows; rejected rows stay behind as
//! an audit trail and never show up in either party's views.

use std::sync::Arc;

use crate::entities::{FriendRequest, friend_request};
use crate::entities::friend_request::RequestStatus;
use crate::repositories::map_db_err;
use campus_common::{AppError, AppResult};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

/// Friend request repository for database operations.
#[derive(Clone)]
pub struct FriendRequestRepository {
    db: Arc<DatabaseConnection>,
}

impl FriendRequestRepository {
    /// Create a new friend request repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a friend request by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<friend_request::Model>> {
        FriendRequest::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a friend request by ID, failing if it does not resolve.
    pub async fn get_by_id(&self, id: &str) -> AppResult<friend_request::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::RequestNotFound(id.to_string()))
    }

    /// Check whether a PENDING request exists for the ordered pair.
    pub async fn has_pending(&self, sender_id: &str, receiver_id: &str) -> AppResult<bool> {
        let found = FriendRequest::find()
            .filter(friend_request::Column::SenderId.eq(sender_id))
            .filter(friend_request::Column::ReceiverId.eq(receiver_id))
            .filter(friend_request::Column::Status.eq(RequestStatus::Pending))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(found.is_some())
    }

    /// Create a new friend request.
    pub async fn create(
        &self,
        model: friend_request::ActiveModel,
    ) -> AppResult<friend_request::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Delete a friend request by ID on the given connection.
    pub async fn delete_in<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<bool> {
        let result = FriendRequest::delete_many()
            .filter(friend_request::Column::Id.eq(id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Delete a friend request by ID.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        self.delete_in(self.db.as_ref(), id).await
    }

    /// Mark a request rejected. The row is retained for audit.
    pub async fn mark_rejected(&self, id: &str) -> AppResult<()> {
        FriendRequest::update_many()
            .col_expr(
                friend_request::Column::Status,
                Expr::value(RequestStatus::Rejected),
            )
            .filter(friend_request::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete any request between two students, in either direction, on the
    /// given connection. Used by the block cascade.
    pub async fn delete_between_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_a: &str,
        user_b: &str,
    ) -> AppResult<u64> {
        let result = FriendRequest::delete_many()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(friend_request::Column::SenderId.eq(user_a))
                            .add(friend_request::Column::ReceiverId.eq(user_b)),
                    )
                    .add(
                        Condition::all()
                            .add(friend_request::Column::SenderId.eq(user_b))
                            .add(friend_request::Column::ReceiverId.eq(user_a)),
                    ),
            )
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Get PENDING requests received by a student (paginated).
    pub async fn find_received(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<friend_request::Model>> {
        let mut query = FriendRequest::find()
            .filter(friend_request::Column::ReceiverId.eq(user_id))
            .filter(friend_request::Column::Status.eq(RequestStatus::Pending))
            .order_by_desc(friend_request::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(friend_request::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get PENDING requests sent by a student (paginated).
    pub async fn find_sent(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<friend_request::Model>> {
        let mut query = FriendRequest::find()
            .filter(friend_request::Column::SenderId.eq(user_id))
            .filter(friend_request::Column::Status.eq(RequestStatus::Pending))
            .order_by_desc(friend_request::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(friend_request::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_request(id: &str, sender_id: &str, receiver_id: &str) -> friend_request::Model {
        friend_request::Model {
            id: id.to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            status: RequestStatus::Pending,
            sent_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<friend_request::Model>::new()])
                .into_connection(),
        );

        let repo = FriendRequestRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::RequestNotFound(_))));
    }

    #[tokio::test]
    async fn test_has_pending_true() {
        let request = create_test_request("r1", "u1", "u2");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[request]])
                .into_connection(),
        );

        let repo = FriendRequestRepository::new(db);
        assert!(repo.has_pending("u1", "u2").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_reports_absence() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = FriendRequestRepository::new(db);
        assert!(!repo.delete("r1").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_received_lists_pending() {
        let r1 = create_test_request("r1", "u2", "u1");
        let r2 = create_test_request("r2", "u3", "u1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[r1, r2]])
                .into_connection(),
        );

        let repo = FriendRequestRepository::new(db);
        let result = repo.find_received("u1", 10, None).await.unwrap();

        assert_eq!(result.len(), 2);
    }
}
