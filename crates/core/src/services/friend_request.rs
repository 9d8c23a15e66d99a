//! Friend request service.
//!
//! The workflow that converts a connection request into a follow relation:
//! `NONE -> PENDING -> accepted (becomes a follow) | rejected | cancelled`.
//! Sending to a public profile bypasses the request entirely and creates
//! the follow directly.

use std::sync::Arc;

use crate::services::notification::{self, NotificationEvent, NotificationSink};
use campus_common::{AppError, AppResult, IdGenerator};
use campus_db::{
    entities::friend_request::{self, RequestStatus},
    entities::following,
    repositories::{
        BlockingRepository, FollowingRepository, FriendRequestRepository, StudentRepository,
    },
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};

/// What `send` did.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// The receiver was public; a follow was created directly and no
    /// request ever existed.
    Followed(following::Model),
    /// The receiver is private; a pending request awaits their decision.
    Requested(friend_request::Model),
}

/// Per-item result of a bulk accept/reject.
#[derive(Debug)]
pub struct BulkOutcome {
    /// The request the outcome belongs to.
    pub request_id: String,
    /// Success, or why this item failed. Other items are unaffected.
    pub result: AppResult<()>,
}

/// Friend request service for business logic.
#[derive(Clone)]
pub struct FriendRequestService {
    db: Arc<DatabaseConnection>,
    request_repo: FriendRequestRepository,
    following_repo: FollowingRepository,
    blocking_repo: BlockingRepository,
    student_repo: StudentRepository,
    sink: Option<Arc<dyn NotificationSink>>,
    id_gen: IdGenerator,
}

impl FriendRequestService {
    /// Create a new friend request service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        request_repo: FriendRequestRepository,
        following_repo: FollowingRepository,
        blocking_repo: BlockingRepository,
        student_repo: StudentRepository,
    ) -> Self {
        Self {
            db,
            request_repo,
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

    /// Send a friend request.
    ///
    /// Guard order: self, already-following, blocked, already-sent. A
    /// public receiver short-circuits into a direct follow.
    pub async fn send(&self, sender_id: &str, receiver_id: &str) -> AppResult<SendOutcome> {
        if sender_id == receiver_id {
            return Err(AppError::SelfAction("friend request".to_string()));
        }

        self.student_repo.get_by_id(sender_id).await?;
        let receiver = self.student_repo.get_usable_by_id(receiver_id).await?;

        if self
            .following_repo
            .is_following(sender_id, receiver_id)
            .await?
        {
            return Err(AppError::AlreadyFollowing);
        }

        if self
            .blocking_repo
            .is_blocked_between(sender_id, receiver_id)
            .await?
        {
            return Err(AppError::Blocked);
        }

        if self.request_repo.has_pending(sender_id, receiver_id).await? {
            return Err(AppError::AlreadySentRequest);
        }

        if receiver.is_private {
            let model = friend_request::ActiveModel {
                id: Set(self.id_gen.generate()),
                sender_id: Set(sender_id.to_string()),
                receiver_id: Set(receiver_id.to_string()),
                status: Set(RequestStatus::Pending),
                sent_at: Set(chrono::Utc::now().into()),
            };

            // The partial unique index on pending pairs makes the loser of
            // a concurrent double-send fail with Conflict.
            let request = self.request_repo.create(model).await?;

            notification::dispatch(
                self.sink.as_ref(),
                receiver_id,
                NotificationEvent::FriendRequestReceived {
                    sender_id: sender_id.to_string(),
                },
            )
            .await;

            return Ok(SendOutcome::Requested(request));
        }

        // Public receiver: direct follow, no request involved.
        let model = following::ActiveModel {
            id: Set(self.id_gen.generate()),
            follower_id: Set(sender_id.to_string()),
            followed_id: Set(receiver_id.to_string()),
            followed_since: Set(chrono::Utc::now().into()),
        };
        let follow = self.following_repo.create(model).await?;

        notification::dispatch(
            self.sink.as_ref(),
            receiver_id,
            NotificationEvent::NewFollower {
                follower_id: sender_id.to_string(),
            },
        )
        .await;

        Ok(SendOutcome::Followed(follow))
    }

    /// Accept a pending request addressed to `receiver_id`.
    ///
    /// Creates Follow(sender -> receiver) and deletes the request in one
    /// transaction; no observer sees one without the other.
    pub async fn accept(&self, receiver_id: &str, request_id: &str) -> AppResult<()> {
        let request = self.request_repo.get_by_id(request_id).await?;

        if request.receiver_id != receiver_id {
            return Err(AppError::NotOwner(request_id.to_string()));
        }
        match request.status {
            RequestStatus::Pending => {}
            RequestStatus::Accepted => {
                return Err(AppError::Conflict("request already accepted".to_string()));
            }
            RequestStatus::Rejected => {
                return Err(AppError::Conflict("request already rejected".to_string()));
            }
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let model = following::ActiveModel {
            id: Set(self.id_gen.generate()),
            follower_id: Set(request.sender_id.clone()),
            followed_id: Set(request.receiver_id.clone()),
            followed_since: Set(chrono::Utc::now().into()),
        };
        self.following_repo.create_in(&txn, model).await?;
        self.request_repo.delete_in(&txn, request_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        notification::dispatch(
            self.sink.as_ref(),
            &request.sender_id,
            NotificationEvent::FriendRequestAccepted {
                receiver_id: receiver_id.to_string(),
            },
        )
        .await;

        Ok(())
    }

    /// Reject a pending request addressed to `receiver_id`.
    ///
    /// The row is marked rejected and kept for audit; it disappears from
    /// both parties' listings, which only ever show pending rows.
    pub async fn reject(&self, receiver_id: &str, request_id: &str) -> AppResult<()> {
        let request = self.request_repo.get_by_id(request_id).await?;

        if request.receiver_id != receiver_id {
            return Err(AppError::NotOwner(request_id.to_string()));
        }
        if request.status == RequestStatus::Rejected {
            return Err(AppError::Conflict("request already rejected".to_string()));
        }

        self.request_repo.mark_rejected(request_id).await?;
        tracing::debug!(request_id, receiver_id, "Friend request rejected");
        Ok(())
    }

    /// Cancel a pending request the sender no longer wants delivered.
    pub async fn cancel(&self, sender_id: &str, request_id: &str) -> AppResult<()> {
        let request = self.request_repo.get_by_id(request_id).await?;

        if request.sender_id != sender_id {
            return Err(AppError::NotOwner(request_id.to_string()));
        }

        self.request_repo.delete(request_id).await?;
        Ok(())
    }

    /// Accept many requests; each id succeeds or fails on its own, and a
    /// failure never rolls back the others.
    pub async fn accept_bulk(&self, receiver_id: &str, request_ids: &[String]) -> Vec<BulkOutcome> {
        let mut outcomes = Vec::with_capacity(request_ids.len());
        for request_id in request_ids {
            let result = self.accept(receiver_id, request_id).await;
            outcomes.push(BulkOutcome {
                request_id: request_id.clone(),
                result,
            });
        }
        outcomes
    }

    /// Reject many requests with per-item outcomes.
    pub async fn reject_bulk(&self, receiver_id: &str, request_ids: &[String]) -> Vec<BulkOutcome> {
        let mut outcomes = Vec::with_capacity(request_ids.len());
        for request_id in request_ids {
            let result = self.reject(receiver_id, request_id).await;
            outcomes.push(BulkOutcome {
                request_id: request_id.clone(),
                result,
            });
        }
        outcomes
    }

    /// Pending requests received by a student (paginated).
    pub async fn received_requests(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<friend_request::Model>> {
        self.request_repo.find_received(user_id, limit, until_id).await
    }

    /// Pending requests sent by a student (paginated).
    pub async fn sent_requests(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<friend_request::Model>> {
        self.request_repo.find_sent(user_id, limit, until_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use campus_db::entities::student;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
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

    fn test_request(id: &str, sender: &str, receiver: &str, status: RequestStatus) -> friend_request::Model {
        friend_request::Model {
            id: id.to_string(),
            sender_id: sender.to_string(),
            receiver_id: receiver.to_string(),
            status,
            sent_at: Utc::now().into(),
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

    fn service(db: Arc<DatabaseConnection>) -> FriendRequestService {
        FriendRequestService::new(
            db.clone(),
            FriendRequestRepository::new(db.clone()),
            FollowingRepository::new(db.clone()),
            BlockingRepository::new(db.clone()),
            StudentRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_send_to_yourself_returns_error() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let result = service(db).send("u1", "u1").await;
        assert!(matches!(result, Err(AppError::SelfAction(_))));
    }

    #[tokio::test]
    async fn test_send_when_already_following() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_student("u1", false)]])
                .append_query_results([[test_student("u2", false)]])
                .append_query_results([[test_following("f1", "u1", "u2")]])
                .into_connection(),
        );

        let result = service(db).send("u1", "u2").await;
        assert!(matches!(result, Err(AppError::AlreadyFollowing)));
    }

    #[tokio::test]
    async fn test_send_when_blocked() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_student("u1", false)]])
                .append_query_results([[test_student("u2", false)]])
                .append_query_results([Vec::<following::Model>::new()])
                .append_query_results([[count_row(1)]])
                .into_connection(),
        );

        let result = service(db).send("u1", "u2").await;
        assert!(matches!(result, Err(AppError::Blocked)));
    }

    #[tokio::test]
    async fn test_send_duplicate_pending_request() {
        let pending = test_request("r1", "u1", "u2", RequestStatus::Pending);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_student("u1", false)]])
                .append_query_results([[test_student("u2", true)]])
                .append_query_results([Vec::<following::Model>::new()])
                .append_query_results([[count_row(0)]])
                .append_query_results([[pending]])
                .into_connection(),
        );

        let result = service(db).send("u1", "u2").await;
        assert!(matches!(result, Err(AppError::AlreadySentRequest)));
    }

    #[tokio::test]
    async fn test_send_to_public_receiver_creates_direct_follow() {
        let follow = test_following("f1", "u1", "u2");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_student("u1", false)]])
                .append_query_results([[test_student("u2", false)]])
                .append_query_results([Vec::<following::Model>::new()])
                .append_query_results([[count_row(0)]])
                .append_query_results([Vec::<friend_request::Model>::new()])
                .append_query_results([[follow]])
                .into_connection(),
        );

        let outcome = service(db).send("u1", "u2").await.unwrap();
        assert!(matches!(outcome, SendOutcome::Followed(_)));
    }

    #[tokio::test]
    async fn test_send_to_private_receiver_creates_pending_request() {
        let request = test_request("r1", "u1", "u2", RequestStatus::Pending);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_student("u1", false)]])
                .append_query_results([[test_student("u2", true)]])
                .append_query_results([Vec::<following::Model>::new()])
                .append_query_results([[count_row(0)]])
                .append_query_results([Vec::<friend_request::Model>::new()])
                .append_query_results([[request]])
                .into_connection(),
        );

        let outcome = service(db).send("u1", "u2").await.unwrap();
        match outcome {
            SendOutcome::Requested(r) => assert_eq!(r.status, RequestStatus::Pending),
            SendOutcome::Followed(_) => panic!("expected a pending request"),
        }
    }

    #[tokio::test]
    async fn test_accept_creates_follow_and_deletes_request() {
        let request = test_request("r1", "u1", "u2", RequestStatus::Pending);
        let follow = test_following("f1", "u1", "u2");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[request]])
                .append_query_results([[follow]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        assert!(service(db).accept("u2", "r1").await.is_ok());
    }

    #[tokio::test]
    async fn test_accept_wrong_receiver() {
        let request = test_request("r1", "u1", "u2", RequestStatus::Pending);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[request]])
                .into_connection(),
        );

        let result = service(db).accept("u3", "r1").await;
        assert!(matches!(result, Err(AppError::NotOwner(_))));
    }

    #[tokio::test]
    async fn test_accept_missing_request() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<friend_request::Model>::new()])
                .into_connection(),
        );

        let result = service(db).accept("u2", "r1").await;
        assert!(matches!(result, Err(AppError::RequestNotFound(_))));
    }

    #[tokio::test]
    async fn test_reject_twice_fails() {
        let request = test_request("r1", "u1", "u2", RequestStatus::Rejected);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[request]])
                .into_connection(),
        );

        let result = service(db).reject("u2", "r1").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_cancel_only_by_sender() {
        let request = test_request("r1", "u1", "u2", RequestStatus::Pending);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[request]])
                .into_connection(),
        );

        let result = service(db).cancel("u2", "r1").await;
        assert!(matches!(result, Err(AppError::NotOwner(_))));
    }

    #[tokio::test]
    async fn test_bulk_accept_partial_success() {
        // First id resolves and accepts; second id does not exist. The
        // failure must not affect the first outcome.
        let request = test_request("r1", "u1", "u2", RequestStatus::Pending);
        let follow = test_following("f1", "u1", "u2");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[request]])
                .append_query_results([[follow]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([Vec::<friend_request::Model>::new()])
                .into_connection(),
        );

        let outcomes = service(db)
            .accept_bulk("u2", &["r1".to_string(), "r2".to_string()])
            .await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(
            outcomes[1].result,
            Err(AppError::RequestNotFound(_))
        ));
    }
}
