//! Notification sink and the persisting default implementation.
//!
//! Delivery (push, email, websocket) is someone else's problem: the engine
//! hands events to a [`NotificationSink`] after the owning mutation has
//! committed, and a sink failure is logged by the caller, never surfaced.

use async_trait::async_trait;
use campus_common::{AppResult, IdGenerator};
use campus_db::{
    entities::notification::{self, NotificationKind},
    repositories::NotificationRepository,
};
use sea_orm::Set;
use serde::Serialize;

/// An engine event worth telling a student about.
#[derive(Debug, Clone, Serialize)]
pub enum NotificationEvent {
    /// Someone sent the recipient a friend request.
    FriendRequestReceived {
        /// The request's sender.
        sender_id: String,
    },
    /// A request the recipient sent was accepted.
    FriendRequestAccepted {
        /// The accepting receiver.
        receiver_id: String,
    },
    /// Someone started following the recipient.
    NewFollower {
        /// The new follower.
        follower_id: String,
    },
    /// Someone the recipient follows posted a story.
    NewStory {
        /// The story's author.
        author_id: String,
        /// The new story.
        story_id: String,
    },
}

/// Fire-and-forget notification outlet.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one event to one recipient.
    async fn deliver(&self, recipient_id: &str, event: NotificationEvent) -> AppResult<()>;
}

/// Notification service: the default sink, persisting notification rows.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(notification_repo: NotificationRepository) -> Self {
        Self {
            notification_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Notifications for a recipient, newest first (paginated).
    pub async fn list_for(
        &self,
        recipient_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<notification::Model>> {
        self.notification_repo
            .find_for_recipient(recipient_id, limit, until_id)
            .await
    }

    /// Mark the given notifications read for a recipient.
    pub async fn mark_read(&self, recipient_id: &str, ids: &[String]) -> AppResult<u64> {
        self.notification_repo.mark_read(recipient_id, ids).await
    }

    /// Count a recipient's unread notifications.
    pub async fn unread_count(&self, recipient_id: &str) -> AppResult<u64> {
        self.notification_repo.unread_count(recipient_id).await
    }
}

#[async_trait]
impl NotificationSink for NotificationService {
    async fn deliver(&self, recipient_id: &str, event: NotificationEvent) -> AppResult<()> {
        let (kind, actor_id, story_id) = match event {
            NotificationEvent::FriendRequestReceived { sender_id } => {
                (NotificationKind::FriendRequestReceived, Some(sender_id), None)
            }
            NotificationEvent::FriendRequestAccepted { receiver_id } => {
                (NotificationKind::FriendRequestAccepted, Some(receiver_id), None)
            }
            NotificationEvent::NewFollower { follower_id } => {
                (NotificationKind::NewFollower, Some(follower_id), None)
            }
            NotificationEvent::NewStory { author_id, story_id } => {
                (NotificationKind::NewStory, Some(author_id), Some(story_id))
            }
        };

        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            recipient_id: Set(recipient_id.to_string()),
            kind: Set(kind),
            actor_id: Set(actor_id),
            story_id: Set(story_id),
            is_read: Set(false),
            created_at: Set(chrono::Utc::now().into()),
        };

        self.notification_repo.create(model).await?;
        Ok(())
    }
}

/// Deliver an event through an optional sink, logging failures instead of
/// surfacing them.
pub(crate) async fn dispatch(
    sink: Option<&std::sync::Arc<dyn NotificationSink>>,
    recipient_id: &str,
    event: NotificationEvent,
) {
    if let Some(sink) = sink {
        if let Err(e) = sink.deliver(recipient_id, event).await {
            tracing::warn!(error = %e, recipient_id, "Failed to deliver notification");
        }
    }
}
