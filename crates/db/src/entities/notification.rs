//! Notification entity (persisted fan-out of engine events).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What happened, from the recipient's point of view.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum NotificationKind {
    #[sea_orm(string_value = "friend_request_received")]
    FriendRequestReceived,
    #[sea_orm(string_value = "friend_request_accepted")]
    FriendRequestAccepted,
    #[sea_orm(string_value = "new_follower")]
    NewFollower,
    #[sea_orm(string_value = "new_story")]
    NewStory,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The student being notified
    pub recipient_id: String,

    pub kind: NotificationKind,

    /// The student whose action triggered the notification, if any
    #[sea_orm(nullable)]
    pub actor_id: Option<String>,

    #[sea_orm(nullable)]
    pub story_id: Option<String>,

    pub is_read: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::RecipientId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Recipient,
}

impl ActiveModelBehavior for ActiveModel {}
