//! Friend request entity (pending connection proposals for private profiles).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Request lifecycle status.
///
/// Accepted requests are deleted together with the follow creation, so the
/// stored value is effectively Pending or Rejected; Rejected rows are kept
/// for audit and filtered out of every listing.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum RequestStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "friend_request")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The student who sent the request
    pub sender_id: String,

    /// The student who received the request
    pub receiver_id: String,

    pub status: RequestStatus,

    pub sent_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::SenderId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Sender,

    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::ReceiverId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Receiver,
}

impl ActiveModelBehavior for ActiveModel {}
