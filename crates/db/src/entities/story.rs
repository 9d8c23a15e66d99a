//! Story entity (ephemeral, time-boxed content).
//!
//! Activity is derived, never stored: a story is active while it is
//! featured, or while it is unarchived and its expiry lies in the future.
//! Archiving is a state transition (`archived_at` set), not a delete.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "story")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The student who posted the story
    pub author_id: String,

    /// Opaque media reference; upload/transcoding happen elsewhere
    pub media_url: String,

    pub created_at: DateTimeWithTimeZone,

    pub expires_at: DateTimeWithTimeZone,

    /// Featured stories are exempt from expiry while their group exists
    pub is_featured: bool,

    /// Group this story was promoted into, if any
    #[sea_orm(nullable)]
    pub featured_story_id: Option<String>,

    /// Set when the story leaves the active list (expiry sweep or manual)
    #[sea_orm(nullable)]
    pub archived_at: Option<DateTimeWithTimeZone>,

    /// Popularity score, recomputed by the periodic sweep
    pub score: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::AuthorId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Author,

    #[sea_orm(
        belongs_to = "super::featured_story::Entity",
        from = "Column::FeaturedStoryId",
        to = "super::featured_story::Column::Id",
        on_delete = "SetNull"
    )]
    FeaturedStory,

    #[sea_orm(has_many = "super::story_viewer::Entity")]
    Viewers,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::featured_story::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeaturedStory.def()
    }
}

impl Model {
    /// Whether the story is currently visible in active listings.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.is_featured || (self.archived_at.is_none() && now < self.expires_at.to_utc())
    }
}

impl ActiveModelBehavior for ActiveModel {}
