//! Student entity (accounts owning content and relationships).
//!
//! The engine only reads the `is_private` / `is_active` / `is_deleted`
//! flags; account management lives outside this workspace.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub username: String,

    /// Private profiles are only visible to accepted followers
    pub is_private: bool,

    /// Inactive accounts cannot be the subject of relationship operations
    pub is_active: bool,

    /// Soft-delete marker
    pub is_deleted: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::story::Entity")]
    Stories,

    #[sea_orm(has_many = "super::post::Entity")]
    Posts,

    #[sea_orm(has_many = "super::featured_story::Entity")]
    FeaturedStories,
}

impl Model {
    /// Whether the account can participate in relationship operations.
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        self.is_active && !self.is_deleted
    }
}

impl ActiveModelBehavior for ActiveModel {}
