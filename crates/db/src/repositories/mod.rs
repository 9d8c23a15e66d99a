//! Repository layer.
//!
//! Repositories are pure data access: find/create/delete keyed by ids or
//! ordered actor pairs. Policy (visibility, workflow rules) lives in
//! `campus-core`. Mutators that participate in multi-relation transactions
//! have `*_in` variants taking any [`sea_orm::ConnectionTrait`] so services
//! can run them against an open transaction.

#![allow(missing_docs)]

pub mod blocking;
pub mod comment;
pub mod featured_story;
pub mod following;
pub mod friend_request;
pub mod like;
pub mod notification;
pub mod post;
pub mod story;
pub mod story_viewer;
pub mod student;

pub use blocking::BlockingRepository;
pub use comment::CommentRepository;
pub use featured_story::FeaturedStoryRepository;
pub use following::FollowingRepository;
pub use friend_request::FriendRequestRepository;
pub use like::LikeRepository;
pub use notification::NotificationRepository;
pub use post::PostRepository;
pub use story::StoryRepository;
pub use story_viewer::StoryViewerRepository;
pub use student::StudentRepository;

use campus_common::AppError;
use sea_orm::{DbErr, SqlErr};

/// Translate a database error, surfacing unique-index violations as
/// conflicts so concurrent duplicate attempts lose with a typed error
/// instead of a generic database failure.
pub(crate) fn map_db_err(e: DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => AppError::Conflict(msg),
        _ => AppError::Database(e.to_string()),
    }
}
