//! Database entities.

#![allow(missing_docs)]

pub mod blocking;
pub mod comment;
pub mod featured_story;
pub mod following;
pub mod friend_request;
pub mod like;
pub mod notification;
pub mod post;
pub mod post_tag;
pub mod story;
pub mod story_viewer;
pub mod student;

pub use blocking::Entity as Blocking;
pub use comment::Entity as Comment;
pub use featured_story::Entity as FeaturedStory;
pub use following::Entity as Following;
pub use friend_request::Entity as FriendRequest;
pub use like::Entity as Like;
pub use notification::Entity as Notification;
pub use post::Entity as Post;
pub use post_tag::Entity as PostTag;
pub use story::Entity as Story;
pub use story_viewer::Entity as StoryViewer;
pub use student::Entity as Student;
