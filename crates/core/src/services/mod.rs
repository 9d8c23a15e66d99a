//! Business logic services.

#![allow(missing_docs)]

pub mod blocking;
pub mod content_store;
pub mod following;
pub mod friend_request;
pub mod jobs;
pub mod notification;
pub mod popularity;
pub mod story;
pub mod visibility;

pub use blocking::BlockingService;
pub use content_store::{ContentStore, DbContentStore};
pub use following::FollowingService;
pub use friend_request::{BulkOutcome, FriendRequestService, SendOutcome};
pub use jobs::{JobExecutor, SchedulerConfig, SweepExecutor, run_scheduler};
pub use notification::{NotificationEvent, NotificationService, NotificationSink};
pub use popularity::PopularityService;
pub use story::StoryService;
pub use visibility::{AccessDecision, DenialReason, VisibilityService};
