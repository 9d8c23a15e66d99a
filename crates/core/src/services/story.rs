//! Story service.
//!
//! Lifecycle: `ACTIVE -> EXPIRED -> ARCHIVED` by the clock and the sweep,
//! `ACTIVE -> FEATURED` by the author. Every read of someone else's story
//! goes through the visibility gate; every transition is a conditional
//! update so the sweep and the author can race safely.

use std::sync::Arc;

use crate::services::notification::{self, NotificationEvent, NotificationSink};
use crate::services::visibility::VisibilityService;
use campus_common::{AppError, AppResult, Clock, IdGenerator, SystemClock};
use campus_db::{
    entities::{featured_story, story, story_viewer},
    repositories::{
        FeaturedStoryRepository, FollowingRepository, StoryRepository, StoryViewerRepository,
        StudentRepository,
    },
};
use chrono::Duration;
use sea_orm::{DatabaseConnection, Set, TransactionTrait};

/// Default story lifetime.
const STORY_TTL_HOURS: i64 = 24;

/// Title given to a featured group created on the fly.
const DEFAULT_GROUP_TITLE: &str = "Highlights";

/// Story service for business logic.
#[derive(Clone)]
pub struct StoryService {
    db: Arc<DatabaseConnection>,
    story_repo: StoryRepository,
    featured_repo: FeaturedStoryRepository,
    viewer_repo: StoryViewerRepository,
    student_repo: StudentRepository,
    following_repo: FollowingRepository,
    visibility: VisibilityService,
    sink: Option<Arc<dyn NotificationSink>>,
    clock: Arc<dyn Clock>,
    id_gen: IdGenerator,
}

impl StoryService {
    /// Create a new story service using the system clock.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        story_repo: StoryRepository,
        featured_repo: FeaturedStoryRepository,
        viewer_repo: StoryViewerRepository,
        student_repo: StudentRepository,
        following_repo: FollowingRepository,
        visibility: VisibilityService,
    ) -> Self {
        Self {
            db,
            story_repo,
            featured_repo,
            viewer_repo,
            student_repo,
            following_repo,
            visibility,
            sink: None,
            clock: Arc::new(SystemClock),
            id_gen: IdGenerator::new(),
        }
    }

    /// Replace the clock (deterministic expiry in tests).
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the notification sink.
    pub fn set_notification_sink(&mut self, sink: Arc<dyn NotificationSink>) {
        self.sink = Some(sink);
    }

    /// Post a new story. No visibility check applies to one's own content;
    /// viewers are gated later, at read time.
    pub async fn create(&self, author_id: &str, media_url: &str) -> AppResult<story::Model> {
        self.student_repo.get_usable_by_id(author_id).await?;

        let now = self.clock.now();
        let model = story::ActiveModel {
            id: Set(self.id_gen.generate()),
            author_id: Set(author_id.to_string()),
            media_url: Set(media_url.to_string()),
            created_at: Set(now.fixed_offset()),
            expires_at: Set((now + Duration::hours(STORY_TTL_HOURS)).fixed_offset()),
            is_featured: Set(false),
            featured_story_id: Set(None),
            archived_at: Set(None),
            score: Set(0),
        };
        let created = self.story_repo.create(model).await?;

        if self.sink.is_some() {
            let followers = self
                .following_repo
                .find_followers(author_id, 1000, None)
                .await?;
            for relation in followers {
                notification::dispatch(
                    self.sink.as_ref(),
                    &relation.follower_id,
                    NotificationEvent::NewStory {
                        author_id: author_id.to_string(),
                        story_id: created.id.clone(),
                    },
                )
                .await;
            }
        }

        Ok(created)
    }

    /// View a story.
    ///
    /// Requires the story to be active and the viewer to pass the
    /// visibility gate against the author. The first view is recorded;
    /// repeat views change nothing.
    pub async fn view(&self, actor_id: &str, story_id: &str) -> AppResult<story::Model> {
        let story = self.story_repo.get_by_id(story_id).await?;

        if !story.is_active(self.clock.now()) {
            return Err(AppError::StoryNotActive);
        }

        self.visibility
            .ensure_can_access(actor_id, &story.author_id)
            .await?;

        let viewer = story_viewer::ActiveModel {
            id: Set(self.id_gen.generate()),
            story_id: Set(story_id.to_string()),
            viewer_id: Set(actor_id.to_string()),
            viewed_at: Set(self.clock.now().fixed_offset()),
        };
        self.viewer_repo.record_view(viewer).await?;

        Ok(story)
    }

    /// Promote a story into a featured group, exempting it from expiry.
    ///
    /// With `group_id` the story joins that existing group; without, a new
    /// group is created with a default title and the story's media as its
    /// cover. Group creation and the story transition commit together.
    pub async fn feature(
        &self,
        author_id: &str,
        story_id: &str,
        group_id: Option<&str>,
    ) -> AppResult<featured_story::Model> {
        let story = self.story_repo.get_by_id(story_id).await?;

        if story.author_id != author_id {
            return Err(AppError::NotOwner(story_id.to_string()));
        }
        if story.is_featured || story.featured_story_id.is_some() {
            return Err(AppError::AlreadyFeatured);
        }
        if story.archived_at.is_some() {
            return Err(AppError::StoryNotActive);
        }

        let existing = match group_id {
            Some(id) => {
                let group = self.featured_repo.get_by_id(id).await?;
                if group.author_id != author_id {
                    return Err(AppError::NotOwner(id.to_string()));
                }
                Some(group)
            }
            None => None,
        };

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let group = match existing {
            Some(group) => group,
            None => {
                let model = featured_story::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    author_id: Set(author_id.to_string()),
                    title: Set(DEFAULT_GROUP_TITLE.to_string()),
                    cover_media_url: Set(story.media_url.clone()),
                    created_at: Set(self.clock.now().fixed_offset()),
                };
                self.featured_repo.create_in(&txn, model).await?
            }
        };

        let transitioned = self
            .story_repo
            .set_featured_in(&txn, story_id, &group.id)
            .await?;
        if !transitioned {
            return Err(AppError::Conflict(
                "story was modified concurrently".to_string(),
            ));
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(group)
    }

    /// Extend an active, unfeatured story's lifetime by 1 to 24 hours.
    pub async fn extend_duration(
        &self,
        author_id: &str,
        story_id: &str,
        hours: i64,
    ) -> AppResult<()> {
        if !(1..=24).contains(&hours) {
            return Err(AppError::InvalidHourRange(hours));
        }

        let story = self.story_repo.get_by_id(story_id).await?;
        if story.author_id != author_id {
            return Err(AppError::NotOwner(story_id.to_string()));
        }
        if !story.is_active(self.clock.now()) {
            return Err(AppError::StoryNotActive);
        }
        if story.is_featured {
            return Err(AppError::FeaturedImmutable);
        }

        let from = story.expires_at.to_utc();
        let extended = self
            .story_repo
            .extend_expiry(story_id, from, from + Duration::hours(hours))
            .await?;
        if !extended {
            // The sweep archived it, or another extend won; either way the
            // story is no longer in the state this extension was computed
            // from.
            return Err(AppError::Conflict(
                "story was modified concurrently".to_string(),
            ));
        }

        Ok(())
    }

    /// Archive a story immediately, regardless of expiry (owner only).
    pub async fn archive(&self, author_id: &str, story_id: &str) -> AppResult<()> {
        let story = self.story_repo.get_by_id(story_id).await?;
        if story.author_id != author_id {
            return Err(AppError::NotOwner(story_id.to_string()));
        }

        let archived = self
            .story_repo
            .archive_by_id(story_id, self.clock.now())
            .await?;
        if !archived {
            return Err(AppError::AlreadyArchived);
        }

        Ok(())
    }

    /// Periodic sweep: move every expired, unfeatured story to the
    /// archive. Idempotent; returns how many stories moved.
    pub async fn archive_expired(&self) -> AppResult<u64> {
        let archived = self.story_repo.archive_expired(self.clock.now()).await?;
        if archived > 0 {
            tracing::info!(archived, "Archived expired stories");
        }
        Ok(archived)
    }

    /// The caller's own active stories.
    pub async fn active_stories(&self, author_id: &str) -> AppResult<Vec<story::Model>> {
        let now = self.clock.now();
        let stories = self.story_repo.find_unarchived_by_author(author_id).await?;
        Ok(stories.into_iter().filter(|s| s.is_active(now)).collect())
    }

    /// The caller's archive.
    pub async fn archived_stories(&self, author_id: &str) -> AppResult<Vec<story::Model>> {
        self.story_repo.find_archived_by_author(author_id).await
    }

    /// Another student's active stories, behind the visibility gate.
    pub async fn stories_of(&self, actor_id: &str, owner_id: &str) -> AppResult<Vec<story::Model>> {
        self.visibility.ensure_can_access(actor_id, owner_id).await?;
        self.active_stories(owner_id).await
    }

    /// Who viewed a story (owner only, active stories only).
    pub async fn viewers(
        &self,
        author_id: &str,
        story_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<story_viewer::Model>> {
        let story = self.owned_active_story(author_id, story_id).await?;
        self.viewer_repo.find_by_story(&story.id, limit, until_id).await
    }

    /// How many distinct students viewed a story (owner only).
    pub async fn view_count(&self, author_id: &str, story_id: &str) -> AppResult<u64> {
        let story = self.owned_active_story(author_id, story_id).await?;
        self.viewer_repo.count_for_story(&story.id).await
    }

    /// The caller's featured groups.
    pub async fn my_groups(&self, author_id: &str) -> AppResult<Vec<featured_story::Model>> {
        self.featured_repo.find_by_author(author_id).await
    }

    /// Another student's featured groups, behind the visibility gate.
    pub async fn groups_of(
        &self,
        actor_id: &str,
        owner_id: &str,
    ) -> AppResult<Vec<featured_story::Model>> {
        self.visibility.ensure_can_access(actor_id, owner_id).await?;
        self.featured_repo.find_by_author(owner_id).await
    }

    /// Stories inside a featured group, behind the visibility gate.
    pub async fn group_stories(
        &self,
        actor_id: &str,
        group_id: &str,
    ) -> AppResult<Vec<story::Model>> {
        let group = self.featured_repo.get_by_id(group_id).await?;
        self.visibility
            .ensure_can_access(actor_id, &group.author_id)
            .await?;
        self.story_repo.find_by_group(group_id).await
    }

    /// Rename a featured group and/or replace its cover (owner only).
    pub async fn update_group(
        &self,
        author_id: &str,
        group_id: &str,
        title: Option<&str>,
        cover_media_url: Option<&str>,
    ) -> AppResult<()> {
        let group = self.featured_repo.get_by_id(group_id).await?;
        if group.author_id != author_id {
            return Err(AppError::NotOwner(group_id.to_string()));
        }
        self.featured_repo
            .update_meta(group_id, title, cover_media_url)
            .await
    }

    async fn owned_active_story(
        &self,
        author_id: &str,
        story_id: &str,
    ) -> AppResult<story::Model> {
        let story = self.story_repo.get_by_id(story_id).await?;
        if story.author_id != author_id {
            return Err(AppError::NotOwner(story_id.to_string()));
        }
        if !story.is_active(self.clock.now()) {
            return Err(AppError::StoryNotActive);
        }
        Ok(story)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use campus_common::ManualClock;
    use campus_db::entities::student;
    use campus_db::repositories::BlockingRepository;
    use chrono::{DateTime, TimeZone, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::collections::BTreeMap;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn test_student(id: &str, is_private: bool) -> student::Model {
        student::Model {
            id: id.to_string(),
            username: format!("user_{id}"),
            is_private,
            is_active: true,
            is_deleted: false,
            created_at: t0().into(),
        }
    }

    fn test_story(id: &str, author: &str, created: DateTime<Utc>) -> story::Model {
        story::Model {
            id: id.to_string(),
            author_id: author.to_string(),
            media_url: format!("media/{id}.jpg"),
            created_at: created.fixed_offset(),
            expires_at: (created + Duration::hours(24)).fixed_offset(),
            is_featured: false,
            featured_story_id: None,
            archived_at: None,
            score: 0,
        }
    }

    fn test_group(id: &str, author: &str) -> featured_story::Model {
        featured_story::Model {
            id: id.to_string(),
            author_id: author.to_string(),
            title: "Highlights".to_string(),
            cover_media_url: "media/s1.jpg".to_string(),
            created_at: t0().into(),
        }
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, sea_orm::Value> {
        let mut row = BTreeMap::new();
        row.insert("num_items", sea_orm::Value::BigInt(Some(n)));
        row
    }

    fn exec_ok(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    fn service(db: Arc<DatabaseConnection>, clock: ManualClock) -> StoryService {
        let visibility = VisibilityService::new(
            StudentRepository::new(db.clone()),
            FollowingRepository::new(db.clone()),
            BlockingRepository::new(db.clone()),
        );
        StoryService::new(
            db.clone(),
            StoryRepository::new(db.clone()),
            FeaturedStoryRepository::new(db.clone()),
            StoryViewerRepository::new(db.clone()),
            StudentRepository::new(db.clone()),
            FollowingRepository::new(db),
            visibility,
        )
        .with_clock(Arc::new(clock))
    }

    #[tokio::test]
    async fn test_create_sets_24h_expiry() {
        let clock = ManualClock::new(t0());
        let created = test_story("s1", "u1", t0());
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_student("u1", false)]])
                .append_query_results([[created]])
                .into_connection(),
        );

        let story = service(db, clock).create("u1", "media/s1.jpg").await.unwrap();
        assert_eq!(story.expires_at.to_utc(), t0() + Duration::hours(24));
        assert!(story.is_active(t0()));
    }

    #[tokio::test]
    async fn test_view_expired_story_rejected() {
        let clock = ManualClock::new(t0());
        clock.advance(Duration::hours(25));

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_story("s1", "u1", t0())]])
                .into_connection(),
        );

        let result = service(db, clock).view("u2", "s1").await;
        assert!(matches!(result, Err(AppError::StoryNotActive)));
    }

    #[tokio::test]
    async fn test_view_active_story_records_first_view() {
        let clock = ManualClock::new(t0());
        clock.advance(Duration::hours(23));

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // story fetch, block count, owner fetch, insert view
                .append_query_results([[test_story("s1", "u1", t0())]])
                .append_query_results([[count_row(0)]])
                .append_query_results([[test_student("u1", false)]])
                .append_exec_results([exec_ok(1)])
                .into_connection(),
        );

        let story = service(db, clock).view("u2", "s1").await.unwrap();
        assert_eq!(story.id, "s1");
    }

    #[tokio::test]
    async fn test_view_blocked_viewer_rejected() {
        let clock = ManualClock::new(t0());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_story("s1", "u1", t0())]])
                .append_query_results([[count_row(1)]])
                .into_connection(),
        );

        let result = service(db, clock).view("u2", "s1").await;
        assert!(matches!(result, Err(AppError::Blocked)));
    }

    #[tokio::test]
    async fn test_feature_someone_elses_story_rejected() {
        let clock = ManualClock::new(t0());
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_story("s1", "u1", t0())]])
                .into_connection(),
        );

        let result = service(db, clock).feature("u2", "s1", None).await;
        assert!(matches!(result, Err(AppError::NotOwner(_))));
    }

    #[tokio::test]
    async fn test_feature_already_featured_rejected() {
        let clock = ManualClock::new(t0());
        let mut story = test_story("s1", "u1", t0());
        story.is_featured = true;
        story.featured_story_id = Some("g1".to_string());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[story]])
                .into_connection(),
        );

        let result = service(db, clock).feature("u1", "s1", None).await;
        assert!(matches!(result, Err(AppError::AlreadyFeatured)));
    }

    #[tokio::test]
    async fn test_feature_into_new_group() {
        let clock = ManualClock::new(t0());
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_story("s1", "u1", t0())]])
                .append_query_results([[test_group("g1", "u1")]])
                .append_exec_results([exec_ok(1)])
                .into_connection(),
        );

        let group = service(db, clock).feature("u1", "s1", None).await.unwrap();
        assert_eq!(group.author_id, "u1");
        assert_eq!(group.title, "Highlights");
    }

    #[tokio::test]
    async fn test_feature_into_missing_group() {
        let clock = ManualClock::new(t0());
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_story("s1", "u1", t0())]])
                .append_query_results([Vec::<featured_story::Model>::new()])
                .into_connection(),
        );

        let result = service(db, clock).feature("u1", "s1", Some("missing")).await;
        assert!(matches!(result, Err(AppError::GroupNotFound(_))));
    }

    #[tokio::test]
    async fn test_extend_out_of_range() {
        let clock = ManualClock::new(t0());
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let result = service(db, clock).extend_duration("u1", "s1", 25).await;
        assert!(matches!(result, Err(AppError::InvalidHourRange(25))));
    }

    #[tokio::test]
    async fn test_extend_featured_story_rejected() {
        let clock = ManualClock::new(t0());
        let mut story = test_story("s1", "u1", t0());
        story.is_featured = true;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[story]])
                .into_connection(),
        );

        let result = service(db, clock).extend_duration("u1", "s1", 2).await;
        assert!(matches!(result, Err(AppError::FeaturedImmutable)));
    }

    #[tokio::test]
    async fn test_extend_expired_story_rejected() {
        let clock = ManualClock::new(t0());
        clock.advance(Duration::hours(25));

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_story("s1", "u1", t0())]])
                .into_connection(),
        );

        let result = service(db, clock).extend_duration("u1", "s1", 2).await;
        assert!(matches!(result, Err(AppError::StoryNotActive)));
    }

    #[tokio::test]
    async fn test_extend_lost_race_is_conflict() {
        let clock = ManualClock::new(t0());
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_story("s1", "u1", t0())]])
                .append_exec_results([exec_ok(0)])
                .into_connection(),
        );

        let result = service(db, clock).extend_duration("u1", "s1", 2).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_manual_archive_twice_rejected() {
        let clock = ManualClock::new(t0());
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_story("s1", "u1", t0())]])
                .append_exec_results([exec_ok(0)])
                .into_connection(),
        );

        let result = service(db, clock).archive("u1", "s1").await;
        assert!(matches!(result, Err(AppError::AlreadyArchived)));
    }

    #[tokio::test]
    async fn test_archive_expired_sweep_is_idempotent() {
        let clock = ManualClock::new(t0());
        clock.advance(Duration::hours(25));

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec_ok(2), exec_ok(0)])
                .into_connection(),
        );

        let svc = service(db, clock);
        assert_eq!(svc.archive_expired().await.unwrap(), 2);
        // Second run finds nothing left to archive.
        assert_eq!(svc.archive_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_active_stories_filters_by_clock() {
        let clock = ManualClock::new(t0());
        clock.advance(Duration::hours(25));

        let fresh = test_story("s2", "u1", t0() + Duration::hours(20));
        let stale = test_story("s1", "u1", t0());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fresh, stale]])
                .into_connection(),
        );

        let active = service(db, clock).active_stories("u1").await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "s2");
    }

    #[tokio::test]
    async fn test_viewers_hidden_from_non_owner() {
        let clock = ManualClock::new(t0());
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_story("s1", "u1", t0())]])
                .into_connection(),
        );

        let result = service(db, clock).viewers("u2", "s1", 10, None).await;
        assert!(matches!(result, Err(AppError::NotOwner(_))));
    }
}
