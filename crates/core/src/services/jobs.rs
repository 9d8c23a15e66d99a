//! Timer-driven maintenance sweeps.
//!
//! The sweeps never run on the request path: a scheduler task owns them,
//! each one is idempotent, and a failed run is logged and retried on the
//! next tick.

use std::sync::Arc;
use std::time::Duration;

use crate::services::popularity::PopularityService;
use crate::services::story::StoryService;
use campus_common::AppResult;
use campus_common::config::SchedulerSettings;
use tokio::time::interval;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between archive sweeps (default: 1 hour).
    pub archive_interval: Duration,
    /// Interval between popularity recomputes (default: 1 hour).
    pub score_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            archive_interval: Duration::from_secs(3600),
            score_interval: Duration::from_secs(3600),
        }
    }
}

impl From<&SchedulerSettings> for SchedulerConfig {
    fn from(settings: &SchedulerSettings) -> Self {
        Self {
            archive_interval: Duration::from_secs(settings.archive_interval_secs),
            score_interval: Duration::from_secs(settings.score_interval_secs),
        }
    }
}

/// Job executor trait for the periodic sweeps.
#[async_trait::async_trait]
pub trait JobExecutor: Send + Sync {
    /// Archive every expired, unfeatured story. Returns the count archived.
    async fn archive_expired_stories(&self) -> AppResult<u64>;

    /// Recompute and persist popularity scores for live stories. Returns
    /// the count updated.
    async fn recompute_story_scores(&self) -> AppResult<u64>;
}

/// The production executor, delegating to the engine services.
#[derive(Clone)]
pub struct SweepExecutor {
    story: StoryService,
    popularity: PopularityService,
}

impl SweepExecutor {
    /// Create a new sweep executor.
    #[must_use]
    pub const fn new(story: StoryService, popularity: PopularityService) -> Self {
        Self { story, popularity }
    }
}

#[async_trait::async_trait]
impl JobExecutor for SweepExecutor {
    async fn archive_expired_stories(&self) -> AppResult<u64> {
        self.story.archive_expired().await
    }

    async fn recompute_story_scores(&self) -> AppResult<u64> {
        self.popularity.recompute_story_scores().await
    }
}

/// Run the scheduler with the given configuration and executor.
pub async fn run_scheduler<E: JobExecutor + 'static>(config: SchedulerConfig, executor: Arc<E>) {
    let executor_archive = executor.clone();
    let executor_score = executor;

    let archive_interval = config.archive_interval;
    let score_interval = config.score_interval;

    // Spawn story archive task
    tokio::spawn(async move {
        let mut interval = interval(archive_interval);
        loop {
            interval.tick().await;
            match executor_archive.archive_expired_stories().await {
                Ok(count) => {
                    if count > 0 {
                        tracing::info!(count, "Archived expired stories");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to archive expired stories");
                }
            }
        }
    });

    // Spawn score recompute task
    tokio::spawn(async move {
        let mut interval = interval(score_interval);
        loop {
            interval.tick().await;
            match executor_score.recompute_story_scores().await {
                Ok(count) => {
                    if count > 0 {
                        tracing::debug!(count, "Recomputed story scores");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to recompute story scores");
                }
            }
        }
    });
}
