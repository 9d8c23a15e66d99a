//! Visibility service.
//!
//! The single access-control gate for profiles, posts, stories, comments,
//! likes and tagging. The same block/privacy rules used to be repeated
//! inline by every content manager; everything now funnels through
//! [`VisibilityService::can_access`].

use campus_common::{AppError, AppResult};
use campus_db::repositories::{BlockingRepository, FollowingRepository, StudentRepository};

/// Outcome of a visibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// The actor may see or interact with the subject.
    Allowed,
    /// The actor may not, for the given reason.
    Denied(DenialReason),
}

/// Why access was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// A block exists between the two parties, in either direction.
    Blocked,
    /// The owner is private and the actor is not an accepted follower.
    PrivateProfile,
    /// The tag candidate is outside the actor's followers/following.
    UnauthorizedTag,
    /// The tag candidate is blocked by, or blocking, the actor.
    BlockedTag,
}

impl AccessDecision {
    /// Whether the decision allows access.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Visibility service: stateless predicates over the relationship store.
///
/// Safe to call redundantly; no method here mutates anything.
#[derive(Clone)]
pub struct VisibilityService {
    student_repo: StudentRepository,
    following_repo: FollowingRepository,
    blocking_repo: BlockingRepository,
}

impl VisibilityService {
    /// Create a new visibility service.
    #[must_use]
    pub const fn new(
        student_repo: StudentRepository,
        following_repo: FollowingRepository,
        blocking_repo: BlockingRepository,
    ) -> Self {
        Self {
            student_repo,
            following_repo,
            blocking_repo,
        }
    }

    /// Decide whether `actor_id` may view content owned by `owner_id`.
    ///
    /// Rule order is fixed and first-match-wins:
    /// 1. self-access is always allowed;
    /// 2. a block in either direction denies;
    /// 3. a private owner without an accepted follow denies;
    /// 4. otherwise allowed.
    pub async fn can_access(&self, actor_id: &str, owner_id: &str) -> AppResult<AccessDecision> {
        if actor_id == owner_id {
            return Ok(AccessDecision::Allowed);
        }

        if self
            .blocking_repo
            .is_blocked_between(actor_id, owner_id)
            .await?
        {
            return Ok(AccessDecision::Denied(DenialReason::Blocked));
        }

        let owner = self.student_repo.get_by_id(owner_id).await?;
        if owner.is_private
            && !self
                .following_repo
                .is_following(actor_id, owner_id)
                .await?
        {
            return Ok(AccessDecision::Denied(DenialReason::PrivateProfile));
        }

        Ok(AccessDecision::Allowed)
    }

    /// Like [`Self::can_access`], but mapped onto [`AppError`] for call
    /// sites that gate an operation.
    pub async fn ensure_can_access(&self, actor_id: &str, owner_id: &str) -> AppResult<()> {
        match self.can_access(actor_id, owner_id).await? {
            AccessDecision::Allowed => Ok(()),
            AccessDecision::Denied(DenialReason::PrivateProfile) => Err(AppError::PrivateProfile),
            AccessDecision::Denied(_) => Err(AppError::Blocked),
        }
    }

    /// Decide whether `actor_id` may tag `candidate_id` in content.
    ///
    /// The candidate must be inside the actor's circle (following or
    /// follower) and not blocked in either direction; blocks take
    /// precedence over the circle check.
    pub async fn can_tag(&self, actor_id: &str, candidate_id: &str) -> AppResult<AccessDecision> {
        if self
            .blocking_repo
            .is_blocked_between(actor_id, candidate_id)
            .await?
        {
            return Ok(AccessDecision::Denied(DenialReason::BlockedTag));
        }

        let in_circle = self
            .following_repo
            .is_following(actor_id, candidate_id)
            .await?
            || self
                .following_repo
                .is_following(candidate_id, actor_id)
                .await?;

        if in_circle {
            Ok(AccessDecision::Allowed)
        } else {
            Ok(AccessDecision::Denied(DenialReason::UnauthorizedTag))
        }
    }

    /// Like [`Self::can_tag`], mapped onto [`AppError`].
    pub async fn ensure_can_tag(&self, actor_id: &str, candidate_id: &str) -> AppResult<()> {
        match self.can_tag(actor_id, candidate_id).await? {
            AccessDecision::Allowed => Ok(()),
            AccessDecision::Denied(DenialReason::BlockedTag) => {
                Err(AppError::BlockedTag(candidate_id.to_string()))
            }
            AccessDecision::Denied(_) => Err(AppError::UnauthorizedTag(candidate_id.to_string())),
        }
    }

    /// Symmetric block check, exposed for the workflow services.
    pub async fn is_blocked_between(&self, user_a: &str, user_b: &str) -> AppResult<bool> {
        self.blocking_repo.is_blocked_between(user_a, user_b).await
    }
}
