//! Error types for campus-rs.

use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Coarse error family, mirroring how callers are expected to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced entity does not resolve.
    NotFound,
    /// The operation would duplicate an existing relation or state.
    Conflict,
    /// The actor is not allowed to see or touch the subject.
    Authorization,
    /// The subject is in a state that forbids the operation.
    StateViolation,
    /// Infrastructure failure (database, configuration, internal).
    Server,
}

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Not found ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Student not found: {0}")]
    StudentNotFound(String),

    #[error("Story not found: {0}")]
    StoryNotFound(String),

    #[error("Post not found: {0}")]
    PostNotFound(String),

    #[error("Friend request not found: {0}")]
    RequestNotFound(String),

    #[error("Featured story group not found: {0}")]
    GroupNotFound(String),

    // === Conflict ===
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Already following this user")]
    AlreadyFollowing,

    #[error("Already blocking this user")]
    AlreadyBlocked,

    #[error("Friend request already pending")]
    AlreadySentRequest,

    #[error("Story is already featured")]
    AlreadyFeatured,

    #[error("Story is already archived")]
    AlreadyArchived,

    // === Authorization ===
    #[error("Blocked between users")]
    Blocked,

    #[error("Profile is private")]
    PrivateProfile,

    #[error("Not following this user")]
    NotFollowing,

    #[error("Not the owner: {0}")]
    NotOwner(String),

    #[error("Cannot tag user outside followers/following: {0}")]
    UnauthorizedTag(String),

    #[error("Cannot tag a blocked user: {0}")]
    BlockedTag(String),

    // === State violations ===
    #[error("Story is not active")]
    StoryNotActive,

    #[error("Featured stories cannot change duration")]
    FeaturedImmutable,

    #[error("Extension hours must be between 1 and 24, got {0}")]
    InvalidHourRange(i64),

    #[error("Operation cannot target yourself: {0}")]
    SelfAction(String),

    #[error("Student account is inactive or deleted: {0}")]
    StudentInactive(String),

    // === Server errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the error family for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_)
            | Self::StudentNotFound(_)
            | Self::StoryNotFound(_)
            | Self::PostNotFound(_)
            | Self::RequestNotFound(_)
            | Self::GroupNotFound(_) => ErrorKind::NotFound,

            Self::Conflict(_)
            | Self::AlreadyFollowing
            | Self::AlreadyBlocked
            | Self::AlreadySentRequest
            | Self::AlreadyFeatured
            | Self::AlreadyArchived => ErrorKind::Conflict,

            Self::Blocked
            | Self::PrivateProfile
            | Self::NotFollowing
            | Self::NotOwner(_)
            | Self::UnauthorizedTag(_)
            | Self::BlockedTag(_) => ErrorKind::Authorization,

            Self::StoryNotActive
            | Self::FeaturedImmutable
            | Self::InvalidHourRange(_)
            | Self::SelfAction(_)
            | Self::StudentInactive(_) => ErrorKind::StateViolation,

            Self::Database(_) | Self::Config(_) | Self::Internal(_) => ErrorKind::Server,
        }
    }

    /// Returns the stable error code for this error.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::StudentNotFound(_) => "STUDENT_NOT_FOUND",
            Self::StoryNotFound(_) => "STORY_NOT_FOUND",
            Self::PostNotFound(_) => "POST_NOT_FOUND",
            Self::RequestNotFound(_) => "REQUEST_NOT_FOUND",
            Self::GroupNotFound(_) => "GROUP_NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::AlreadyFollowing => "ALREADY_FOLLOWING",
            Self::AlreadyBlocked => "ALREADY_BLOCKED",
            Self::AlreadySentRequest => "ALREADY_SENT_REQUEST",
            Self::AlreadyFeatured => "ALREADY_FEATURED",
            Self::AlreadyArchived => "ALREADY_ARCHIVED",
            Self::Blocked => "BLOCKED",
            Self::PrivateProfile => "PRIVATE_PROFILE",
            Self::NotFollowing => "NOT_FOLLOWING",
            Self::NotOwner(_) => "NOT_OWNER",
            Self::UnauthorizedTag(_) => "UNAUTHORIZED_TAG",
            Self::BlockedTag(_) => "BLOCKED_TAG",
            Self::StoryNotActive => "STORY_NOT_ACTIVE",
            Self::FeaturedImmutable => "FEATURED_IMMUTABLE",
            Self::InvalidHourRange(_) => "INVALID_HOUR_RANGE",
            Self::SelfAction(_) => "SELF_ACTION",
            Self::StudentInactive(_) => "STUDENT_INACTIVE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Server)
    }
}

// === From implementations ===

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_grouping() {
        assert_eq!(AppError::StudentNotFound("u1".into()).kind(), ErrorKind::NotFound);
        assert_eq!(AppError::AlreadyBlocked.kind(), ErrorKind::Conflict);
        assert_eq!(AppError::Blocked.kind(), ErrorKind::Authorization);
        assert_eq!(AppError::PrivateProfile.kind(), ErrorKind::Authorization);
        assert_eq!(AppError::InvalidHourRange(25).kind(), ErrorKind::StateViolation);
        assert_eq!(AppError::Database("oops".into()).kind(), ErrorKind::Server);
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(AppError::AlreadySentRequest.error_code(), "ALREADY_SENT_REQUEST");
        assert_eq!(AppError::FeaturedImmutable.error_code(), "FEATURED_IMMUTABLE");
        assert_eq!(AppError::StoryNotActive.error_code(), "STORY_NOT_ACTIVE");
    }

    #[test]
    fn test_server_errors_flagged() {
        assert!(AppError::Internal("x".into()).is_server_error());
        assert!(!AppError::Blocked.is_server_error());
    }
}
