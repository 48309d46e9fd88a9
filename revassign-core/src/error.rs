//! Error types for reviewer assignment

use std::time::Duration;

use thiserror::Error;

/// Result type alias for assignment operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for assignment operations
#[derive(Error, Debug)]
pub enum Error {
    /// A team with this name already exists
    #[error("team {0} already exists")]
    TeamExists(String),

    /// A pull request with this id already exists
    #[error("pull request {0} already exists")]
    PullRequestExists(String),

    /// Unknown team, user or pull request
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: String },

    /// Reviewer changes were attempted on a merged pull request
    #[error("pull request {0} is already merged")]
    PullRequestMerged(String),

    /// The reviewer to replace is not assigned to the pull request
    #[error("{reviewer_id} is not a reviewer of pull request {pull_request_id}")]
    NotAssigned {
        pull_request_id: String,
        reviewer_id: String,
    },

    /// Nobody is left in the candidate pool
    #[error("no active replacement candidate for pull request {pull_request_id}")]
    NoCandidate { pull_request_id: String },

    /// Underlying storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// The operation deadline expired before it finished
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The kind of entity a lookup failed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Team,
    User,
    PullRequest,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Team => write!(f, "team"),
            Entity::User => write!(f, "user"),
            Entity::PullRequest => write!(f, "pull request"),
        }
    }
}

/// Coarse classification of [`Error`]
///
/// Everything except `Infrastructure` is an expected outcome the caller can
/// act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AlreadyExists,
    NotFound,
    AlreadyMerged,
    NotAssigned,
    NoCandidate,
    Infrastructure,
}

impl ErrorKind {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::AlreadyExists => "ALREADY_EXISTS",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::AlreadyMerged => "PR_MERGED",
            ErrorKind::NotAssigned => "NOT_ASSIGNED",
            ErrorKind::NoCandidate => "NO_CANDIDATE",
            ErrorKind::Infrastructure => "INTERNAL",
        }
    }
}

impl Error {
    /// Wrap a storage backend error
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Error::Storage(err.to_string())
    }

    pub fn team_not_found(name: impl Into<String>) -> Self {
        Error::NotFound {
            entity: Entity::Team,
            id: name.into(),
        }
    }

    pub fn user_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            entity: Entity::User,
            id: id.into(),
        }
    }

    pub fn pull_request_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            entity: Entity::PullRequest,
            id: id.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TeamExists(_) | Error::PullRequestExists(_) => ErrorKind::AlreadyExists,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::PullRequestMerged(_) => ErrorKind::AlreadyMerged,
            Error::NotAssigned { .. } => ErrorKind::NotAssigned,
            Error::NoCandidate { .. } => ErrorKind::NoCandidate,
            Error::Storage(_) | Error::Timeout(_) | Error::Config(_) | Error::Io(_) => {
                ErrorKind::Infrastructure
            }
        }
    }

    /// Stable code, finer-grained than [`ErrorKind::code`] for id collisions
    pub fn code(&self) -> &'static str {
        match self {
            Error::TeamExists(_) => "TEAM_EXISTS",
            Error::PullRequestExists(_) => "PR_EXISTS",
            other => other.kind().code(),
        }
    }

    /// True for expected outcomes that are returned to the caller untranslated
    pub fn is_domain(&self) -> bool {
        self.kind() != ErrorKind::Infrastructure
    }
}
