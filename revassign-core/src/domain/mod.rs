//! Domain model
//!
//! Plain value types for teams, users and pull requests, plus the pure
//! predicates the assignment engine builds on. Nothing in here does I/O.

pub mod model;
pub mod stats;

pub use model::{PullRequest, PullRequestStatus, ReviewerEdge, Team, User};
pub use stats::{AssignmentStats, BulkDeactivateResult, PullRequestAssignmentStats};
