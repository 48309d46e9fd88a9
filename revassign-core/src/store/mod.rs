//! Storage collaborator contracts
//!
//! The engine never talks to a database directly. It opens a unit of work
//! with [`Store::begin`], reads and writes through the repository traits the
//! transaction implements, and calls [`Transaction::commit`]. Dropping a
//! transaction without committing must roll it back.
//!
//! Implementations provide the isolation the engine relies on:
//! [`PullRequestRepository::get_for_update`] has to hold the pull request's
//! write lock until the transaction ends, so that two reassignments of the
//! same pull request cannot both act on the same reviewer set.

mod memory;

pub use memory::{InMemoryStore, InMemoryTransaction};

use async_trait::async_trait;

use crate::domain::{
    AssignmentStats, PullRequest, PullRequestAssignmentStats, ReviewerEdge, Team, User,
};
use crate::Result;

/// Team storage
#[async_trait]
pub trait TeamRepository: Send {
    async fn create_team(&mut self, name: &str) -> Result<()>;

    async fn team_exists(&mut self, name: &str) -> Result<bool>;

    /// Team with every member ordered by user id, or `NotFound`
    async fn get_team(&mut self, name: &str) -> Result<Team>;
}

/// User storage
#[async_trait]
pub trait UserRepository: Send {
    /// Insert, or overwrite name, team and active flag of an existing user
    async fn upsert_user(&mut self, user: &User) -> Result<()>;

    async fn get_user(&mut self, id: &str) -> Result<User>;

    /// Members of a team ordered by user id
    async fn list_users_by_team(&mut self, team_name: &str) -> Result<Vec<User>>;

    async fn update_is_active(&mut self, id: &str, is_active: bool) -> Result<User>;

    /// Deactivate the listed members of a team
    ///
    /// Returns how many users actually went from active to inactive. Ids that
    /// are unknown, already inactive or in another team are ignored.
    async fn bulk_deactivate_in_team(&mut self, team_name: &str, user_ids: &[String])
        -> Result<u64>;
}

/// Pull request and reviewer relation storage
///
/// Pull requests come back with `assigned_reviewers` empty; the reviewer
/// relation is read separately with [`get_reviewers`](Self::get_reviewers).
#[async_trait]
pub trait PullRequestRepository: Send {
    async fn pull_request_exists(&mut self, id: &str) -> Result<bool>;

    async fn create_pull_request(&mut self, pr: &PullRequest) -> Result<()>;

    async fn get_pull_request(&mut self, id: &str) -> Result<PullRequest>;

    /// Like `get_pull_request`, and lock the row until the transaction ends
    async fn get_for_update(&mut self, id: &str) -> Result<PullRequest>;

    /// Set status to MERGED, stamping `merged_at` only if it is unset
    async fn mark_merged(&mut self, id: &str) -> Result<()>;

    /// Every pull request the user reviews, newest first
    async fn list_by_reviewer(&mut self, reviewer_id: &str) -> Result<Vec<PullRequest>>;

    /// Reviewer ids of a pull request, ordered by id
    async fn get_reviewers(&mut self, pull_request_id: &str) -> Result<Vec<String>>;

    /// Add an edge, no-op if it already exists
    async fn add_reviewer(&mut self, edge: &ReviewerEdge) -> Result<()>;

    /// Remove an edge, no-op if it is absent
    async fn remove_reviewer(&mut self, edge: &ReviewerEdge) -> Result<()>;

    /// Open pull requests reviewed by at least one of `reviewer_ids`, newest first
    async fn list_open_by_any_reviewer(&mut self, reviewer_ids: &[String])
        -> Result<Vec<PullRequest>>;

    /// Edge counts per reviewer, by count descending then id
    async fn assignment_stats_by_reviewer(&mut self) -> Result<Vec<AssignmentStats>>;

    /// Edge counts per pull request, by count descending then id
    async fn assignment_stats_by_pull_request(&mut self)
        -> Result<Vec<PullRequestAssignmentStats>>;
}

/// One unit of work against the store
#[async_trait]
pub trait Transaction:
    TeamRepository + UserRepository + PullRequestRepository + Send + Sized
{
    async fn commit(self) -> Result<()>;
}

/// Entry point of a storage backend
#[async_trait]
pub trait Store: Send + Sync {
    type Tx: Transaction;

    async fn begin(&self) -> Result<Self::Tx>;
}
