//! Row types and their mapping onto the domain model

use chrono::{DateTime, Utc};
use revassign_core::{PullRequest, PullRequestStatus, User};

use crate::error::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub user_id: String,
    pub username: String,
    pub team_name: String,
    pub is_active: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.user_id,
            username: row.username,
            team_name: row.team_name,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct PullRequestRow {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
}

impl TryFrom<PullRequestRow> for PullRequest {
    type Error = DbError;

    /// Reviewers are left empty; they live in their own table
    fn try_from(row: PullRequestRow) -> Result<Self, DbError> {
        let status = PullRequestStatus::parse(&row.status).ok_or_else(|| {
            DbError::InvalidData(format!(
                "pull request {} has status '{}'",
                row.pull_request_id, row.status
            ))
        })?;

        Ok(PullRequest {
            id: row.pull_request_id,
            name: row.pull_request_name,
            author_id: row.author_id,
            status,
            assigned_reviewers: Vec::new(),
            created_at: row.created_at,
            merged_at: row.merged_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct CountRow {
    pub id: String,
    pub cnt: i64,
}
