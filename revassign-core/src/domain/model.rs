//! Teams, users and pull requests

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A team member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub team_name: String,
    pub is_active: bool,
}

impl User {
    /// Create an active user
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        team_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            team_name: team_name.into(),
            is_active: true,
        }
    }

    /// Set the active flag
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }
}

/// A named team and its roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    /// Members in storage order
    pub members: Vec<User>,
}

impl Team {
    pub fn new(name: impl Into<String>, members: Vec<User>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }

    /// Members with the active flag set, in roster order
    pub fn active_members(&self) -> Vec<&User> {
        self.members.iter().filter(|u| u.is_active).collect()
    }

    /// Active members whose id is not in `excluded`, in roster order
    pub fn active_members_except(&self, excluded: &[&str]) -> Vec<&User> {
        if excluded.is_empty() {
            return self.active_members();
        }

        let excluded: HashSet<&str> = excluded.iter().copied().collect();
        self.members
            .iter()
            .filter(|u| u.is_active && !excluded.contains(u.id.as_str()))
            .collect()
    }
}

/// Pull request lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PullRequestStatus {
    Open,
    Merged,
}

impl PullRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PullRequestStatus::Open => "OPEN",
            PullRequestStatus::Merged => "MERGED",
        }
    }

    /// Parse the stored representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(PullRequestStatus::Open),
            "MERGED" => Some(PullRequestStatus::Merged),
            _ => None,
        }
    }
}

impl std::fmt::Display for PullRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pull request and its assigned reviewers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: String,
    pub name: String,
    pub author_id: String,
    pub status: PullRequestStatus,
    /// Reviewer ids; filled from the reviewer relation when loaded
    pub assigned_reviewers: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    /// Create an open pull request with no reviewers
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        author_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            author_id: author_id.into(),
            status: PullRequestStatus::Open,
            assigned_reviewers: Vec::new(),
            created_at: Utc::now(),
            merged_at: None,
        }
    }

    pub fn is_merged(&self) -> bool {
        self.status == PullRequestStatus::Merged
    }

    /// Reviewer changes are only allowed while the pull request is open
    pub fn can_be_reassigned(&self) -> Result<()> {
        if self.is_merged() {
            return Err(Error::PullRequestMerged(self.id.clone()));
        }
        Ok(())
    }

    pub fn has_reviewer(&self, user_id: &str) -> bool {
        self.assigned_reviewers.iter().any(|r| r == user_id)
    }
}

/// One (pull request, reviewer) pair of the reviewer relation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReviewerEdge {
    pub pull_request_id: String,
    pub reviewer_id: String,
}

impl ReviewerEdge {
    pub fn new(pull_request_id: impl Into<String>, reviewer_id: impl Into<String>) -> Self {
        Self {
            pull_request_id: pull_request_id.into(),
            reviewer_id: reviewer_id.into(),
        }
    }
}
