//! Derived reports

use serde::{Deserialize, Serialize};

/// Number of reviewer edges held by one reviewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentStats {
    pub reviewer_id: String,
    pub count: i64,
}

/// Number of reviewer edges attached to one pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestAssignmentStats {
    pub pull_request_id: String,
    pub count: i64,
}

/// Outcome of deactivating part of a team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDeactivateResult {
    pub team_name: String,
    /// Users that went from active to inactive in this call
    pub deactivated_users: u64,
    /// Open pull requests whose reviewer set changed
    pub affected_prs: u64,
}

impl BulkDeactivateResult {
    /// A result for a call that changed nothing
    pub fn empty(team_name: impl Into<String>) -> Self {
        Self {
            team_name: team_name.into(),
            deactivated_users: 0,
            affected_prs: 0,
        }
    }
}
