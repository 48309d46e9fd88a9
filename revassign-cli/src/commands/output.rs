//! JSON shapes printed by the commands

use chrono::{DateTime, Utc};
use revassign_core::{
    AssignmentStats, PullRequest, PullRequestAssignmentStats, Team, User,
};
use serde::Serialize;

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct TeamMemberDto {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct TeamDto {
    pub team_name: String,
    pub members: Vec<TeamMemberDto>,
}

impl From<Team> for TeamDto {
    fn from(team: Team) -> Self {
        Self {
            team_name: team.name,
            members: team
                .members
                .into_iter()
                .map(|u| TeamMemberDto {
                    user_id: u.id,
                    username: u.username,
                    is_active: u.is_active,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub user_id: String,
    pub username: String,
    pub team_name: String,
    pub is_active: bool,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            team_name: user.team_name,
            is_active: user.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PullRequestDto {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: String,
    pub assigned_reviewers: Vec<String>,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "mergedAt", skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<DateTime<Utc>>,
}

impl From<PullRequest> for PullRequestDto {
    fn from(pr: PullRequest) -> Self {
        Self {
            pull_request_id: pr.id,
            pull_request_name: pr.name,
            author_id: pr.author_id,
            status: pr.status.to_string(),
            assigned_reviewers: pr.assigned_reviewers,
            created_at: Some(pr.created_at),
            merged_at: pr.merged_at,
        }
    }
}

/// Listing entry without reviewers
#[derive(Debug, Serialize)]
pub struct PullRequestShortDto {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: String,
}

impl From<PullRequest> for PullRequestShortDto {
    fn from(pr: PullRequest) -> Self {
        Self {
            pull_request_id: pr.id,
            pull_request_name: pr.name,
            author_id: pr.author_id,
            status: pr.status.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewerStatsDto {
    pub user_id: String,
    pub assignments: i64,
}

impl From<AssignmentStats> for ReviewerStatsDto {
    fn from(s: AssignmentStats) -> Self {
        Self {
            user_id: s.reviewer_id,
            assignments: s.count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PullRequestStatsDto {
    pub pull_request_id: String,
    pub assignments: i64,
}

impl From<PullRequestAssignmentStats> for PullRequestStatsDto {
    fn from(s: PullRequestAssignmentStats) -> Self {
        Self {
            pull_request_id: s.pull_request_id,
            assignments: s.count,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

/// Render an engine error the way clients expect it
pub fn error_json(err: &revassign_core::Error) -> String {
    let envelope = ErrorEnvelope {
        error: ErrorBody {
            code: err.code(),
            message: err.to_string(),
        },
    };
    serde_json::to_string_pretty(&envelope)
        .unwrap_or_else(|_| format!(r#"{{"error":{{"code":"{}"}}}}"#, err.code()))
}
