//! Pull request commands

use clap::{Args, Subcommand};
use serde::Serialize;

use super::output::{print_json, PullRequestDto};
use super::Services;

/// Pull request commands
#[derive(Args, Debug)]
pub struct PrArgs {
    #[command(subcommand)]
    pub command: PrCommand,
}

#[derive(Subcommand, Debug)]
pub enum PrCommand {
    /// Create a pull request and pick its reviewers
    Create {
        /// Pull request id
        id: String,

        /// Pull request title
        name: String,

        /// Author user id
        author: String,
    },

    /// Mark a pull request as merged
    Merge {
        /// Pull request id
        id: String,
    },

    /// Replace one reviewer with another member of their team
    Reassign {
        /// Pull request id
        id: String,

        /// Reviewer to replace
        old_reviewer: String,
    },
}

#[derive(Serialize)]
struct PullRequestResponse {
    pr: PullRequestDto,
}

#[derive(Serialize)]
struct ReassignResponse {
    pr: PullRequestDto,
    replaced_by: String,
}

impl PrArgs {
    /// Execute the pull request command
    pub async fn execute(&self, services: &Services) -> anyhow::Result<()> {
        match &self.command {
            PrCommand::Create { id, name, author } => {
                let pr = services.engine.create_pull_request(id, name, author).await?;
                print_json(&PullRequestResponse { pr: pr.into() })
            }
            PrCommand::Merge { id } => {
                let pr = services.engine.merge_pull_request(id).await?;
                print_json(&PullRequestResponse { pr: pr.into() })
            }
            PrCommand::Reassign { id, old_reviewer } => {
                let result = services.engine.reassign_reviewer(id, old_reviewer).await?;
                print_json(&ReassignResponse {
                    pr: result.pull_request.into(),
                    replaced_by: result.replaced_by,
                })
            }
        }
    }
}
