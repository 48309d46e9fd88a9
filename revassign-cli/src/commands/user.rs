//! User commands

use clap::{Args, Subcommand};
use serde::Serialize;

use super::output::{print_json, PullRequestShortDto, UserDto};
use super::Services;

/// User commands
#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Set whether a user can be picked as reviewer
    ///
    /// Existing assignments are kept.
    SetActive {
        /// User id
        user_id: String,

        /// true or false
        #[arg(action = clap::ArgAction::Set)]
        active: bool,
    },

    /// List the pull requests a user reviews
    Reviews {
        /// User id
        user_id: String,
    },
}

#[derive(Serialize)]
struct UserResponse {
    user: UserDto,
}

#[derive(Serialize)]
struct UserReviews {
    user_id: String,
    pull_requests: Vec<PullRequestShortDto>,
}

impl UserArgs {
    /// Execute the user command
    pub async fn execute(&self, services: &Services) -> anyhow::Result<()> {
        match &self.command {
            UserCommand::SetActive { user_id, active } => {
                let user = services.roster.set_is_active(user_id, *active).await?;
                print_json(&UserResponse { user: user.into() })
            }
            UserCommand::Reviews { user_id } => {
                let prs = services.engine.get_review_prs(user_id).await?;
                print_json(&UserReviews {
                    user_id: user_id.clone(),
                    pull_requests: prs.into_iter().map(Into::into).collect(),
                })
            }
        }
    }
}
