//! Team management commands

use clap::{Args, Subcommand};
use revassign_core::User;
use serde::Serialize;

use super::output::{print_json, TeamDto};
use super::Services;

/// A member given on the command line as `ID:USERNAME[:inactive]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSpec {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}

impl MemberSpec {
    fn into_user(self, team_name: &str) -> User {
        User::new(self.user_id, self.username, team_name).with_active(self.is_active)
    }
}

fn parse_member(s: &str) -> Result<MemberSpec, String> {
    let mut parts = s.splitn(3, ':');
    let user_id = parts.next().unwrap_or_default();
    let username = parts.next().unwrap_or_default();
    if user_id.is_empty() || username.is_empty() {
        return Err(format!("expected ID:USERNAME[:inactive], got '{}'", s));
    }

    let is_active = match parts.next() {
        None | Some("active") => true,
        Some("inactive") => false,
        Some(other) => return Err(format!("unknown member state '{}'", other)),
    };

    Ok(MemberSpec {
        user_id: user_id.to_string(),
        username: username.to_string(),
        is_active,
    })
}

/// Team management commands
#[derive(Args, Debug)]
pub struct TeamArgs {
    #[command(subcommand)]
    pub command: TeamCommand,
}

#[derive(Subcommand, Debug)]
pub enum TeamCommand {
    /// Create a team with its members
    Add {
        /// Team name
        name: String,

        /// Member as ID:USERNAME, or ID:USERNAME:inactive
        #[arg(short, long = "member", value_parser = parse_member)]
        members: Vec<MemberSpec>,
    },

    /// Show a team and its members
    Get {
        /// Team name
        name: String,
    },

    /// Deactivate members and repair the pull requests they review
    Deactivate {
        /// Team name
        name: String,

        /// Ids of the members to deactivate
        #[arg(required = true)]
        user_ids: Vec<String>,
    },
}

#[derive(Serialize)]
struct TeamResponse {
    team: TeamDto,
}

impl TeamArgs {
    /// Execute the team command
    pub async fn execute(&self, services: &Services) -> anyhow::Result<()> {
        match &self.command {
            TeamCommand::Add { name, members } => {
                let users: Vec<User> = members
                    .iter()
                    .cloned()
                    .map(|m| m.into_user(name))
                    .collect();
                let team = services.roster.create_team(name, &users).await?;
                print_json(&TeamResponse { team: team.into() })
            }
            TeamCommand::Get { name } => {
                let team = services.roster.get_team(name).await?;
                print_json(&TeamDto::from(team))
            }
            TeamCommand::Deactivate { name, user_ids } => {
                let result = services.engine.bulk_deactivate_team(name, user_ids).await?;
                print_json(&result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_member() {
        assert_eq!(
            parse_member("u1:alice").unwrap(),
            MemberSpec {
                user_id: "u1".into(),
                username: "alice".into(),
                is_active: true,
            }
        );
        assert!(!parse_member("u2:bob:inactive").unwrap().is_active);
        assert!(parse_member("u3").is_err());
        assert!(parse_member(":bob").is_err());
        assert!(parse_member("u4:dan:sleeping").is_err());
    }
}
