//! Team and user roster operations
//!
//! Plain bookkeeping next to the engine. Nothing here touches reviewer
//! edges; flipping a single user's active flag leaves their assignments as
//! they are.

use std::time::Duration;

use tracing::info;

use crate::config::AssignmentSettings;
use crate::domain::{Team, User};
use crate::engine::within;
use crate::store::{Store, TeamRepository, Transaction, UserRepository};
use crate::Result;

/// Roster operations over a storage backend
pub struct RosterService<S> {
    store: S,
    timeout: Duration,
}

impl<S: Store> RosterService<S> {
    pub fn new(store: S) -> Self {
        Self::with_settings(store, &AssignmentSettings::default())
    }

    pub fn with_settings(store: S, settings: &AssignmentSettings) -> Self {
        Self {
            store,
            timeout: settings.operation_timeout,
        }
    }

    /// Create a team and upsert its members
    ///
    /// Members are stored under `name` whatever team they carried before,
    /// so an existing user moves into the new team.
    pub async fn create_team(&self, name: &str, members: &[User]) -> Result<Team> {
        within(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.create_team(name).await?;
            for member in members {
                let member = User {
                    team_name: name.to_string(),
                    ..member.clone()
                };
                tx.upsert_user(&member).await?;
            }
            let team = tx.get_team(name).await?;
            tx.commit().await?;

            info!(team = %name, members = team.members.len(), "Created team");
            Ok(team)
        })
        .await
    }

    /// Get a team with all its members
    pub async fn get_team(&self, name: &str) -> Result<Team> {
        within(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let team = tx.get_team(name).await?;
            tx.commit().await?;
            Ok(team)
        })
        .await
    }

    /// Set a user's active flag
    pub async fn set_is_active(&self, user_id: &str, is_active: bool) -> Result<User> {
        within(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let user = tx.update_is_active(user_id, is_active).await?;
            tx.commit().await?;

            info!(user = %user_id, is_active, "Updated user activity");
            Ok(user)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ReviewerEdge;
    use crate::store::{InMemoryStore, PullRequestRepository};
    use crate::{ErrorKind, PullRequest};

    fn member(id: &str, team: &str) -> User {
        User::new(id, format!("user-{}", id), team)
    }

    #[tokio::test]
    async fn test_create_and_get_team() {
        let roster = RosterService::new(InMemoryStore::new());

        let members = vec![member("u2", "ignored"), member("u1", "").with_active(false)];
        let team = roster.create_team("backend", &members).await.unwrap();
        assert_eq!(team.name, "backend");
        let ids: Vec<_> = team.members.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2"]);
        assert!(team.members.iter().all(|u| u.team_name == "backend"));
        assert!(!team.members[0].is_active);

        assert_eq!(roster.get_team("backend").await.unwrap(), team);
    }

    #[tokio::test]
    async fn test_create_duplicate_team() {
        let roster = RosterService::new(InMemoryStore::new());
        roster.create_team("t", &[]).await.unwrap();

        let err = roster.create_team("t", &[member("x", "t")]).await.unwrap_err();
        assert_eq!(err.code(), "TEAM_EXISTS");

        // the failed call must not have added x
        assert!(roster.get_team("t").await.unwrap().members.is_empty());
    }

    #[tokio::test]
    async fn test_member_moves_between_teams() {
        let roster = RosterService::new(InMemoryStore::new());
        roster.create_team("a", &[member("u1", "a")]).await.unwrap();
        roster.create_team("b", &[member("u1", "a")]).await.unwrap();

        assert!(roster.get_team("a").await.unwrap().members.is_empty());
        assert_eq!(roster.get_team("b").await.unwrap().members.len(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown_team() {
        let roster = RosterService::new(InMemoryStore::new());
        let err = roster.get_team("missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_set_is_active_keeps_assignments() {
        let store = InMemoryStore::new();
        let roster = RosterService::new(store.clone());
        roster
            .create_team("t", &[member("a", "t"), member("b", "t")])
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.create_pull_request(&PullRequest::new("pr", "PR", "a"))
            .await
            .unwrap();
        tx.add_reviewer(&ReviewerEdge::new("pr", "b")).await.unwrap();
        tx.commit().await.unwrap();

        let user = roster.set_is_active("b", false).await.unwrap();
        assert!(!user.is_active);

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.get_reviewers("pr").await.unwrap(), vec!["b"]);
        drop(tx);

        let err = roster.set_is_active("ghost", true).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
