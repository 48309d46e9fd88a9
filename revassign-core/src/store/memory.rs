//! In-memory implementation of the storage traits.
//!
//! All state lives in one `Mutex`. A transaction holds the lock from `begin`
//! until it is committed or dropped and works on a private copy, so dropping
//! it discards every write. All state is lost on restart.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{PullRequestRepository, Store, TeamRepository, Transaction, UserRepository};
use crate::domain::{
    AssignmentStats, PullRequest, PullRequestAssignmentStats, PullRequestStatus, ReviewerEdge,
    Team, User,
};
use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    teams: BTreeSet<String>,
    /// Keyed by user id, which gives id-ordered rosters
    users: BTreeMap<String, User>,
    pull_requests: BTreeMap<String, PullRequest>,
    reviewers: BTreeSet<ReviewerEdge>,
}

impl MemoryState {
    fn pull_request(&self, id: &str) -> Result<PullRequest> {
        self.pull_requests
            .get(id)
            .cloned()
            .ok_or_else(|| Error::pull_request_not_found(id))
    }

    /// Newest first, ties broken by id
    fn sorted(mut prs: Vec<PullRequest>) -> Vec<PullRequest> {
        prs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        prs
    }
}

/// In-memory store
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTransaction { guard, working })
    }
}

/// Transaction over [`InMemoryStore`]
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn commit(self) -> Result<()> {
        let mut guard = self.guard;
        *guard = self.working;
        Ok(())
    }
}

#[async_trait]
impl TeamRepository for InMemoryTransaction {
    async fn create_team(&mut self, name: &str) -> Result<()> {
        if !self.working.teams.insert(name.to_string()) {
            return Err(Error::TeamExists(name.to_string()));
        }
        Ok(())
    }

    async fn team_exists(&mut self, name: &str) -> Result<bool> {
        Ok(self.working.teams.contains(name))
    }

    async fn get_team(&mut self, name: &str) -> Result<Team> {
        if !self.working.teams.contains(name) {
            return Err(Error::team_not_found(name));
        }
        let members = self.list_users_by_team(name).await?;
        Ok(Team::new(name, members))
    }
}

#[async_trait]
impl UserRepository for InMemoryTransaction {
    async fn upsert_user(&mut self, user: &User) -> Result<()> {
        self.working.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&mut self, id: &str) -> Result<User> {
        self.working
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| Error::user_not_found(id))
    }

    async fn list_users_by_team(&mut self, team_name: &str) -> Result<Vec<User>> {
        Ok(self
            .working
            .users
            .values()
            .filter(|u| u.team_name == team_name)
            .cloned()
            .collect())
    }

    async fn update_is_active(&mut self, id: &str, is_active: bool) -> Result<User> {
        let user = self
            .working
            .users
            .get_mut(id)
            .ok_or_else(|| Error::user_not_found(id))?;
        user.is_active = is_active;
        Ok(user.clone())
    }

    async fn bulk_deactivate_in_team(
        &mut self,
        team_name: &str,
        user_ids: &[String],
    ) -> Result<u64> {
        let mut changed = 0;
        for id in user_ids {
            if let Some(user) = self.working.users.get_mut(id) {
                if user.team_name == team_name && user.is_active {
                    user.is_active = false;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl PullRequestRepository for InMemoryTransaction {
    async fn pull_request_exists(&mut self, id: &str) -> Result<bool> {
        Ok(self.working.pull_requests.contains_key(id))
    }

    async fn create_pull_request(&mut self, pr: &PullRequest) -> Result<()> {
        if self.working.pull_requests.contains_key(&pr.id) {
            return Err(Error::PullRequestExists(pr.id.clone()));
        }
        let mut row = pr.clone();
        row.assigned_reviewers.clear();
        self.working.pull_requests.insert(row.id.clone(), row);
        Ok(())
    }

    async fn get_pull_request(&mut self, id: &str) -> Result<PullRequest> {
        self.working.pull_request(id)
    }

    async fn get_for_update(&mut self, id: &str) -> Result<PullRequest> {
        // The whole store is already locked for this transaction
        self.working.pull_request(id)
    }

    async fn mark_merged(&mut self, id: &str) -> Result<()> {
        let pr = self
            .working
            .pull_requests
            .get_mut(id)
            .ok_or_else(|| Error::pull_request_not_found(id))?;
        pr.status = PullRequestStatus::Merged;
        pr.merged_at.get_or_insert_with(Utc::now);
        Ok(())
    }

    async fn list_by_reviewer(&mut self, reviewer_id: &str) -> Result<Vec<PullRequest>> {
        let prs = self
            .working
            .reviewers
            .iter()
            .filter(|e| e.reviewer_id == reviewer_id)
            .filter_map(|e| self.working.pull_requests.get(&e.pull_request_id).cloned())
            .collect();
        Ok(MemoryState::sorted(prs))
    }

    async fn get_reviewers(&mut self, pull_request_id: &str) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .working
            .reviewers
            .iter()
            .filter(|e| e.pull_request_id == pull_request_id)
            .map(|e| e.reviewer_id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn add_reviewer(&mut self, edge: &ReviewerEdge) -> Result<()> {
        if !self.working.pull_requests.contains_key(&edge.pull_request_id) {
            return Err(Error::pull_request_not_found(&edge.pull_request_id));
        }
        if !self.working.users.contains_key(&edge.reviewer_id) {
            return Err(Error::user_not_found(&edge.reviewer_id));
        }
        self.working.reviewers.insert(edge.clone());
        Ok(())
    }

    async fn remove_reviewer(&mut self, edge: &ReviewerEdge) -> Result<()> {
        self.working.reviewers.remove(edge);
        Ok(())
    }

    async fn list_open_by_any_reviewer(
        &mut self,
        reviewer_ids: &[String],
    ) -> Result<Vec<PullRequest>> {
        if reviewer_ids.is_empty() {
            return Ok(Vec::new());
        }

        let pr_ids: BTreeSet<&String> = self
            .working
            .reviewers
            .iter()
            .filter(|e| reviewer_ids.contains(&e.reviewer_id))
            .map(|e| &e.pull_request_id)
            .collect();

        let prs = pr_ids
            .into_iter()
            .filter_map(|id| self.working.pull_requests.get(id))
            .filter(|pr| !pr.is_merged())
            .cloned()
            .collect();
        Ok(MemoryState::sorted(prs))
    }

    async fn assignment_stats_by_reviewer(&mut self) -> Result<Vec<AssignmentStats>> {
        let mut counts: HashMap<&str, i64> = HashMap::new();
        for edge in &self.working.reviewers {
            *counts.entry(edge.reviewer_id.as_str()).or_default() += 1;
        }

        let mut stats: Vec<AssignmentStats> = counts
            .into_iter()
            .map(|(id, count)| AssignmentStats {
                reviewer_id: id.to_string(),
                count,
            })
            .collect();
        stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reviewer_id.cmp(&b.reviewer_id)));
        Ok(stats)
    }

    async fn assignment_stats_by_pull_request(
        &mut self,
    ) -> Result<Vec<PullRequestAssignmentStats>> {
        let mut counts: HashMap<&str, i64> = HashMap::new();
        for edge in &self.working.reviewers {
            *counts.entry(edge.pull_request_id.as_str()).or_default() += 1;
        }

        let mut stats: Vec<PullRequestAssignmentStats> = counts
            .into_iter()
            .map(|(id, count)| PullRequestAssignmentStats {
                pull_request_id: id.to_string(),
                count,
            })
            .collect();
        stats.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.pull_request_id.cmp(&b.pull_request_id))
        });
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.create_team("backend").await.unwrap();
        for id in ["u1", "u2", "u3"] {
            tx.upsert_user(&User::new(id, id, "backend")).await.unwrap();
        }
        tx.create_pull_request(&PullRequest::new("pr-1", "First", "u1"))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = seeded().await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.add_reviewer(&ReviewerEdge::new("pr-1", "u2")).await.unwrap();
            tx.update_is_active("u3", false).await.unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.get_reviewers("pr-1").await.unwrap().is_empty());
        assert!(tx.get_user("u3").await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_reviewer_edges_are_unique() {
        let store = seeded().await;
        let mut tx = store.begin().await.unwrap();

        let edge = ReviewerEdge::new("pr-1", "u2");
        tx.add_reviewer(&edge).await.unwrap();
        tx.add_reviewer(&edge).await.unwrap();
        assert_eq!(tx.get_reviewers("pr-1").await.unwrap(), vec!["u2"]);

        tx.remove_reviewer(&edge).await.unwrap();
        tx.remove_reviewer(&edge).await.unwrap();
        assert!(tx.get_reviewers("pr-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_merged_keeps_first_timestamp() {
        let store = seeded().await;
        let mut tx = store.begin().await.unwrap();

        tx.mark_merged("pr-1").await.unwrap();
        let first = tx.get_pull_request("pr-1").await.unwrap();
        tx.mark_merged("pr-1").await.unwrap();
        let second = tx.get_pull_request("pr-1").await.unwrap();

        assert_eq!(first.status, PullRequestStatus::Merged);
        assert!(first.merged_at.is_some());
        assert_eq!(first.merged_at, second.merged_at);

        let err = tx.mark_merged("missing").await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_bulk_deactivate_counts_only_transitions() {
        let store = seeded().await;
        let mut tx = store.begin().await.unwrap();
        tx.upsert_user(&User::new("x1", "x1", "frontend")).await.unwrap();

        let ids = vec!["u2".to_string(), "x1".to_string(), "ghost".to_string()];
        assert_eq!(tx.bulk_deactivate_in_team("backend", &ids).await.unwrap(), 1);
        assert_eq!(tx.bulk_deactivate_in_team("backend", &ids).await.unwrap(), 0);
        assert!(tx.get_user("x1").await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_list_open_by_any_reviewer_skips_merged() {
        let store = seeded().await;
        let mut tx = store.begin().await.unwrap();
        tx.create_pull_request(&PullRequest::new("pr-2", "Second", "u1"))
            .await
            .unwrap();
        tx.add_reviewer(&ReviewerEdge::new("pr-1", "u2")).await.unwrap();
        tx.add_reviewer(&ReviewerEdge::new("pr-2", "u2")).await.unwrap();
        tx.add_reviewer(&ReviewerEdge::new("pr-2", "u3")).await.unwrap();
        tx.mark_merged("pr-1").await.unwrap();

        let open = tx
            .list_open_by_any_reviewer(&["u2".to_string(), "u3".to_string()])
            .await
            .unwrap();
        let ids: Vec<_> = open.iter().map(|pr| pr.id.as_str()).collect();
        assert_eq!(ids, vec!["pr-2"]);

        assert!(tx.list_open_by_any_reviewer(&[]).await.unwrap().is_empty());
        assert_eq!(tx.list_by_reviewer("u2").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stats_ordering() {
        let store = seeded().await;
        let mut tx = store.begin().await.unwrap();
        tx.create_pull_request(&PullRequest::new("pr-2", "Second", "u1"))
            .await
            .unwrap();
        tx.add_reviewer(&ReviewerEdge::new("pr-1", "u3")).await.unwrap();
        tx.add_reviewer(&ReviewerEdge::new("pr-2", "u3")).await.unwrap();
        tx.add_reviewer(&ReviewerEdge::new("pr-2", "u2")).await.unwrap();

        let by_reviewer = tx.assignment_stats_by_reviewer().await.unwrap();
        assert_eq!(
            by_reviewer,
            vec![
                AssignmentStats {
                    reviewer_id: "u3".into(),
                    count: 2
                },
                AssignmentStats {
                    reviewer_id: "u2".into(),
                    count: 1
                },
            ]
        );

        let by_pr = tx.assignment_stats_by_pull_request().await.unwrap();
        assert_eq!(by_pr[0].pull_request_id, "pr-2");
        assert_eq!(by_pr[0].count, 2);
        assert_eq!(by_pr[1].pull_request_id, "pr-1");
    }

    #[tokio::test]
    async fn test_get_team_not_found() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let err = tx.get_team("nobody").await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }
}
