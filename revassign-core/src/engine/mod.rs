//! Reviewer assignment engine
//!
//! Orchestrates the candidate selector and the storage collaborator:
//! - initial reviewer pick when a pull request is created
//! - single reviewer swap on request
//! - cascading repair of open pull requests when team members are
//!   deactivated in bulk
//!
//! The engine keeps no state of its own besides the random source. Every
//! operation except the bulk cascade runs in exactly one store transaction.

mod bulk;
mod pull_requests;

pub use pull_requests::ReassignResult;

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::AssignmentSettings;
use crate::domain::{AssignmentStats, PullRequest, PullRequestAssignmentStats};
use crate::store::{PullRequestRepository, Store, Transaction, UserRepository};
use crate::{Error, Result};

/// Most reviewers a newly created pull request gets
pub const MAX_INITIAL_REVIEWERS: usize = 2;

/// Run `fut`, failing with [`Error::Timeout`] once `limit` has passed
///
/// On expiry the future is dropped, which rolls back its open transaction.
pub(crate) async fn within<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::Timeout(limit))?
}

/// The assignment engine over a storage backend
pub struct AssignmentEngine<S> {
    store: S,
    rng: Mutex<StdRng>,
    timeout: Duration,
}

impl<S: Store> AssignmentEngine<S> {
    /// Create an engine with an entropy-seeded generator and default deadline
    pub fn new(store: S) -> Self {
        Self::with_settings(store, &AssignmentSettings::default())
    }

    /// Create an engine from configuration
    pub fn with_settings(store: S, settings: &AssignmentSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            store,
            rng: Mutex::new(rng),
            timeout: settings.operation_timeout,
        }
    }

    /// Replace the random source
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    /// Set the per-operation deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    fn with_rng_mut<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    /// Pull requests the user is assigned to review, newest first
    ///
    /// Reviewer lists are not loaded.
    pub async fn get_review_prs(&self, user_id: &str) -> Result<Vec<PullRequest>> {
        within(self.timeout, async {
            let mut tx = self.store.begin().await?;
            tx.get_user(user_id).await?;
            let prs = tx.list_by_reviewer(user_id).await?;
            tx.commit().await?;
            Ok(prs)
        })
        .await
    }

    /// Reviewer edge counts per reviewer
    pub async fn assignment_stats_by_reviewer(&self) -> Result<Vec<AssignmentStats>> {
        within(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let stats = tx.assignment_stats_by_reviewer().await?;
            tx.commit().await?;
            Ok(stats)
        })
        .await
    }

    /// Reviewer edge counts per pull request
    pub async fn assignment_stats_by_pull_request(&self) -> Result<Vec<PullRequestAssignmentStats>> {
        within(self.timeout, async {
            let mut tx = self.store.begin().await?;
            let stats = tx.assignment_stats_by_pull_request().await?;
            tx.commit().await?;
            Ok(stats)
        })
        .await
    }
}

/// Fixtures shared by the engine tests
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::domain::User;
    use crate::store::{InMemoryStore, TeamRepository};

    /// Store with one team; members are `(id, active)`
    pub async fn store_with_team(team: &str, members: &[(&str, bool)]) -> InMemoryStore {
        let store = InMemoryStore::new();
        add_team(&store, team, members).await;
        store
    }

    pub async fn add_team(store: &InMemoryStore, team: &str, members: &[(&str, bool)]) {
        let mut tx = store.begin().await.unwrap();
        tx.create_team(team).await.unwrap();
        for (id, active) in members {
            tx.upsert_user(&User::new(*id, format!("name-{}", id), team).with_active(*active))
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();
    }

    pub fn engine(store: InMemoryStore, seed: u64) -> AssignmentEngine<InMemoryStore> {
        AssignmentEngine::new(store).with_rng(StdRng::seed_from_u64(seed))
    }

    pub async fn reviewers(store: &InMemoryStore, pr_id: &str) -> Vec<String> {
        let mut tx = store.begin().await.unwrap();
        tx.get_reviewers(pr_id).await.unwrap()
    }

    /// Put an open pull request with a fixed reviewer set straight into the store
    pub async fn seed_pull_request(
        store: &InMemoryStore,
        id: &str,
        author: &str,
        reviewers: &[&str],
    ) {
        let mut tx = store.begin().await.unwrap();
        tx.create_pull_request(&PullRequest::new(id, format!("PR {}", id), author))
            .await
            .unwrap();
        for r in reviewers {
            tx.add_reviewer(&crate::domain::ReviewerEdge::new(id, *r))
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use crate::ErrorKind;

    #[tokio::test]
    async fn test_get_review_prs() {
        let store = store_with_team("t", &[("a", true), ("b", true), ("c", true)]).await;
        seed_pull_request(&store, "pr-1", "a", &["b"]).await;
        seed_pull_request(&store, "pr-2", "c", &["b", "a"]).await;
        let engine = engine(store, 1);

        let prs = engine.get_review_prs("b").await.unwrap();
        let mut ids: Vec<_> = prs.iter().map(|p| p.id.clone()).collect();
        ids.sort();
        assert_eq!(ids, vec!["pr-1", "pr-2"]);

        assert!(engine.get_review_prs("c").await.unwrap().is_empty());

        let err = engine.get_review_prs("ghost").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_stats_reflect_relation() {
        let store = store_with_team("t", &[("a", true), ("b", true), ("c", true)]).await;
        seed_pull_request(&store, "pr-1", "a", &["b", "c"]).await;
        seed_pull_request(&store, "pr-2", "a", &["b"]).await;
        let engine = engine(store, 1);

        let by_reviewer = engine.assignment_stats_by_reviewer().await.unwrap();
        assert_eq!(by_reviewer[0].reviewer_id, "b");
        assert_eq!(by_reviewer[0].count, 2);
        assert_eq!(by_reviewer[1].reviewer_id, "c");

        let by_pr = engine.assignment_stats_by_pull_request().await.unwrap();
        assert_eq!(by_pr[0].pull_request_id, "pr-1");
        assert_eq!(by_pr[0].count, 2);
        assert_eq!(by_pr[1].count, 1);
    }

    #[tokio::test]
    async fn test_operation_times_out_while_store_is_locked() {
        use crate::store::Store;
        use std::time::Duration;

        let store = store_with_team("t", &[("a", true)]).await;
        let engine = engine(store.clone(), 1).with_timeout(Duration::from_millis(20));

        let _held = store.begin().await.unwrap();
        let err = engine.assignment_stats_by_reviewer().await.unwrap_err();
        assert!(matches!(err, crate::Error::Timeout(_)));
    }
}
