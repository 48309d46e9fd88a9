//! Pull request creation, merge and single reviewer reassignment

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{within, AssignmentEngine, MAX_INITIAL_REVIEWERS};
use crate::domain::{PullRequest, ReviewerEdge, Team};
use crate::selector;
use crate::store::{PullRequestRepository, Store, Transaction, UserRepository};
use crate::{Error, Result};

/// Outcome of a successful reassignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignResult {
    /// The pull request with its refreshed reviewer set
    pub pull_request: PullRequest,
    /// Id of the reviewer that took over
    pub replaced_by: String,
}

impl<S: Store> AssignmentEngine<S> {
    /// Create an open pull request and assign up to two reviewers
    ///
    /// Reviewers are drawn at random from the active members of the author's
    /// team, never the author. A team with fewer eligible members yields fewer
    /// reviewers, possibly none.
    pub async fn create_pull_request(
        &self,
        id: &str,
        name: &str,
        author_id: &str,
    ) -> Result<PullRequest> {
        within(self.timeout, self.create_pull_request_tx(id, name, author_id)).await
    }

    async fn create_pull_request_tx(
        &self,
        id: &str,
        name: &str,
        author_id: &str,
    ) -> Result<PullRequest> {
        let mut tx = self.store.begin().await?;

        if tx.pull_request_exists(id).await? {
            return Err(Error::PullRequestExists(id.to_string()));
        }

        let author = tx.get_user(author_id).await?;
        let team = Team::new(
            author.team_name.clone(),
            tx.list_users_by_team(&author.team_name).await?,
        );

        let reviewer_ids = {
            let candidates = team.active_members_except(&[author.id.as_str()]);
            debug!(pr = %id, team = %team.name, candidates = candidates.len(), "Picking reviewers");
            self.with_rng_mut(|rng| selector::pick_up_to(&candidates, MAX_INITIAL_REVIEWERS, rng))
        };

        let mut pr = PullRequest::new(id, name, author_id);
        tx.create_pull_request(&pr).await?;
        for reviewer_id in &reviewer_ids {
            tx.add_reviewer(&ReviewerEdge::new(id, reviewer_id)).await?;
        }
        tx.commit().await?;

        info!(pr = %id, author = %author_id, reviewers = ?reviewer_ids, "Pull request created");
        pr.assigned_reviewers = reviewer_ids;
        Ok(pr)
    }

    /// Mark a pull request as merged
    ///
    /// Merging an already merged pull request returns its current state and
    /// keeps the original merge time.
    pub async fn merge_pull_request(&self, id: &str) -> Result<PullRequest> {
        within(self.timeout, self.merge_pull_request_tx(id)).await
    }

    async fn merge_pull_request_tx(&self, id: &str) -> Result<PullRequest> {
        let mut tx = self.store.begin().await?;

        let mut pr = tx.get_for_update(id).await?;
        let newly_merged = !pr.is_merged();
        if newly_merged {
            tx.mark_merged(id).await?;
            pr = tx.get_pull_request(id).await?;
        }
        pr.assigned_reviewers = tx.get_reviewers(id).await?;
        tx.commit().await?;

        if newly_merged {
            info!(pr = %id, "Pull request merged");
        } else {
            debug!(pr = %id, "Pull request was already merged");
        }
        Ok(pr)
    }

    /// Replace one reviewer of an open pull request
    ///
    /// The replacement is drawn at random from the active members of the
    /// departing reviewer's team, excluding the author and everyone already
    /// reviewing.
    pub async fn reassign_reviewer(
        &self,
        pull_request_id: &str,
        old_reviewer_id: &str,
    ) -> Result<ReassignResult> {
        within(
            self.timeout,
            self.reassign_reviewer_tx(pull_request_id, old_reviewer_id),
        )
        .await
    }

    async fn reassign_reviewer_tx(
        &self,
        pull_request_id: &str,
        old_reviewer_id: &str,
    ) -> Result<ReassignResult> {
        let mut tx = self.store.begin().await?;

        let mut pr = tx.get_for_update(pull_request_id).await?;
        pr.can_be_reassigned()?;

        pr.assigned_reviewers = tx.get_reviewers(pull_request_id).await?;
        if !pr.has_reviewer(old_reviewer_id) {
            return Err(Error::NotAssigned {
                pull_request_id: pull_request_id.to_string(),
                reviewer_id: old_reviewer_id.to_string(),
            });
        }

        let old_reviewer = tx.get_user(old_reviewer_id).await?;
        let team = Team::new(
            old_reviewer.team_name.clone(),
            tx.list_users_by_team(&old_reviewer.team_name).await?,
        );

        let replacement = {
            let mut excluded: Vec<&str> = vec![pr.author_id.as_str()];
            excluded.extend(pr.assigned_reviewers.iter().map(String::as_str));
            let candidates = team.active_members_except(&excluded);
            debug!(
                pr = %pull_request_id,
                team = %team.name,
                candidates = candidates.len(),
                "Picking replacement reviewer"
            );
            self.with_rng_mut(|rng| selector::pick_one(&candidates, rng))
        }
        .ok_or_else(|| Error::NoCandidate {
            pull_request_id: pull_request_id.to_string(),
        })?;

        tx.remove_reviewer(&ReviewerEdge::new(pull_request_id, old_reviewer_id))
            .await?;
        tx.add_reviewer(&ReviewerEdge::new(pull_request_id, &replacement))
            .await?;
        pr.assigned_reviewers = tx.get_reviewers(pull_request_id).await?;
        tx.commit().await?;

        info!(
            pr = %pull_request_id,
            old = %old_reviewer_id,
            new = %replacement,
            "Reviewer reassigned"
        );
        Ok(ReassignResult {
            pull_request: pr,
            replaced_by: replacement,
        })
    }
}
