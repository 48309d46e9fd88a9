//! Bulk deactivation with cascading reviewer repair
//!
//! Runs as a sequence of transactions rather than one: the first flips the
//! users to inactive and collects the affected open pull requests, then each
//! pull request is repaired in its own transaction. If a later step fails the
//! earlier ones stay committed. Replacements are chosen first-fit from a
//! stable-ordered pool so the outcome is reproducible.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::{within, AssignmentEngine};
use crate::domain::{BulkDeactivateResult, ReviewerEdge};
use crate::selector;
use crate::store::{PullRequestRepository, Store, TeamRepository, Transaction, UserRepository};
use crate::Result;

/// What the first step of a bulk deactivation decided
struct DeactivationPlan {
    /// Listed ids that belong to the team
    deactivated: Vec<String>,
    /// Active members outside the deactivation set, in roster order
    pool: Vec<String>,
    changed_users: u64,
    /// Open pull requests reviewed by someone in `deactivated`
    affected: Vec<String>,
}

impl<S: Store> AssignmentEngine<S> {
    /// Deactivate members of a team and repair the open pull requests they review
    ///
    /// Each departing reviewer is replaced by the first pool member who is not
    /// the author and not already reviewing. Without such a member the pull
    /// request is simply left with one reviewer fewer.
    ///
    /// The operation timeout bounds each step on its own, so the whole call
    /// may run longer than one timeout when many pull requests are affected.
    pub async fn bulk_deactivate_team(
        &self,
        team_name: &str,
        user_ids: &[String],
    ) -> Result<BulkDeactivateResult> {
        if user_ids.is_empty() {
            return Ok(BulkDeactivateResult::empty(team_name));
        }

        let planned = within(self.timeout, self.plan_deactivation(team_name, user_ids)).await?;
        let plan = match planned {
            Some(plan) => plan,
            None => {
                debug!(team = %team_name, "None of the listed users belong to the team");
                return Ok(BulkDeactivateResult::empty(team_name));
            }
        };

        let mut affected_prs = 0;
        for (done, pr_id) in plan.affected.iter().enumerate() {
            let repaired = within(
                self.timeout,
                self.repair_pull_request(pr_id, &plan.deactivated, &plan.pool),
            )
            .await;
            match repaired {
                Ok(true) => affected_prs += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        team = %team_name,
                        pr = %pr_id,
                        repaired = done,
                        remaining = plan.affected.len() - done,
                        error = %e,
                        "Bulk deactivation stopped partway"
                    );
                    return Err(e);
                }
            }
        }

        let result = BulkDeactivateResult {
            team_name: team_name.to_string(),
            deactivated_users: plan.changed_users,
            affected_prs,
        };
        info!(
            team = %team_name,
            deactivated = result.deactivated_users,
            affected_prs = result.affected_prs,
            "Bulk deactivation finished"
        );
        Ok(result)
    }

    /// Step one: deactivate and find the pull requests to repair
    async fn plan_deactivation(
        &self,
        team_name: &str,
        user_ids: &[String],
    ) -> Result<Option<DeactivationPlan>> {
        let mut tx = self.store.begin().await?;

        let team = tx.get_team(team_name).await?;
        let wanted: HashSet<&str> = user_ids.iter().map(String::as_str).collect();

        let (leaving, staying): (Vec<_>, Vec<_>) = team
            .members
            .iter()
            .partition(|u| wanted.contains(u.id.as_str()));
        if leaving.is_empty() {
            return Ok(None);
        }

        let deactivated: Vec<String> = leaving.iter().map(|u| u.id.clone()).collect();
        let pool: Vec<String> = staying
            .iter()
            .filter(|u| u.is_active)
            .map(|u| u.id.clone())
            .collect();

        let changed_users = tx.bulk_deactivate_in_team(team_name, &deactivated).await?;
        let affected = tx
            .list_open_by_any_reviewer(&deactivated)
            .await?
            .into_iter()
            .map(|pr| pr.id)
            .collect();
        tx.commit().await?;

        Ok(Some(DeactivationPlan {
            deactivated,
            pool,
            changed_users,
            affected,
        }))
    }

    /// Replace deactivated reviewers on one pull request
    ///
    /// Returns whether any reviewer edge changed.
    async fn repair_pull_request(
        &self,
        pr_id: &str,
        deactivated: &[String],
        pool: &[String],
    ) -> Result<bool> {
        let mut tx = self.store.begin().await?;

        let pr = tx.get_for_update(pr_id).await?;
        if pr.is_merged() {
            // merged since the plan was made
            return Ok(false);
        }

        let mut reviewers = tx.get_reviewers(pr_id).await?;
        let departing: Vec<String> = reviewers
            .iter()
            .filter(|r| deactivated.contains(*r))
            .cloned()
            .collect();
        if departing.is_empty() {
            return Ok(false);
        }

        for old in &departing {
            tx.remove_reviewer(&ReviewerEdge::new(pr_id, old)).await?;
            reviewers.retain(|r| r != old);

            match selector::first_fit(pool, &pr.author_id, &reviewers) {
                Some(new) => {
                    tx.add_reviewer(&ReviewerEdge::new(pr_id, new)).await?;
                    debug!(pr = %pr_id, old = %old, new = %new, "Replaced deactivated reviewer");
                    reviewers.push(new.to_string());
                }
                None => {
                    warn!(pr = %pr_id, old = %old, "No replacement available, reviewer dropped");
                }
            }
        }

        tx.commit().await?;
        Ok(true)
    }
}
