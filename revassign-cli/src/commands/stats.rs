//! Stats command - reviewer assignment counts

use clap::Args;
use serde::Serialize;

use super::output::{print_json, PullRequestStatsDto, ReviewerStatsDto};
use super::Services;

/// Show how many reviews each user and each pull request has
#[derive(Args, Debug)]
pub struct StatsArgs {}

#[derive(Serialize)]
struct StatsResponse {
    by_reviewer: Vec<ReviewerStatsDto>,
    by_pr: Vec<PullRequestStatsDto>,
}

impl StatsArgs {
    /// Execute the stats command
    pub async fn execute(&self, services: &Services) -> anyhow::Result<()> {
        let by_reviewer = services.engine.assignment_stats_by_reviewer().await?;
        let by_pr = services.engine.assignment_stats_by_pull_request().await?;

        print_json(&StatsResponse {
            by_reviewer: by_reviewer.into_iter().map(Into::into).collect(),
            by_pr: by_pr.into_iter().map(Into::into).collect(),
        })
    }
}
