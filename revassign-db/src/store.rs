//! SQLite implementation of the engine's storage traits
//!
//! Each [`SqliteTransaction`] wraps one `sqlx` transaction opened with
//! `BEGIN IMMEDIATE`. SQLite has a single writer per database, so every
//! transaction holds the write lock from its first statement and other
//! transactions wait on the busy timeout until it ends. That lock is what
//! [`get_for_update`](PullRequestRepository::get_for_update) relies on.
//!
//! Id lists are bound in chunks of [`MAX_IDS_PER_STATEMENT`] to stay under
//! SQLite's bound-parameter limit.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use revassign_core::domain::{
    AssignmentStats, PullRequest, PullRequestAssignmentStats, ReviewerEdge, Team, User,
};
use revassign_core::store::{
    PullRequestRepository, Store, TeamRepository, Transaction, UserRepository,
};
use revassign_core::{Error, Result};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::{is_unique_violation, storage};
use crate::models::{CountRow, PullRequestRow, UserRow};

/// Largest id list bound into one statement
///
/// Older SQLite builds cap a statement at 999 parameters.
pub const MAX_IDS_PER_STATEMENT: usize = 500;

const PULL_REQUEST_COLUMNS: &str =
    "p.pull_request_id, p.pull_request_name, p.author_id, p.status, p.created_at, p.merged_at";

/// Storage backend over a SQLite pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for SqliteStore {
    type Tx = SqliteTransaction;

    async fn begin(&self) -> Result<SqliteTransaction> {
        // a deferred transaction that reads first cannot upgrade to a write
        // once another writer has committed, so take the write lock up front
        let tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(storage)?;
        Ok(SqliteTransaction { tx })
    }
}

/// Transaction over [`SqliteStore`]; rolled back when dropped uncommitted
pub struct SqliteTransaction {
    tx: sqlx::Transaction<'static, Sqlite>,
}

impl SqliteTransaction {
    fn pull_requests(rows: Vec<PullRequestRow>) -> Result<Vec<PullRequest>> {
        rows.into_iter()
            .map(|row| PullRequest::try_from(row).map_err(Error::from))
            .collect()
    }
}

#[async_trait]
impl Transaction for SqliteTransaction {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(storage)
    }
}

#[async_trait]
impl TeamRepository for SqliteTransaction {
    async fn create_team(&mut self, name: &str) -> Result<()> {
        sqlx::query("INSERT INTO teams (team_name) VALUES (?)")
            .bind(name)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::TeamExists(name.to_string())
                } else {
                    storage(e)
                }
            })?;
        Ok(())
    }

    async fn team_exists(&mut self, name: &str) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM teams WHERE team_name = ?)")
                .bind(name)
                .fetch_one(&mut *self.tx)
                .await
                .map_err(storage)?;
        Ok(exists)
    }

    async fn get_team(&mut self, name: &str) -> Result<Team> {
        if !self.team_exists(name).await? {
            return Err(Error::team_not_found(name));
        }
        let members = self.list_users_by_team(name).await?;
        Ok(Team::new(name, members))
    }
}

#[async_trait]
impl UserRepository for SqliteTransaction {
    async fn upsert_user(&mut self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, team_name, is_active)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE
            SET username = excluded.username,
                team_name = excluded.team_name,
                is_active = excluded.is_active
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.team_name)
        .bind(user.is_active)
        .execute(&mut *self.tx)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn get_user(&mut self, id: &str) -> Result<User> {
        sqlx::query_as::<_, UserRow>(
            "SELECT user_id, username, team_name, is_active FROM users WHERE user_id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(storage)?
        .map(User::from)
        .ok_or_else(|| Error::user_not_found(id))
    }

    async fn list_users_by_team(&mut self, team_name: &str) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT user_id, username, team_name, is_active FROM users
             WHERE team_name = ? ORDER BY user_id",
        )
        .bind(team_name)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(storage)?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn update_is_active(&mut self, id: &str, is_active: bool) -> Result<User> {
        let result = sqlx::query("UPDATE users SET is_active = ? WHERE user_id = ?")
            .bind(is_active)
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(Error::user_not_found(id));
        }
        self.get_user(id).await
    }

    async fn bulk_deactivate_in_team(
        &mut self,
        team_name: &str,
        user_ids: &[String],
    ) -> Result<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let mut changed = 0;
        for chunk in user_ids.chunks(MAX_IDS_PER_STATEMENT) {
            let mut query = QueryBuilder::<Sqlite>::new(
                "UPDATE users SET is_active = 0 WHERE is_active = 1 AND team_name = ",
            );
            query.push_bind(team_name).push(" AND user_id IN (");
            let mut ids = query.separated(", ");
            for id in chunk {
                ids.push_bind(id.as_str());
            }
            ids.push_unseparated(")");

            let result = query
                .build()
                .execute(&mut *self.tx)
                .await
                .map_err(storage)?;
            changed += result.rows_affected();
        }
        Ok(changed)
    }
}

#[async_trait]
impl PullRequestRepository for SqliteTransaction {
    async fn pull_request_exists(&mut self, id: &str) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM pull_requests WHERE pull_request_id = ?)",
        )
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(storage)?;
        Ok(exists)
    }

    async fn create_pull_request(&mut self, pr: &PullRequest) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pull_requests (
                pull_request_id, pull_request_name, author_id, status, created_at, merged_at
            )
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&pr.id)
        .bind(&pr.name)
        .bind(&pr.author_id)
        .bind(pr.status.as_str())
        .bind(pr.created_at)
        .bind(pr.merged_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::PullRequestExists(pr.id.clone())
            } else {
                storage(e)
            }
        })?;
        Ok(())
    }

    async fn get_pull_request(&mut self, id: &str) -> Result<PullRequest> {
        let row = sqlx::query_as::<_, PullRequestRow>(&format!(
            "SELECT {} FROM pull_requests p WHERE p.pull_request_id = ?",
            PULL_REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(storage)?
        .ok_or_else(|| Error::pull_request_not_found(id))?;

        Ok(PullRequest::try_from(row)?)
    }

    async fn get_for_update(&mut self, id: &str) -> Result<PullRequest> {
        // the write lock is already held since BEGIN IMMEDIATE
        self.get_pull_request(id).await
    }

    async fn mark_merged(&mut self, id: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE pull_requests
            SET status = 'MERGED',
                merged_at = COALESCE(merged_at, ?)
            WHERE pull_request_id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *self.tx)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(Error::pull_request_not_found(id));
        }
        Ok(())
    }

    async fn list_by_reviewer(&mut self, reviewer_id: &str) -> Result<Vec<PullRequest>> {
        let rows = sqlx::query_as::<_, PullRequestRow>(&format!(
            "SELECT {} FROM pull_requests p
             JOIN pr_reviewers r ON r.pull_request_id = p.pull_request_id
             WHERE r.reviewer_id = ?
             ORDER BY p.created_at DESC, p.pull_request_id",
            PULL_REQUEST_COLUMNS
        ))
        .bind(reviewer_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(storage)?;
        Self::pull_requests(rows)
    }

    async fn get_reviewers(&mut self, pull_request_id: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT reviewer_id FROM pr_reviewers WHERE pull_request_id = ? ORDER BY reviewer_id",
        )
        .bind(pull_request_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(storage)?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn add_reviewer(&mut self, edge: &ReviewerEdge) -> Result<()> {
        if !self.pull_request_exists(&edge.pull_request_id).await? {
            return Err(Error::pull_request_not_found(&edge.pull_request_id));
        }
        self.get_user(&edge.reviewer_id).await?;

        sqlx::query("INSERT OR IGNORE INTO pr_reviewers (pull_request_id, reviewer_id) VALUES (?, ?)")
            .bind(&edge.pull_request_id)
            .bind(&edge.reviewer_id)
            .execute(&mut *self.tx)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn remove_reviewer(&mut self, edge: &ReviewerEdge) -> Result<()> {
        sqlx::query("DELETE FROM pr_reviewers WHERE pull_request_id = ? AND reviewer_id = ?")
            .bind(&edge.pull_request_id)
            .bind(&edge.reviewer_id)
            .execute(&mut *self.tx)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn list_open_by_any_reviewer(
        &mut self,
        reviewer_ids: &[String],
    ) -> Result<Vec<PullRequest>> {
        if reviewer_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut rows: Vec<PullRequestRow> = Vec::new();
        let mut seen = HashSet::new();
        for chunk in reviewer_ids.chunks(MAX_IDS_PER_STATEMENT) {
            let mut query = QueryBuilder::<Sqlite>::new(format!(
                "SELECT DISTINCT {} FROM pull_requests p
                 JOIN pr_reviewers r ON r.pull_request_id = p.pull_request_id
                 WHERE p.status = 'OPEN' AND r.reviewer_id IN (",
                PULL_REQUEST_COLUMNS
            ));
            let mut ids = query.separated(", ");
            for id in chunk {
                ids.push_bind(id.as_str());
            }
            ids.push_unseparated(")");

            let found = query
                .build_query_as::<PullRequestRow>()
                .fetch_all(&mut *self.tx)
                .await
                .map_err(storage)?;
            // a pull request can match reviewers from several chunks
            rows.extend(
                found
                    .into_iter()
                    .filter(|row| seen.insert(row.pull_request_id.clone())),
            );
        }

        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.pull_request_id.cmp(&b.pull_request_id))
        });
        Self::pull_requests(rows)
    }

    async fn assignment_stats_by_reviewer(&mut self) -> Result<Vec<AssignmentStats>> {
        let rows = sqlx::query_as::<_, CountRow>(
            r#"
            SELECT reviewer_id AS id, COUNT(*) AS cnt
            FROM pr_reviewers
            GROUP BY reviewer_id
            ORDER BY cnt DESC, reviewer_id
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(storage)?;

        Ok(rows
            .into_iter()
            .map(|row| AssignmentStats {
                reviewer_id: row.id,
                count: row.cnt,
            })
            .collect())
    }

    async fn assignment_stats_by_pull_request(
        &mut self,
    ) -> Result<Vec<PullRequestAssignmentStats>> {
        let rows = sqlx::query_as::<_, CountRow>(
            r#"
            SELECT pull_request_id AS id, COUNT(*) AS cnt
            FROM pr_reviewers
            GROUP BY pull_request_id
            ORDER BY cnt DESC, pull_request_id
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(storage)?;

        Ok(rows
            .into_iter()
            .map(|row| PullRequestAssignmentStats {
                pull_request_id: row.id,
                count: row.cnt,
            })
            .collect())
    }
}
