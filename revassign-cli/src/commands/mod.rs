//! CLI command implementations

pub mod output;
pub mod pr;
pub mod stats;
pub mod team;
pub mod user;

pub use pr::PrArgs;
pub use stats::StatsArgs;
pub use team::TeamArgs;
pub use user::UserArgs;

use anyhow::Context;
use revassign_core::{AssignmentEngine, Config, RosterService};
use revassign_db::{Database, DatabaseConfig, SqliteStore};

/// Engine and roster service over the configured database
pub struct Services {
    pub engine: AssignmentEngine<SqliteStore>,
    pub roster: RosterService<SqliteStore>,
    db: Database,
}

impl Services {
    /// Open the database, migrating it if needed
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let db = Database::open(DatabaseConfig::from(&config.database))
            .await
            .with_context(|| {
                format!("Failed to open database {}", config.database.path.display())
            })?;

        let store = db.store();
        Ok(Self {
            engine: AssignmentEngine::with_settings(store.clone(), &config.assignment),
            roster: RosterService::with_settings(store, &config.assignment),
            db,
        })
    }

    pub async fn close(self) {
        self.db.close().await;
    }
}
