//! Database layer for revassign
//!
//! Persists teams, users, pull requests and the reviewer relation in SQLite
//! and exposes them to the engine as a [`revassign_core::Store`].

pub mod db;
pub mod error;
mod models;
pub mod store;

pub use db::{Database, DatabaseConfig};
pub use error::{DbError, Result};
pub use store::{SqliteStore, SqliteTransaction};
