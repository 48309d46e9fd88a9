//! Revassign Core - reviewer assignment for team pull requests
//!
//! This crate holds the domain model, the candidate selector, the assignment
//! engine and the roster operations, together with the storage traits they
//! run against and an in-memory store. The durable store lives in
//! `revassign-db`.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod roster;
pub mod selector;
pub mod store;

pub use config::Config;
pub use domain::{
    AssignmentStats, BulkDeactivateResult, PullRequest, PullRequestAssignmentStats,
    PullRequestStatus, ReviewerEdge, Team, User,
};
pub use engine::{AssignmentEngine, ReassignResult, MAX_INITIAL_REVIEWERS};
pub use error::{Entity, Error, ErrorKind, Result};
pub use roster::RosterService;
pub use store::{
    InMemoryStore, PullRequestRepository, Store, TeamRepository, Transaction, UserRepository,
};
