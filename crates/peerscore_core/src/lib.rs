//! Core domain logic for peerscore peer evaluation.
//! This crate is the single source of truth for scoring and account invariants.

pub mod config;
pub mod credentials;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod scoring;
pub mod service;

pub use config::{load_config, parse_config, AppConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::group::{Group, UNDEFINED_GROUP};
pub use model::individual::{Individual, Role, RoleSet};
pub use model::rating::RatingRecord;
pub use model::ValidationError;
pub use repo::group_repo::{GroupRepository, SqliteGroupRepository};
pub use repo::individual_repo::{IndividualRepository, SqliteIndividualRepository};
pub use repo::rating_repo::{RatingRepository, SqliteRatingRepository, TrendPoint};
pub use repo::{RepoError, RepoResult};
pub use scoring::{
    aggregate, GroupScore, IndividualScore, RoleInference, ScoreReport, ScoringConfig, ZeroPolicy,
};
pub use service::account_service::{AccountError, AccountService, RegistrationRequest};
pub use service::rating_service::{RatingError, RatingScales, RatingService};
pub use service::results_service::ResultsService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
