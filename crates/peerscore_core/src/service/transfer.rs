//! Bulk export/import of accounts and ratings.
//!
//! # Responsibility
//! - Serialize users, groups and scores into one JSON bundle.
//! - Load a bundle back: create missing groups and users, upsert scores.
//!
//! # Invariants
//! - Exports never contain password material.
//! - An import runs in a single transaction; a failing row aborts it.
//! - Existing users are skipped, never overwritten.
//! - Score timestamps survive a round trip; a blank password falls back to
//!   the default one.

use crate::credentials::PasswordDigest;
use crate::model::group::{is_undefined_group, Group};
use crate::model::individual::{Individual, RoleSet};
use crate::repo::group_repo::{GroupRepository, SqliteGroupRepository};
use crate::repo::individual_repo::{IndividualRepository, SqliteIndividualRepository};
use crate::repo::rating_repo::{RatingRepository, SqliteRatingRepository};
use crate::repo::{RepoError, RepoResult};
use log::info;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;

/// One account row, column names matching the spreadsheet layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub username: String,
    pub realname: String,
    /// Comma-joined role names.
    #[serde(default)]
    pub roles: String,
    pub group: String,
    /// Only read on import; falls back to the configured initial password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// One rating row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub rater: String,
    pub target: String,
    pub score: f64,
    /// Epoch milliseconds; kept on import, or set to now when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Export/import document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub users: Vec<UserRow>,
    #[serde(default)]
    pub scores: Vec<ScoreRow>,
}

/// Counts produced by [`import_bundle`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub groups_created: usize,
    pub users_created: usize,
    pub users_skipped: usize,
    pub scores_saved: usize,
}

/// Errors from bundle transfer.
#[derive(Debug)]
pub enum TransferError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Repo(RepoError),
}

impl Display for TransferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "bundle file error: {err}"),
            Self::Json(err) => write!(f, "invalid bundle json: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for TransferError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for TransferError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<RepoError> for TransferError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for TransferError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Collects every group, user and score into a bundle.
pub fn export_bundle(conn: &Connection) -> RepoResult<Bundle> {
    let groups = SqliteGroupRepository::new(conn)
        .list_groups()?
        .into_iter()
        .map(|group| group.name)
        .collect();
    let users = SqliteIndividualRepository::new(conn)
        .list_individuals()?
        .into_iter()
        .map(|individual| UserRow {
            username: individual.username,
            realname: individual.display_name,
            roles: individual.roles.to_string(),
            group: individual.group,
            password: None,
        })
        .collect();
    let scores = SqliteRatingRepository::new(conn)
        .list_ratings()?
        .into_iter()
        .map(|rating| ScoreRow {
            rater: rating.rater,
            target: rating.target,
            score: rating.score,
            timestamp: Some(rating.timestamp),
        })
        .collect();

    Ok(Bundle {
        groups,
        users,
        scores,
    })
}

/// Loads a bundle in one transaction.
///
/// Groups referenced by users are registered when missing.
pub fn import_bundle(
    conn: &Connection,
    bundle: &Bundle,
    default_password: &str,
) -> Result<ImportSummary, TransferError> {
    let tx = conn.unchecked_transaction()?;
    let mut summary = ImportSummary::default();
    {
        let groups = SqliteGroupRepository::new(&tx);
        let individuals = SqliteIndividualRepository::new(&tx);
        let ratings = SqliteRatingRepository::new(&tx);

        let referenced = bundle
            .users
            .iter()
            .map(|row| row.group.trim())
            .filter(|name| !is_undefined_group(name));
        for name in bundle.groups.iter().map(|name| name.trim()).chain(referenced) {
            if !groups.group_exists(name)? {
                groups.create_group(&Group::new(name))?;
                summary.groups_created += 1;
            }
        }

        for row in &bundle.users {
            let roles = RoleSet::parse(&row.roles).map_err(RepoError::from)?;
            let individual = Individual::new(
                row.username.trim(),
                row.realname.trim(),
                row.group.trim(),
                roles,
            );
            let password = row
                .password
                .as_deref()
                .filter(|password| !password.is_empty())
                .unwrap_or(default_password);
            match individuals.create_individual(&individual, &PasswordDigest::derive(password)) {
                Ok(()) => summary.users_created += 1,
                Err(RepoError::AlreadyExists { .. }) => summary.users_skipped += 1,
                Err(err) => return Err(err.into()),
            }
        }

        for row in &bundle.scores {
            ratings.upsert_rating_at(
                row.rater.trim(),
                row.target.trim(),
                row.score,
                row.timestamp,
            )?;
            summary.scores_saved += 1;
        }
    }
    tx.commit()?;

    info!(
        "event=import module=transfer status=ok groups_created={} users_created={} users_skipped={} scores_saved={}",
        summary.groups_created, summary.users_created, summary.users_skipped, summary.scores_saved
    );
    Ok(summary)
}

/// Writes a bundle as pretty-printed JSON.
pub fn write_bundle(path: impl AsRef<Path>, bundle: &Bundle) -> Result<(), TransferError> {
    let json = serde_json::to_string_pretty(bundle)?;
    fs::write(path, json)?;
    Ok(())
}

/// Reads a bundle from a JSON file.
pub fn read_bundle(path: impl AsRef<Path>) -> Result<Bundle, TransferError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
