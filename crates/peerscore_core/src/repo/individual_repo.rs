//! Individual (account) repository.
//!
//! # Invariants
//! - `username` is the primary key; duplicates yield `AlreadyExists`.
//! - Password material is stored as digest + salt only.
//! - Listing order is insertion order.

use super::{RepoError, RepoResult};
use crate::credentials::PasswordDigest;
use crate::model::individual::{Individual, RoleSet};
use rusqlite::{params, Connection, OptionalExtension, Row};

const ENTITY: &str = "individual";

const INDIVIDUAL_SELECT_SQL: &str = "SELECT
    username,
    realname,
    roles,
    group_name
FROM users";

/// Password state stored for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    pub digest: PasswordDigest,
    /// Whether the password was changed after account creation.
    pub modified: bool,
}

/// Repository interface for individuals and their credentials.
pub trait IndividualRepository {
    fn create_individual(&self, individual: &Individual, password: &PasswordDigest)
        -> RepoResult<()>;
    fn get_individual(&self, username: &str) -> RepoResult<Option<Individual>>;
    fn get_credentials(&self, username: &str) -> RepoResult<Option<StoredCredentials>>;
    fn list_individuals(&self) -> RepoResult<Vec<Individual>>;
    /// Students whose group differs from `group`.
    fn list_students_excluding_group(&self, group: &str) -> RepoResult<Vec<Individual>>;
    fn update_password(&self, username: &str, password: &PasswordDigest) -> RepoResult<()>;
}

/// SQLite-backed individual repository.
pub struct SqliteIndividualRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteIndividualRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl IndividualRepository for SqliteIndividualRepository<'_> {
    fn create_individual(
        &self,
        individual: &Individual,
        password: &PasswordDigest,
    ) -> RepoResult<()> {
        individual.validate()?;

        let inserted = self.conn.execute(
            "INSERT INTO users (
                username,
                realname,
                roles,
                group_name,
                password_hash,
                password_salt,
                password_modified
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)
            ON CONFLICT (username) DO NOTHING;",
            params![
                individual.username.as_str(),
                individual.display_name.trim(),
                individual.roles.to_string(),
                individual.group.trim(),
                password.hash.as_str(),
                password.salt.as_str(),
            ],
        )?;

        if inserted == 0 {
            return Err(RepoError::already_exists(ENTITY, &individual.username));
        }
        Ok(())
    }

    fn get_individual(&self, username: &str) -> RepoResult<Option<Individual>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{INDIVIDUAL_SELECT_SQL} WHERE username = ?1;"))?;
        let mut rows = stmt.query([username])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_individual_row(row)?));
        }
        Ok(None)
    }

    fn get_credentials(&self, username: &str) -> RepoResult<Option<StoredCredentials>> {
        let credentials = self
            .conn
            .query_row(
                "SELECT password_hash, password_salt, password_modified
                 FROM users
                 WHERE username = ?1;",
                [username],
                |row| {
                    Ok(StoredCredentials {
                        digest: PasswordDigest {
                            hash: row.get(0)?,
                            salt: row.get(1)?,
                        },
                        modified: row.get::<_, i64>(2)? != 0,
                    })
                },
            )
            .optional()?;
        Ok(credentials)
    }

    fn list_individuals(&self) -> RepoResult<Vec<Individual>> {
        let mut stmt = self.conn.prepare(&format!(
            "{INDIVIDUAL_SELECT_SQL} ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let individuals = collect_individuals(stmt.query([])?)?;
        Ok(individuals)
    }

    fn list_students_excluding_group(&self, group: &str) -> RepoResult<Vec<Individual>> {
        // LIKE narrows the scan; exact role membership is checked after parsing.
        let mut stmt = self.conn.prepare(&format!(
            "{INDIVIDUAL_SELECT_SQL}
             WHERE group_name <> ?1
               AND roles LIKE '%student%'
             ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let individuals = collect_individuals(stmt.query([group])?)?;
        Ok(individuals
            .into_iter()
            .filter(Individual::is_student)
            .collect())
    }

    fn update_password(&self, username: &str, password: &PasswordDigest) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET
                password_hash = ?2,
                password_salt = ?3,
                password_modified = 1
             WHERE username = ?1;",
            params![username, password.hash.as_str(), password.salt.as_str()],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found(ENTITY, username));
        }
        Ok(())
    }
}

fn collect_individuals(mut rows: rusqlite::Rows<'_>) -> RepoResult<Vec<Individual>> {
    let mut individuals = Vec::new();
    while let Some(row) = rows.next()? {
        individuals.push(parse_individual_row(row)?);
    }
    Ok(individuals)
}

fn parse_individual_row(row: &Row<'_>) -> RepoResult<Individual> {
    let username: String = row.get("username")?;
    let roles_text: String = row.get("roles")?;
    let roles = RoleSet::parse(&roles_text).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid roles `{roles_text}` for user `{username}` in users.roles: {err}"
        ))
    })?;

    Ok(Individual {
        username,
        display_name: row.get("realname")?,
        group: row.get("group_name")?,
        roles,
    })
}
