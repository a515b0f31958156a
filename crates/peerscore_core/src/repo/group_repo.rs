//! Group registry repository.
//!
//! The registry only tracks names. Deleting a group does not touch the
//! individuals that still reference it.

use super::{RepoError, RepoResult};
use crate::model::group::Group;
use rusqlite::Connection;

const ENTITY: &str = "group";

/// Repository interface for the group registry.
pub trait GroupRepository {
    fn create_group(&self, group: &Group) -> RepoResult<()>;
    /// All registered groups sorted by name.
    fn list_groups(&self) -> RepoResult<Vec<Group>>;
    fn group_exists(&self, name: &str) -> RepoResult<bool>;
    fn delete_group(&self, name: &str) -> RepoResult<()>;
}

/// SQLite-backed group repository.
pub struct SqliteGroupRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGroupRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl GroupRepository for SqliteGroupRepository<'_> {
    fn create_group(&self, group: &Group) -> RepoResult<()> {
        group.validate()?;

        let inserted = self.conn.execute(
            "INSERT INTO groups (group_name) VALUES (?1)
             ON CONFLICT (group_name) DO NOTHING;",
            [group.name.trim()],
        )?;

        if inserted == 0 {
            return Err(RepoError::already_exists(ENTITY, group.name.trim()));
        }
        Ok(())
    }

    fn list_groups(&self) -> RepoResult<Vec<Group>> {
        let mut stmt = self
            .conn
            .prepare("SELECT group_name FROM groups ORDER BY group_name ASC;")?;
        let groups = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|name| name.map(Group::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(groups)
    }

    fn group_exists(&self, name: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM groups WHERE group_name = ?1);",
            [name],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn delete_group(&self, name: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM groups WHERE group_name = ?1;", [name])?;
        if changed == 0 {
            return Err(RepoError::not_found(ENTITY, name));
        }
        Ok(())
    }
}
