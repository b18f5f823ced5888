//! Tree record repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist full tree snapshots keyed by tree id (last writer wins).
//! - Serve the registry listing without deserializing snapshots.
//!
//! # Invariants
//! - `save_tree` writes the complete snapshot, never a diff.
//! - `delete_tree` is idempotent: deleting an absent record is a no-op.
//! - Listing order is deterministic: `updated_at DESC, tree_uuid ASC`.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::tree::{FamilyTree, FamilyTreeSummary, TreeId};
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Result type used by tree repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from tree repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
    /// Snapshot (de)serialization failed.
    Snapshot(serde_json::Error),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "tree repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "tree repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "tree repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted tree data: {message}"),
            Self::Snapshot(err) => write!(f, "tree snapshot serialization failed: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Snapshot(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Snapshot(value)
    }
}

/// Durable key-value contract for tree records, shared by the
/// synchronizer and the registry (integration tests provide mock
/// implementations).
pub trait TreeRepository {
    /// Loads the full snapshot for one tree id, if a record exists.
    fn load_tree(&self, tree_uuid: TreeId) -> RepoResult<Option<FamilyTree>>;
    /// Writes the full snapshot, replacing any prior record.
    fn save_tree(&self, tree: &FamilyTree) -> RepoResult<()>;
    /// Removes the record; absent records are a successful no-op.
    fn delete_tree(&self, tree_uuid: TreeId) -> RepoResult<()>;
    /// Lists registry summaries, most recently updated first.
    fn list_trees(&self) -> RepoResult<Vec<FamilyTreeSummary>>;
}

/// SQLite-backed tree repository.
#[derive(Debug)]
pub struct SqliteTreeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTreeRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TreeRepository for SqliteTreeRepository<'_> {
    fn load_tree(&self, tree_uuid: TreeId) -> RepoResult<Option<FamilyTree>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT snapshot
                 FROM trees
                 WHERE tree_uuid = ?1;",
                [tree_uuid.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        let tree: FamilyTree = serde_json::from_str(&raw)?;
        if tree.uuid != tree_uuid {
            return Err(RepoError::InvalidData(format!(
                "snapshot id {} does not match record key {tree_uuid}",
                tree.uuid
            )));
        }
        Ok(Some(tree))
    }

    fn save_tree(&self, tree: &FamilyTree) -> RepoResult<()> {
        let snapshot = serde_json::to_string(tree)?;
        self.conn.execute(
            "INSERT INTO trees (tree_uuid, name, snapshot, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (tree_uuid) DO UPDATE SET
                name = excluded.name,
                snapshot = excluded.snapshot,
                updated_at = excluded.updated_at;",
            params![
                tree.uuid.to_string(),
                tree.name.as_str(),
                snapshot,
                tree.created_at,
                tree.updated_at,
            ],
        )?;
        Ok(())
    }

    fn delete_tree(&self, tree_uuid: TreeId) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM trees WHERE tree_uuid = ?1;",
            [tree_uuid.to_string()],
        )?;
        Ok(())
    }

    fn list_trees(&self) -> RepoResult<Vec<FamilyTreeSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT tree_uuid, name, updated_at
             FROM trees
             ORDER BY updated_at DESC, tree_uuid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut summaries = Vec::new();
        while let Some(row) = rows.next()? {
            let uuid_text: String = row.get(0)?;
            let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
                RepoError::InvalidData(format!("invalid uuid `{uuid_text}` in trees.tree_uuid"))
            })?;
            summaries.push(FamilyTreeSummary {
                uuid,
                name: row.get(1)?,
                updated_at: row.get(2)?,
            });
        }
        Ok(summaries)
    }
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "trees")? {
        return Err(RepoError::MissingRequiredTable("trees"));
    }

    for column in ["tree_uuid", "name", "snapshot", "created_at", "updated_at"] {
        if !table_has_column(conn, "trees", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "trees",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
