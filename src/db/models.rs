// src/db/models.rs

//! Data models for database entities
//!
//! This module defines Rust structs that correspond to database tables
//! and provides methods for creating, reading, updating, and deleting records.

use crate::error::{Error, Result};
use crate::reconcile::{PackageRecord, keys};
use crate::version;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::str::FromStr;

/// An installed trove
#[derive(Debug, Clone)]
pub struct Trove {
    pub id: Option<i64>,
    pub name: String,
    pub version: String,
    pub flavor: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub installed_at: Option<String>,
    pub installed_by_changeset_id: Option<i64>,
}

const TROVE_COLUMNS: &str =
    "id, name, version, flavor, summary, description, installed_at, installed_by_changeset_id";

impl Trove {
    /// Create a new Trove
    pub fn new(name: String, version: String, flavor: String) -> Self {
        Self {
            id: None,
            name,
            version,
            flavor,
            summary: None,
            description: None,
            installed_at: None,
            installed_by_changeset_id: None,
        }
    }

    /// Insert this trove into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO troves (name, version, flavor, summary, description, installed_by_changeset_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &self.name,
                &self.version,
                &self.flavor,
                &self.summary,
                &self.description,
                &self.installed_by_changeset_id,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find troves by name
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM troves WHERE name = ?1 ORDER BY id",
            TROVE_COLUMNS
        ))?;

        let troves = stmt
            .query_map([name], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(troves)
    }

    /// List all troves
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM troves ORDER BY name, id",
            TROVE_COLUMNS
        ))?;

        let troves = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(troves)
    }

    /// Installed troves that own `path`
    pub fn find_by_path(conn: &Connection, path: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name, t.version, t.flavor, t.summary, t.description,
                    t.installed_at, t.installed_by_changeset_id
             FROM troves t JOIN files f ON f.trove_id = t.id
             WHERE f.path = ?1 ORDER BY t.id",
        )?;

        let troves = stmt
            .query_map([path], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(troves)
    }

    /// Delete a trove by ID
    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        conn.execute("DELETE FROM troves WHERE id = ?1", [id])?;
        Ok(())
    }

    /// The trove as a reconciler record
    pub fn to_record(&self) -> PackageRecord {
        PackageRecord::new(&self.name, &self.version, &self.flavor)
            .with_field(keys::SUMMARY, self.summary.clone())
            .with_field(keys::DESCRIPTION, self.description.clone())
            .with_field(keys::LABEL, version::label(&self.version).map(str::to_string))
    }

    /// Convert a database row to a Trove
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            version: row.get(2)?,
            flavor: row.get(3)?,
            summary: row.get(4)?,
            description: row.get(5)?,
            installed_at: row.get(6)?,
            installed_by_changeset_id: row.get(7)?,
        })
    }
}

/// Changeset status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangesetStatus {
    Pending,
    Applied,
}

impl ChangesetStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ChangesetStatus::Pending => "pending",
            ChangesetStatus::Applied => "applied",
        }
    }
}

impl FromStr for ChangesetStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ChangesetStatus::Pending),
            "applied" => Ok(ChangesetStatus::Applied),
            _ => Err(format!("Invalid changeset status: {}", s)),
        }
    }
}

/// A Changeset represents an atomic transactional operation
#[derive(Debug, Clone)]
pub struct Changeset {
    pub id: Option<i64>,
    pub description: String,
    pub status: ChangesetStatus,
    pub created_at: Option<String>,
    pub applied_at: Option<String>,
}

impl Changeset {
    /// Create a new Changeset
    pub fn new(description: String) -> Self {
        Self {
            id: None,
            description,
            status: ChangesetStatus::Pending,
            created_at: None,
            applied_at: None,
        }
    }

    /// Insert this changeset into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO changesets (description, status) VALUES (?1, ?2)",
            params![&self.description, self.status.as_str()],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// List all changesets, newest first
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, description, status, created_at, applied_at
             FROM changesets ORDER BY id DESC",
        )?;

        let changesets = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(changesets)
    }

    /// Update changeset status
    pub fn update_status(&mut self, conn: &Connection, new_status: ChangesetStatus) -> Result<()> {
        let id = self
            .id
            .ok_or_else(|| Error::InitError("Cannot update changeset without ID".to_string()))?;

        match new_status {
            ChangesetStatus::Applied => conn.execute(
                "UPDATE changesets SET status = ?1, applied_at = CURRENT_TIMESTAMP WHERE id = ?2",
                params![new_status.as_str(), id],
            )?,
            ChangesetStatus::Pending => conn.execute(
                "UPDATE changesets SET status = ?1 WHERE id = ?2",
                params![new_status.as_str(), id],
            )?,
        };

        self.status = new_status;
        Ok(())
    }

    /// Convert a database row to a Changeset
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let status_str: String = row.get(2)?;
        let status = status_str.parse::<ChangesetStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?;

        Ok(Self {
            id: Some(row.get(0)?),
            description: row.get(1)?,
            status,
            created_at: row.get(3)?,
            applied_at: row.get(4)?,
        })
    }
}

/// A path owned by an installed trove
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub id: Option<i64>,
    pub path: String,
    pub trove_id: i64,
    pub installed_at: Option<String>,
}

impl FileEntry {
    /// Create a new FileEntry
    pub fn new(path: String, trove_id: i64) -> Self {
        Self {
            id: None,
            path,
            trove_id,
            installed_at: None,
        }
    }

    /// Insert this file into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO files (path, trove_id) VALUES (?1, ?2)",
            params![&self.path, &self.trove_id],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find all files belonging to a trove, sorted by path
    pub fn find_by_trove(conn: &Connection, trove_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, path, trove_id, installed_at FROM files WHERE trove_id = ?1 ORDER BY path",
        )?;

        let files = stmt
            .query_map([trove_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(files)
    }

    /// Convert a database row to a FileEntry
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            path: row.get(1)?,
            trove_id: row.get(2)?,
            installed_at: row.get(3)?,
        })
    }
}

/// Dependency entry linking an installed trove to a trove it requires
#[derive(Debug, Clone)]
pub struct DependencyEntry {
    pub id: Option<i64>,
    pub trove_id: i64,
    pub depends_on_name: String,
}

impl DependencyEntry {
    /// Create a new DependencyEntry
    pub fn new(trove_id: i64, depends_on_name: String) -> Self {
        Self {
            id: None,
            trove_id,
            depends_on_name,
        }
    }

    /// Insert this dependency into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO dependencies (trove_id, depends_on_name) VALUES (?1, ?2)",
            params![&self.trove_id, &self.depends_on_name],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find all dependencies for a trove
    pub fn find_by_trove(conn: &Connection, trove_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, trove_id, depends_on_name FROM dependencies
             WHERE trove_id = ?1 ORDER BY id",
        )?;

        let deps = stmt
            .query_map([trove_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(deps)
    }

    /// Installed troves that require `package_name` (reverse dependencies)
    pub fn find_dependents(conn: &Connection, package_name: &str) -> Result<Vec<Trove>> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT t.id, t.name, t.version, t.flavor, t.summary, t.description,
                    t.installed_at, t.installed_by_changeset_id
             FROM troves t JOIN dependencies d ON d.trove_id = t.id
             WHERE d.depends_on_name = ?1 ORDER BY t.name, t.id",
        )?;

        let troves = stmt
            .query_map([package_name], Trove::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(troves)
    }

    /// Convert a database row to a DependencyEntry
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            trove_id: row.get(1)?,
            depends_on_name: row.get(2)?,
        })
    }
}

/// A channel: a Conary label and the URL its metadata is published at
#[derive(Debug, Clone)]
pub struct Repository {
    pub id: Option<i64>,
    pub name: String,
    pub url: String,
    pub enabled: bool,
    pub priority: i32,
    pub metadata_expire: i32,
    pub last_sync: Option<String>,
    pub created_at: Option<String>,
}

const REPOSITORY_COLUMNS: &str =
    "id, name, url, enabled, priority, metadata_expire, last_sync, created_at";

impl Repository {
    /// Create a new Repository
    pub fn new(name: String, url: String) -> Self {
        Self {
            id: None,
            name,
            url,
            enabled: true,
            priority: 0,
            metadata_expire: 3600, // Default: 1 hour
            last_sync: None,
            created_at: None,
        }
    }

    /// Insert this repository into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO repositories (name, url, enabled, priority, metadata_expire)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &self.name,
                &self.url,
                self.enabled as i32,
                &self.priority,
                &self.metadata_expire,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find a repository by name
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM repositories WHERE name = ?1",
            REPOSITORY_COLUMNS
        ))?;

        let repo = stmt.query_row([name], Self::from_row).optional()?;

        Ok(repo)
    }

    /// List all repositories
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM repositories ORDER BY priority DESC, name",
            REPOSITORY_COLUMNS
        ))?;

        let repos = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(repos)
    }

    /// List enabled repositories
    pub fn list_enabled(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM repositories WHERE enabled = 1 ORDER BY priority DESC, name",
            REPOSITORY_COLUMNS
        ))?;

        let repos = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(repos)
    }

    /// Update repository metadata
    pub fn update(&self, conn: &Connection) -> Result<()> {
        let id = self
            .id
            .ok_or_else(|| Error::InitError("Cannot update repository without ID".to_string()))?;

        conn.execute(
            "UPDATE repositories SET name = ?1, url = ?2, enabled = ?3, priority = ?4,
             metadata_expire = ?5, last_sync = ?6 WHERE id = ?7",
            params![
                &self.name,
                &self.url,
                self.enabled as i32,
                &self.priority,
                &self.metadata_expire,
                &self.last_sync,
                id,
            ],
        )?;

        Ok(())
    }

    /// Delete a repository by ID
    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        conn.execute("DELETE FROM repositories WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Convert a database row to a Repository
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            url: row.get(2)?,
            enabled: row.get::<_, i32>(3)? != 0,
            priority: row.get(4)?,
            metadata_expire: row.get(5)?,
            last_sync: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

/// A trove published on a channel, as cached from its metadata
#[derive(Debug, Clone)]
pub struct RepositoryPackage {
    pub id: Option<i64>,
    pub repository_id: i64,
    pub name: String,
    pub version: String,
    pub flavor: String,
    pub label: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub licenses: Option<String>,
    pub category: Option<String>,
    pub size: i64,
    /// JSON array of required trove names
    pub requires: Option<String>,
    /// JSON array of paths
    pub files: Option<String>,
    pub synced_at: Option<String>,
    /// Priority of the owning channel; filled by queries that join it
    pub priority: i32,
}

/// Columns selected for a RepositoryPackage; `rp` is the package table and
/// `r` the joined repositories table
const PACKAGE_COLUMNS: &str = "rp.id, rp.repository_id, rp.name, rp.version, rp.flavor, rp.label,
     rp.summary, rp.description, rp.url, rp.licenses, rp.category, rp.size, rp.requires,
     rp.files, rp.synced_at, r.priority";

impl RepositoryPackage {
    /// Create a new RepositoryPackage
    pub fn new(repository_id: i64, name: String, version: String, flavor: String) -> Self {
        Self {
            id: None,
            repository_id,
            name,
            version,
            flavor,
            label: None,
            summary: None,
            description: None,
            url: None,
            licenses: None,
            category: None,
            size: 0,
            requires: None,
            files: None,
            synced_at: None,
            priority: 0,
        }
    }

    /// Insert this repository package, replacing an identical tuple
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT OR REPLACE INTO repository_packages
             (repository_id, name, version, flavor, label, summary, description, url,
              licenses, category, size, requires, files)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                &self.repository_id,
                &self.name,
                &self.version,
                &self.flavor,
                &self.label,
                &self.summary,
                &self.description,
                &self.url,
                &self.licenses,
                &self.category,
                &self.size,
                &self.requires,
                &self.files,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find packages by name across enabled repositories
    ///
    /// Ordered by channel priority, then most recently synced first.
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM repository_packages rp JOIN repositories r ON r.id = rp.repository_id
             WHERE rp.name = ?1 AND r.enabled = 1
             ORDER BY r.priority DESC, rp.id DESC",
            PACKAGE_COLUMNS
        ))?;

        let packages = stmt
            .query_map([name], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(packages)
    }

    /// All packages of enabled repositories, ordered by name
    pub fn list_enabled(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM repository_packages rp JOIN repositories r ON r.id = rp.repository_id
             WHERE r.enabled = 1 ORDER BY rp.name, r.priority DESC, rp.id DESC",
            PACKAGE_COLUMNS
        ))?;

        let packages = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(packages)
    }

    /// Search enabled repositories by pattern on name, and optionally on
    /// summary and description
    pub fn search(conn: &Connection, pattern: &str, include_details: bool) -> Result<Vec<Self>> {
        let search_pattern = format!("%{}%", escape_like(pattern));
        let condition = if include_details {
            "(rp.name LIKE ?1 ESCAPE '\\' OR rp.summary LIKE ?1 ESCAPE '\\' \
             OR rp.description LIKE ?1 ESCAPE '\\')"
        } else {
            "rp.name LIKE ?1 ESCAPE '\\'"
        };

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM repository_packages rp JOIN repositories r ON r.id = rp.repository_id
             WHERE r.enabled = 1 AND {}
             ORDER BY rp.name, r.priority DESC, rp.id DESC",
            PACKAGE_COLUMNS, condition
        ))?;

        let packages = stmt
            .query_map([&search_pattern], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(packages)
    }

    /// Packages of enabled repositories whose file list mentions `path`
    pub fn find_by_file(conn: &Connection, path: &str) -> Result<Vec<Self>> {
        let quoted = serde_json::to_string(path)
            .map_err(|e| Error::ParseError(format!("Failed to encode path: {}", e)))?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM repository_packages rp JOIN repositories r ON r.id = rp.repository_id
             WHERE r.enabled = 1 AND instr(rp.files, ?1) > 0
             ORDER BY r.priority DESC, rp.id DESC",
            PACKAGE_COLUMNS
        ))?;

        let packages = stmt
            .query_map([&quoted], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(packages
            .into_iter()
            .filter(|pkg| pkg.file_list().map(|f| f.iter().any(|p| p == path)).unwrap_or(false))
            .collect())
    }

    /// Delete all packages for a repository (used when syncing)
    pub fn delete_by_repository(conn: &Connection, repository_id: i64) -> Result<()> {
        conn.execute(
            "DELETE FROM repository_packages WHERE repository_id = ?1",
            [repository_id],
        )?;
        Ok(())
    }

    /// Required trove names
    pub fn requirement_list(&self) -> Result<Vec<String>> {
        decode_list(self.requires.as_deref())
    }

    /// Paths shipped by the trove
    pub fn file_list(&self) -> Result<Vec<String>> {
        decode_list(self.files.as_deref())
    }

    /// The package as a reconciler record
    pub fn to_record(&self) -> PackageRecord {
        PackageRecord::new(&self.name, &self.version, &self.flavor)
            .with_field(keys::SUMMARY, self.summary.clone())
            .with_field(keys::DESCRIPTION, self.description.clone())
            .with_field(keys::URL, self.url.clone())
            .with_field(keys::LICENSES, self.licenses.clone())
            .with_field(keys::CATEGORY, self.category.clone())
            .with_field(keys::LABEL, self.label.clone())
            .with_field(keys::SIZE, Some(self.size.to_string()))
    }

    /// Convert a database row to a RepositoryPackage
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            repository_id: row.get(1)?,
            name: row.get(2)?,
            version: row.get(3)?,
            flavor: row.get(4)?,
            label: row.get(5)?,
            summary: row.get(6)?,
            description: row.get(7)?,
            url: row.get(8)?,
            licenses: row.get(9)?,
            category: row.get(10)?,
            size: row.get(11)?,
            requires: row.get(12)?,
            files: row.get(13)?,
            synced_at: row.get(14)?,
            priority: row.get(15)?,
        })
    }
}

/// Encode a list for a JSON column; empty lists are stored as NULL
pub fn encode_list(items: &[String]) -> Result<Option<String>> {
    if items.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(items)
        .map(Some)
        .map_err(|e| Error::ParseError(format!("Failed to encode list: {}", e)))
}

fn decode_list(column: Option<&str>) -> Result<Vec<String>> {
    match column {
        None | Some("") => Ok(Vec::new()),
        Some(json) => serde_json::from_str(json)
            .map_err(|e| Error::ParseError(format!("Invalid list column: {}", e))),
    }
}

/// Escape `LIKE` wildcards so the pattern matches literally (with `ESCAPE '\'`)
fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
