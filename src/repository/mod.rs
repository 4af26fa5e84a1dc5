// src/repository/mod.rs

//! Channel management and the metadata cache
//!
//! This module provides functionality for:
//! - Managing channels (Conary labels and their metadata URLs)
//! - Downloading and synchronizing channel metadata
//! - Searching the cached metadata by name, details or group

pub mod metadata;

use crate::db;
use crate::db::models::{Repository, RepositoryPackage, encode_list};
use crate::error::{Error, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use rusqlite::Connection;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

pub use metadata::{PackageMetadata, parse_metadata};

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum retry attempts for failed downloads
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

/// Metadata file names tried, in order, when a channel URL names a directory
const METADATA_FILES: [&str; 2] = ["packages.xml.gz", "packages.xml"];

/// HTTP/file client for channel metadata
pub struct MetadataClient {
    client: Client,
    max_retries: u32,
}

impl MetadataClient {
    /// Create a new metadata client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
        })
    }

    /// Fetch and parse the metadata published at `url`
    ///
    /// `url` may be an `http(s)` URL, a `file://` URL or a plain path, and may
    /// name either the metadata file itself or the directory holding it.
    pub fn fetch_metadata(&self, url: &str) -> Result<Vec<PackageMetadata>> {
        let payload = if let Some(path) = local_path(url) {
            self.read_local(&path)?
        } else {
            self.download(url)?
        };

        let xml = metadata::decode_payload(&payload)?;
        parse_metadata(&xml)
    }

    fn read_local(&self, path: &Path) -> Result<Vec<u8>> {
        if path.is_file() {
            debug!("Reading channel metadata from {}", path.display());
            return Ok(fs::read(path)?);
        }

        for name in METADATA_FILES {
            let candidate = path.join(name);
            if candidate.is_file() {
                debug!("Reading channel metadata from {}", candidate.display());
                return Ok(fs::read(candidate)?);
            }
        }

        Err(Error::NotFoundError(format!(
            "No channel metadata found at {}",
            path.display()
        )))
    }

    fn download(&self, url: &str) -> Result<Vec<u8>> {
        if url.ends_with(".xml") || url.ends_with(".xml.gz") {
            return self
                .get_with_retry(url)?
                .ok_or_else(|| Error::DownloadError(format!("HTTP 404 from {}", url)));
        }

        for name in METADATA_FILES {
            let metadata_url = if url.ends_with('/') {
                format!("{}{}", url, name)
            } else {
                format!("{}/{}", url, name)
            };

            if let Some(bytes) = self.get_with_retry(&metadata_url)? {
                return Ok(bytes);
            }
            debug!("No metadata at {}", metadata_url);
        }

        Err(Error::DownloadError(format!(
            "No channel metadata found under {}",
            url
        )))
    }

    /// GET with retry; `Ok(None)` when the server answers 404
    fn get_with_retry(&self, url: &str) -> Result<Option<Vec<u8>>> {
        info!("Fetching channel metadata from {}", url);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url).send() {
                Ok(response) => {
                    if response.status() == StatusCode::NOT_FOUND {
                        return Ok(None);
                    }
                    if !response.status().is_success() {
                        return Err(Error::DownloadError(format!(
                            "HTTP {} from {}",
                            response.status(),
                            url
                        )));
                    }

                    let bytes = response.bytes().map_err(|e| {
                        Error::DownloadError(format!("Failed to read response: {}", e))
                    })?;
                    return Ok(Some(bytes.to_vec()));
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(Error::DownloadError(format!(
                            "Failed to fetch metadata after {} attempts: {}",
                            attempt, e
                        )));
                    }
                    warn!("Metadata fetch attempt {} failed: {}, retrying...", attempt, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        }
    }
}

/// Local filesystem path named by a channel URL, if it is not remote
fn local_path(url: &str) -> Option<PathBuf> {
    if let Some(path) = url.strip_prefix("file://") {
        return Some(PathBuf::from(path));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        return None;
    }
    Some(PathBuf::from(url))
}

/// Synchronize a channel's metadata into the cache
///
/// The channel's cached packages are replaced in one transaction.
pub fn sync_repository(conn: &mut Connection, repo: &mut Repository) -> Result<usize> {
    info!("Synchronizing channel: {}", repo.name);

    let repo_id = repo
        .id
        .ok_or_else(|| Error::InitError("Cannot sync channel without ID".to_string()))?;

    let client = MetadataClient::new()?;
    let packages = client.fetch_metadata(&repo.url)?;

    repo.last_sync = Some(current_timestamp());

    let count = db::transaction(conn, |tx| {
        RepositoryPackage::delete_by_repository(tx, repo_id)?;

        // Entries repeating a (name, version, flavor) collapse into one row
        let mut stored = HashSet::new();
        for pkg_meta in &packages {
            let mut repo_pkg = RepositoryPackage::new(
                repo_id,
                pkg_meta.name.clone(),
                pkg_meta.version.clone(),
                pkg_meta.flavor.clone(),
            );
            repo_pkg.label = pkg_meta.label.clone();
            repo_pkg.summary = pkg_meta.summary.clone();
            repo_pkg.description = pkg_meta.description.clone();
            repo_pkg.url = pkg_meta.url.clone();
            repo_pkg.licenses = (!pkg_meta.licenses.is_empty()).then(|| pkg_meta.licenses.join(" "));
            repo_pkg.category = pkg_meta.category.clone();
            repo_pkg.size = pkg_meta.size;
            repo_pkg.requires = encode_list(&pkg_meta.requires)?;
            repo_pkg.files = encode_list(&pkg_meta.files)?;

            repo_pkg.insert(tx)?;
            stored.insert((&pkg_meta.name, &pkg_meta.version, &pkg_meta.flavor));
        }

        repo.update(tx)?;
        Ok(stored.len())
    })?;

    info!("Synchronized {} packages from channel {}", count, repo.name);
    Ok(count)
}

/// Check if channel metadata needs refresh
pub fn needs_sync(repo: &Repository) -> bool {
    match &repo.last_sync {
        None => true, // Never synced
        Some(last_sync) => match parse_timestamp(last_sync) {
            Ok(last_sync_time) => {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);

                let Ok(expire) = u64::try_from(repo.metadata_expire) else {
                    return true;
                };
                now.saturating_sub(last_sync_time) > expire
            }
            Err(_) => true, // If we can't parse timestamp, force sync
        },
    }
}

/// Get current timestamp as ISO 8601 string
fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Parse ISO 8601 timestamp to Unix seconds
fn parse_timestamp(timestamp: &str) -> Result<u64> {
    use chrono::DateTime;

    let dt = DateTime::parse_from_rfc3339(timestamp)
        .map_err(|e| Error::ParseError(format!("Invalid timestamp: {}", e)))?;

    u64::try_from(dt.timestamp())
        .map_err(|_| Error::ParseError(format!("Timestamp before the epoch: {}", timestamp)))
}

/// Add a new channel to the database
pub fn add_repository(
    conn: &Connection,
    name: String,
    url: String,
    enabled: bool,
    priority: i32,
) -> Result<Repository> {
    if Repository::find_by_name(conn, &name)?.is_some() {
        return Err(Error::ConflictError(format!(
            "Channel '{}' already exists",
            name
        )));
    }

    let mut repo = Repository::new(name, url);
    repo.enabled = enabled;
    repo.priority = priority;

    repo.insert(conn)?;

    info!("Added channel: {} ({})", repo.name, repo.url);
    Ok(repo)
}

/// Remove a channel and its cached packages
pub fn remove_repository(conn: &Connection, name: &str) -> Result<()> {
    let repo = find_repository(conn, name)?;

    if let Some(id) = repo.id {
        Repository::delete(conn, id)?;
    }
    info!("Removed channel: {}", name);
    Ok(())
}

/// Enable or disable a channel
pub fn set_repository_enabled(conn: &Connection, name: &str, enabled: bool) -> Result<()> {
    let mut repo = find_repository(conn, name)?;

    repo.enabled = enabled;
    repo.update(conn)?;

    info!(
        "Channel '{}' {}",
        name,
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

fn find_repository(conn: &Connection, name: &str) -> Result<Repository> {
    Repository::find_by_name(conn, name)?
        .ok_or_else(|| Error::NotFoundError(format!("Channel '{}' not found", name)))
}

/// Where a search looks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Package names
    Name,
    /// Names, summaries and descriptions
    Details,
    /// PackageKit group of the package category
    Group,
    /// Every cached package
    All,
}

impl SearchScope {
    pub fn as_str(&self) -> &str {
        match self {
            SearchScope::Name => "name",
            SearchScope::Details => "details",
            SearchScope::Group => "group",
            SearchScope::All => "all",
        }
    }
}

/// Search the metadata cache of enabled channels
///
/// Returns one entry per package name (the best channel's), ordered by name.
pub fn search(
    conn: &Connection,
    terms: &str,
    scope: SearchScope,
) -> Result<Vec<RepositoryPackage>> {
    debug!("Searching {} for '{}'", scope.as_str(), terms);

    let packages = match scope {
        SearchScope::Name => RepositoryPackage::search(conn, terms, false)?,
        SearchScope::Details => RepositoryPackage::search(conn, terms, true)?,
        SearchScope::Group => RepositoryPackage::list_enabled(conn)?
            .into_iter()
            .filter(|pkg| group_for_category(pkg.category.as_deref()).eq_ignore_ascii_case(terms))
            .collect(),
        SearchScope::All => RepositoryPackage::list_enabled(conn)?,
    };

    let mut seen = HashSet::new();
    Ok(packages
        .into_iter()
        .filter(|pkg| seen.insert(pkg.name.clone()))
        .collect())
}

/// PackageKit group for a Conary category
///
/// Categories may be hierarchical (`Desktop/Graphics`); the most specific
/// known component wins.
pub fn group_for_category(category: Option<&str>) -> &'static str {
    let Some(category) = category else {
        return "unknown";
    };

    category
        .rsplit(['/', ':'])
        .map(|part| group_for_component(part.trim()))
        .find(|group| *group != "unknown")
        .unwrap_or("unknown")
}

fn group_for_component(component: &str) -> &'static str {
    match component.to_ascii_lowercase().as_str() {
        "accessories" | "utility" | "utilities" => "accessories",
        "admin" | "administration" | "settings" => "admin-tools",
        "communication" | "chat" | "email" => "communication",
        "desktop" | "gnome" | "kde" | "xfce" => "desktop-other",
        "development" | "devel" | "programming" => "programming",
        "documentation" | "docs" => "documentation",
        "education" => "education",
        "electronics" => "electronics",
        "fonts" => "fonts",
        "games" | "game" => "games",
        "graphics" => "graphics",
        "internet" | "network" | "networking" | "web" => "internet",
        "legacy" => "legacy",
        "localization" | "l10n" | "i18n" => "localization",
        "maps" => "maps",
        "multimedia" | "audio" | "video" | "audiovideo" => "multimedia",
        "office" => "office",
        "publishing" => "publishing",
        "science" => "science",
        "security" => "security",
        "servers" | "server" => "servers",
        "system" | "base" => "system",
        "virtualization" => "virtualization",
        _ => "unknown",
    }
}
