// src/reconcile.rs

//! Result reconciliation
//!
//! A query against the backend produces two lists: troves found in the local
//! database and troves found in the configured channels. `ResultReconciler`
//! stages both lists and turns them into the ordered list that is reported to
//! PackageKit, honouring the installed / not-installed filters.
//!
//! A reconciler is built for one query and dropped afterwards; nothing is
//! shared between queries.

use crate::filter::FilterSet;
use std::collections::BTreeMap;

/// Well-known metadata keys carried by a [`PackageRecord`]
pub mod keys {
    pub const SUMMARY: &str = "summary";
    pub const DESCRIPTION: &str = "description";
    pub const URL: &str = "url";
    pub const LICENSES: &str = "licenses";
    pub const CATEGORY: &str = "category";
    pub const LABEL: &str = "label";
    pub const SIZE: &str = "size";
}

/// A package identified by name, version and flavor, plus its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    name: String,
    version: String,
    flavor: String,
    metadata: BTreeMap<String, Option<String>>,
}

impl PackageRecord {
    /// Create a record with no metadata
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        flavor: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            flavor: flavor.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Return the record with one metadata field set
    pub fn with_field(mut self, key: &str, value: Option<String>) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    /// Return the record with metadata from `other` layered over its own
    ///
    /// Fields that are absent or `None` in `other` keep their current value.
    pub fn with_metadata_from(mut self, other: &PackageRecord) -> Self {
        for (key, value) in &other.metadata {
            if value.is_some() || !self.metadata.contains_key(key) {
                self.metadata.insert(key.clone(), value.clone());
            }
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn flavor(&self) -> &str {
        &self.flavor
    }

    /// Value of a metadata field, if present and set
    pub fn field(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_deref())
    }
}

/// Whether a record came from the local database or from a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallationState {
    Installed,
    Available,
}

/// One reconciled result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    pub record: PackageRecord,
    pub state: InstallationState,
}

/// Stages installed and available records for a single query
#[derive(Debug, Default)]
pub struct ResultReconciler {
    installed: Vec<PackageRecord>,
    available: Vec<PackageRecord>,
}

impl ResultReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage records found in the local database
    pub fn add_installed<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = PackageRecord>,
    {
        self.installed.extend(records);
    }

    /// Stage records found in a channel
    pub fn add_available<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = PackageRecord>,
    {
        self.available.extend(records);
    }

    /// Number of staged records across both lists
    pub fn staged(&self) -> usize {
        self.installed.len() + self.available.len()
    }

    /// Produce the ordered result list for `filters`
    ///
    /// Installed entries come first, then available ones, each in staging
    /// order. No deduplication happens: a record staged twice is reported
    /// twice.
    pub fn reconcile(&self, filters: &FilterSet) -> Vec<ResultEntry> {
        let include_installed = !filters.only_available();
        let include_available = !filters.only_installed();

        let installed = self
            .installed
            .iter()
            .filter(|_| include_installed)
            .map(|record| ResultEntry {
                record: record.clone(),
                state: InstallationState::Installed,
            });

        let available = self
            .available
            .iter()
            .filter(|_| include_available)
            .map(|record| ResultEntry {
                record: record.clone(),
                state: InstallationState::Available,
            });

        installed.chain(available).collect()
    }
}
