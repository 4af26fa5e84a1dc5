// src/filter.rs

//! PackageKit filter sets
//!
//! PackageKit passes filters as a `;`-separated list such as
//! `installed;~devel;newest`, or `none` for no filtering. Only the
//! installed/available pair changes which results a query returns; the rest
//! are parsed so that callers get a precise error for unknown names.

use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A single PackageKit filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Filter {
    Installed,
    NotInstalled,
    Devel,
    NotDevel,
    Gui,
    NotGui,
    Free,
    NotFree,
    Visible,
    NotVisible,
    Supported,
    NotSupported,
    Basename,
    NotBasename,
    Newest,
    NotNewest,
    Arch,
    NotArch,
    Source,
    NotSource,
}

impl Filter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::Installed => "installed",
            Filter::NotInstalled => "~installed",
            Filter::Devel => "devel",
            Filter::NotDevel => "~devel",
            Filter::Gui => "gui",
            Filter::NotGui => "~gui",
            Filter::Free => "free",
            Filter::NotFree => "~free",
            Filter::Visible => "visible",
            Filter::NotVisible => "~visible",
            Filter::Supported => "supported",
            Filter::NotSupported => "~supported",
            Filter::Basename => "basename",
            Filter::NotBasename => "~basename",
            Filter::Newest => "newest",
            Filter::NotNewest => "~newest",
            Filter::Arch => "arch",
            Filter::NotArch => "~arch",
            Filter::Source => "source",
            Filter::NotSource => "~source",
        }
    }
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let filter = match s {
            "installed" => Filter::Installed,
            "~installed" => Filter::NotInstalled,
            "devel" => Filter::Devel,
            "~devel" => Filter::NotDevel,
            "gui" => Filter::Gui,
            "~gui" => Filter::NotGui,
            "free" => Filter::Free,
            "~free" => Filter::NotFree,
            "visible" => Filter::Visible,
            "~visible" => Filter::NotVisible,
            "supported" => Filter::Supported,
            "~supported" => Filter::NotSupported,
            "basename" => Filter::Basename,
            "~basename" => Filter::NotBasename,
            "newest" => Filter::Newest,
            "~newest" => Filter::NotNewest,
            "arch" => Filter::Arch,
            "~arch" => Filter::NotArch,
            "source" => Filter::Source,
            "~source" => Filter::NotSource,
            other => return Err(Error::InvalidFilter(other.to_string())),
        };
        Ok(filter)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of filters supplied with a query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    filters: BTreeSet<Filter>,
}

impl FilterSet {
    /// The empty set: no restriction
    pub fn none() -> Self {
        Self::default()
    }

    pub fn contains(&self, filter: Filter) -> bool {
        self.filters.contains(&filter)
    }

    pub fn insert(&mut self, filter: Filter) {
        self.filters.insert(filter);
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Only installed packages were requested
    ///
    /// Asking for both installed and not-installed is the same as asking for
    /// neither.
    pub fn only_installed(&self) -> bool {
        self.contains(Filter::Installed) && !self.contains(Filter::NotInstalled)
    }

    /// Only packages that are not installed were requested
    pub fn only_available(&self) -> bool {
        self.contains(Filter::NotInstalled) && !self.contains(Filter::Installed)
    }
}

impl FromIterator<Filter> for FilterSet {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        Self {
            filters: iter.into_iter().collect(),
        }
    }
}

impl FromStr for FilterSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "none" {
            return Ok(Self::none());
        }

        trimmed
            .split(';')
            .filter(|part| !part.is_empty())
            .map(str::parse::<Filter>)
            .collect()
    }
}

impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.filters.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.filters.iter().map(Filter::as_str).collect();
        f.write_str(&names.join(";"))
    }
}
