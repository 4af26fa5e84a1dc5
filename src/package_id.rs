// src/package_id.rs

//! PackageKit package identifiers
//!
//! PackageKit names a package as `name;version;arch;data`. The version is
//! the trove's trailing revision, the arch comes from its flavor and the
//! data field carries the label the trove lives on.

use crate::error::{Error, Result};
use crate::flavor::arch_from_flavor;
use crate::reconcile::{PackageRecord, keys};
use crate::version::trailing_revision;
use std::fmt;
use std::str::FromStr;

/// A parsed PackageKit package id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageId {
    pub name: String,
    pub version: String,
    pub arch: String,
    pub data: String,
}

impl PackageId {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        arch: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            arch: arch.into(),
            data: data.into(),
        }
    }

    /// Build the id PackageKit sees for a record
    pub fn for_record(record: &PackageRecord) -> Self {
        Self::new(
            record.name(),
            trailing_revision(record.version()),
            arch_from_flavor(record.flavor()),
            record.field(keys::LABEL).unwrap_or_default(),
        )
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{};{};{}", self.name, self.version, self.arch, self.data)
    }
}

impl FromStr for PackageId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(';').collect();
        match parts.as_slice() {
            [name, version, arch, data] if !name.is_empty() => {
                Ok(Self::new(*name, *version, *arch, *data))
            }
            _ => Err(Error::InvalidPackageId(s.to_string())),
        }
    }
}

/// One-line summary shown next to a package
///
/// Channels often publish `.` or nothing as the short description; fall back
/// to a readable form of the name in that case.
pub fn display_summary(record: &PackageRecord) -> String {
    match record.field(keys::SUMMARY) {
        Some(summary) if !summary.is_empty() && summary != "." => summary.to_string(),
        _ => capitalize(&record.name().replace('-', " ")),
    }
}

/// Upper-case the first character and lower-case the rest
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let id: PackageId = "dpaster;0.1-3-1;x86;foresight.rpath.org@fl:2"
            .parse()
            .unwrap();
        assert_eq!(id.name, "dpaster");
        assert_eq!(id.version, "0.1-3-1");
        assert_eq!(id.arch, "x86");
        assert_eq!(id.data, "foresight.rpath.org@fl:2");
        assert_eq!(id.to_string(), "dpaster;0.1-3-1;x86;foresight.rpath.org@fl:2");
    }

    #[test]
    fn test_parse_allows_empty_data() {
        let id: PackageId = "gimp;2.6-1-1;x86_64;".parse().unwrap();
        assert_eq!(id.data, "");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            "gimp;2.6".parse::<PackageId>(),
            Err(Error::InvalidPackageId(_))
        ));
        assert!(";1.0;x86;".parse::<PackageId>().is_err());
        assert!("a;b;c;d;e".parse::<PackageId>().is_err());
    }

    #[test]
    fn test_for_record() {
        let record = PackageRecord::new(
            "gimp",
            "/foresight.rpath.org@fl:2/2.6.8-1-1",
            "is: x86(~i486) x86_64",
        )
        .with_field(keys::LABEL, Some("foresight.rpath.org@fl:2".to_string()));
        assert_eq!(
            PackageId::for_record(&record).to_string(),
            "gimp;2.6.8-1-1;x86_64;foresight.rpath.org@fl:2"
        );

        let bare = PackageRecord::new("tzdata", "2010a-1-1", "");
        assert_eq!(PackageId::for_record(&bare).to_string(), "tzdata;2010a-1-1;noarch;");
    }

    #[test]
    fn test_display_summary_fallback() {
        let record = PackageRecord::new("gnome-Terminal", "1", "");
        assert_eq!(display_summary(&record), "Gnome terminal");

        let dotted = record.clone().with_field(keys::SUMMARY, Some(".".to_string()));
        assert_eq!(display_summary(&dotted), "Gnome terminal");

        let real = record.with_field(keys::SUMMARY, Some("A terminal".to_string()));
        assert_eq!(display_summary(&real), "A terminal");
    }
}
