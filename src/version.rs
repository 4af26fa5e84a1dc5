// src/version.rs

//! Conary version strings
//!
//! A full Conary version looks like
//! `/conary.rpath.com@rpl:devel//2/1.2.3-4-0.1`: a branch made of one or
//! more labels followed by a trailing revision `upstream-source-build`.
//! Frozen versions carry a timestamp before the revision
//! (`/label/1234567890.000:1.2.3-4-1`).

use std::cmp::Ordering;

/// Return the trailing revision of a Conary version string
///
/// Strings without a `/` are treated as a bare revision.
pub fn trailing_revision(version: &str) -> &str {
    let last = version.rsplit('/').next().unwrap_or(version);
    match last.split_once(':') {
        Some((stamp, revision)) if is_timestamp(stamp) => revision,
        _ => last,
    }
}

/// Return the label the trailing revision was built on
pub fn label(version: &str) -> Option<&str> {
    if !version.starts_with('/') {
        return None;
    }

    let mut parts = version.split('/').filter(|p| !p.is_empty()).rev();
    parts.next()?;
    parts.next().filter(|part| part.contains('@'))
}

/// Compare two trailing revisions
///
/// The upstream version is compared first, then the source count, then the
/// build count. Each part is compared segment by segment.
pub fn compare_revisions(a: &str, b: &str) -> Ordering {
    let (a_upstream, a_source, a_build) = split_revision(trailing_revision(a));
    let (b_upstream, b_source, b_build) = split_revision(trailing_revision(b));

    compare_segments(a_upstream, b_upstream)
        .then_with(|| compare_segments(a_source, b_source))
        .then_with(|| compare_segments(a_build, b_build))
}

fn is_timestamp(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// Split `upstream-source-build`; missing counts compare as empty
fn split_revision(revision: &str) -> (&str, &str, &str) {
    let mut parts = revision.rsplitn(3, '-');
    let last = parts.next().unwrap_or("");
    match (parts.next(), parts.next()) {
        (Some(source), Some(upstream)) => (upstream, source, last),
        (Some(upstream), None) => (upstream, last, ""),
        _ => (last, "", ""),
    }
}

/// rpmvercmp-style comparison of alphanumeric segments
fn compare_segments(a: &str, b: &str) -> Ordering {
    let a_segments = segments(a);
    let b_segments = segments(b);

    for (x, y) in a_segments.iter().zip(b_segments.iter()) {
        let x_numeric = x.chars().all(|c| c.is_ascii_digit());
        let y_numeric = y.chars().all(|c| c.is_ascii_digit());

        let ordering = match (x_numeric, y_numeric) {
            (true, true) => {
                let x = x.trim_start_matches('0');
                let y = y.trim_start_matches('0');
                x.len().cmp(&y.len()).then_with(|| x.cmp(y))
            }
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => x.cmp(y),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    a_segments.len().cmp(&b_segments.len())
}

fn segments(s: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut start = None;
    let mut numeric = false;

    for (i, c) in s.char_indices() {
        if !c.is_ascii_alphanumeric() {
            if let Some(begin) = start.take() {
                result.push(&s[begin..i]);
            }
            continue;
        }

        match start {
            Some(begin) if c.is_ascii_digit() != numeric => {
                result.push(&s[begin..i]);
                start = Some(i);
                numeric = c.is_ascii_digit();
            }
            Some(_) => {}
            None => {
                start = Some(i);
                numeric = c.is_ascii_digit();
            }
        }
    }

    if let Some(begin) = start {
        result.push(&s[begin..]);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_revision() {
        assert_eq!(
            trailing_revision("/conary.rpath.com@rpl:devel//2/1.2.3-4-0.1"),
            "1.2.3-4-0.1"
        );
        assert_eq!(
            trailing_revision("/foresight.rpath.org@fl:2/1234567890.000:2.6.8-1-1"),
            "2.6.8-1-1"
        );
        assert_eq!(trailing_revision("1.0-1-1"), "1.0-1-1");
    }

    #[test]
    fn test_label() {
        assert_eq!(
            label("/foresight.rpath.org@fl:2/2.6.8-1-1"),
            Some("foresight.rpath.org@fl:2")
        );
        assert_eq!(
            label("/conary.rpath.com@rpl:devel//foresight.rpath.org@fl:2-qa/1.0-1-0.1"),
            Some("foresight.rpath.org@fl:2-qa")
        );
        assert_eq!(label("1.0-1-1"), None);
    }

    #[test]
    fn test_compare_upstream() {
        assert_eq!(compare_revisions("1.10-1-1", "1.9-1-1"), Ordering::Greater);
        assert_eq!(compare_revisions("2.0-1-1", "2.0.1-1-1"), Ordering::Less);
        assert_eq!(compare_revisions("1.0a-1-1", "1.0-1-1"), Ordering::Greater);
        assert_eq!(compare_revisions("1.0-1-1", "1.0-1-1"), Ordering::Equal);
    }

    #[test]
    fn test_compare_counts() {
        assert_eq!(compare_revisions("1.0-2-1", "1.0-1-5"), Ordering::Greater);
        assert_eq!(compare_revisions("1.0-1-0.2", "1.0-1-0.1"), Ordering::Greater);
        assert_eq!(
            compare_revisions("/a@b:c/1.0-1-2", "/a@b:c/1234.000:1.0-1-1"),
            Ordering::Greater
        );
    }

    #[test]
    fn test_numeric_beats_alpha() {
        assert_eq!(compare_revisions("1.0.1-1-1", "1.0.beta-1-1"), Ordering::Greater);
    }
}
