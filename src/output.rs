// src/output.rs

//! Backend output channel
//!
//! Every result the backend produces is an [`Event`] handed to an
//! [`Emitter`]. The command-line helper writes them as tab-separated lines on
//! stdout; tests collect them with [`RecordingEmitter`].

use crate::error::Result;
use std::fmt;
use std::io::Write;

/// Declares a text-backed enum with `as_str` and `Display`
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(
    /// Per-package info reported with a `package` line
    Info {
        Installed => "installed",
        Available => "available",
        Normal => "normal",
        Security => "security",
        Installing => "installing",
        Removing => "removing",
        Updating => "updating",
    }
);

text_enum!(
    /// Transaction status
    Status {
        Info => "info",
        Query => "query",
        Running => "running",
        Install => "install",
        Remove => "remove",
        Update => "update",
        RefreshCache => "refresh-cache",
    }
);

text_enum!(
    /// What has to be restarted after a transaction
    Restart {
        None => "none",
        Application => "application",
        System => "system",
    }
);

text_enum!(
    /// Stability of the branch an update comes from
    UpdateState {
        Stable => "stable",
        Testing => "testing",
        Unstable => "unstable",
    }
);

text_enum!(
    /// Informational messages
    MessageKind {
        CouldNotFindPackage => "could-not-find-package",
    }
);

text_enum!(
    /// PackageKit error codes
    ErrorCode {
        DepResolutionFailed => "dep-resolution-failed",
        PackageNotFound => "package-not-found",
        PackageAlreadyInstalled => "package-already-installed",
        NoPackagesToUpdate => "no-packages-to-update",
        PackageIdInvalid => "package-id-invalid",
        FilterInvalid => "filter-invalid",
        NoNetwork => "no-network",
        InternalError => "internal-error",
        Unknown => "unknown",
    }
);

/// Update detail fields reported for a single package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDetail {
    pub package_id: String,
    pub updates: String,
    pub obsoletes: String,
    pub vendor_url: String,
    pub bugzilla_url: String,
    pub cve_url: String,
    pub restart: Restart,
    pub update_text: String,
    pub changelog: String,
    pub state: UpdateState,
    pub issued: String,
    pub updated: String,
}

/// One emission from the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Package {
        info: Info,
        package_id: String,
        summary: String,
    },
    Details {
        package_id: String,
        license: String,
        group: String,
        description: String,
        url: String,
        size: i64,
    },
    Files {
        package_id: String,
        files: Vec<String>,
    },
    UpdateDetail(Box<UpdateDetail>),
    RepoDetail {
        repo_id: String,
        description: String,
        enabled: bool,
    },
    Status(Status),
    Percentage(Option<u8>),
    AllowCancel(bool),
    RequireRestart {
        restart: Restart,
        details: String,
    },
    Message {
        kind: MessageKind,
        details: String,
    },
    Error {
        code: ErrorCode,
        details: String,
    },
    Finished,
}

/// Sink for backend events
pub trait Emitter {
    fn emit(&mut self, event: Event) -> Result<()>;
}

impl<E: Emitter + ?Sized> Emitter for &mut E {
    fn emit(&mut self, event: Event) -> Result<()> {
        (**self).emit(event)
    }
}

/// Collects events in memory
#[derive(Debug, Default)]
pub struct RecordingEmitter {
    pub events: Vec<Event>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(info, package_id)` of every package event, in order
    pub fn packages(&self) -> Vec<(Info, String)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Package {
                    info, package_id, ..
                } => Some((*info, package_id.clone())),
                _ => None,
            })
            .collect()
    }
}

impl Emitter for RecordingEmitter {
    fn emit(&mut self, event: Event) -> Result<()> {
        self.events.push(event);
        Ok(())
    }
}

/// Writes events as tab-separated lines
pub struct LineEmitter<W: Write> {
    writer: W,
}

impl<W: Write> LineEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Emitter for LineEmitter<W> {
    fn emit(&mut self, event: Event) -> Result<()> {
        let line = format_event(&event);
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Render one event as a protocol line
pub fn format_event(event: &Event) -> String {
    let fields: Vec<String> = match event {
        Event::Package {
            info,
            package_id,
            summary,
        } => vec![
            "package".into(),
            info.to_string(),
            package_id.clone(),
            summary.clone(),
        ],
        Event::Details {
            package_id,
            license,
            group,
            description,
            url,
            size,
        } => vec![
            "details".into(),
            package_id.clone(),
            license.clone(),
            group.clone(),
            description.clone(),
            url.clone(),
            size.to_string(),
        ],
        Event::Files { package_id, files } => {
            vec!["files".into(), package_id.clone(), files.join(";")]
        }
        Event::UpdateDetail(detail) => vec![
            "updatedetail".into(),
            detail.package_id.clone(),
            detail.updates.clone(),
            detail.obsoletes.clone(),
            detail.vendor_url.clone(),
            detail.bugzilla_url.clone(),
            detail.cve_url.clone(),
            detail.restart.to_string(),
            detail.update_text.clone(),
            detail.changelog.clone(),
            detail.state.to_string(),
            detail.issued.clone(),
            detail.updated.clone(),
        ],
        Event::RepoDetail {
            repo_id,
            description,
            enabled,
        } => vec![
            "repo-detail".into(),
            repo_id.clone(),
            description.clone(),
            enabled.to_string(),
        ],
        Event::Status(status) => vec!["status".into(), status.to_string()],
        Event::Percentage(Some(value)) => vec!["percentage".into(), value.to_string()],
        Event::Percentage(None) => vec!["no-percentage-updates".into()],
        Event::AllowCancel(allow) => vec!["allow-cancel".into(), allow.to_string()],
        Event::RequireRestart { restart, details } => vec![
            "requirerestart".into(),
            restart.to_string(),
            details.clone(),
        ],
        Event::Message { kind, details } => {
            vec!["message".into(), kind.to_string(), details.clone()]
        }
        Event::Error { code, details } => vec!["error".into(), code.to_string(), details.clone()],
        Event::Finished => vec!["finished".into()],
    };

    fields
        .iter()
        .map(|field| squash(field))
        .collect::<Vec<_>>()
        .join("\t")
}

/// Keep a field on one line: newlines become spaces, tabs are dropped
fn squash(field: &str) -> String {
    field
        .chars()
        .filter(|c| *c != '\t')
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_line() {
        let line = format_event(&Event::Package {
            info: Info::Installed,
            package_id: "gimp;2.6-1-1;x86_64;fl:2".to_string(),
            summary: "Image editor".to_string(),
        });
        assert_eq!(line, "package\tinstalled\tgimp;2.6-1-1;x86_64;fl:2\tImage editor");
    }

    #[test]
    fn test_fields_are_squashed() {
        let line = format_event(&Event::Error {
            code: ErrorCode::Unknown,
            details: "first line\nsecond\tline".to_string(),
        });
        assert_eq!(line, "error\tunknown\tfirst line secondline");
    }

    #[test]
    fn test_percentage_lines() {
        assert_eq!(format_event(&Event::Percentage(Some(40))), "percentage\t40");
        assert_eq!(format_event(&Event::Percentage(None)), "no-percentage-updates");
    }

    #[test]
    fn test_line_emitter_writes_lines() {
        let mut emitter = LineEmitter::new(Vec::new());
        emitter.emit(Event::Status(Status::Query)).unwrap();
        emitter.emit(Event::Finished).unwrap();
        let text = String::from_utf8(emitter.into_inner()).unwrap();
        assert_eq!(text, "status\tquery\nfinished\n");
    }

    #[test]
    fn test_recording_emitter_packages() {
        let mut emitter = RecordingEmitter::new();
        emitter.emit(Event::Status(Status::Info)).unwrap();
        emitter
            .emit(Event::Package {
                info: Info::Available,
                package_id: "a;1;x86;".to_string(),
                summary: "A".to_string(),
            })
            .unwrap();
        assert_eq!(
            emitter.packages(),
            vec![(Info::Available, "a;1;x86;".to_string())]
        );
    }
}
