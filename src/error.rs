// src/error.rs

use crate::output::ErrorCode;
use thiserror::Error;

/// Core error types for the Conary PackageKit backend
#[derive(Error, Debug)]
pub enum Error {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML errors while reading channel metadata
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Database initialization error
    #[error("Failed to initialize database: {0}")]
    InitError(String),

    /// Database not found
    #[error("Database not found at path: {0}")]
    DatabaseNotFound(String),

    /// Channel metadata download failed
    #[error("Download error: {0}")]
    DownloadError(String),

    /// Malformed metadata, timestamps or JSON columns
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Requested package or channel does not exist
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Channel already exists
    #[error("Conflict: {0}")]
    ConflictError(String),

    /// Package id is not `name;version;arch;data`
    #[error("Invalid package id: {0}")]
    InvalidPackageId(String),

    /// Unknown PackageKit filter name
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Requirements that no channel can satisfy
    #[error("This package depends on: {}", .0.join(", "))]
    DependencyResolution(Vec<String>),

    /// Removal would break installed packages
    #[error("Removing {package} would break: {}", .dependents.join(", "))]
    WouldBreak {
        package: String,
        dependents: Vec<String>,
    },

    /// No update candidates to apply
    #[error("No packages to update")]
    NoPackagesToUpdate,

    /// Package is already installed
    #[error("Package already installed: {0}")]
    AlreadyInstalled(String),
}

impl Error {
    /// PackageKit error code reported for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::DependencyResolution(_) | Error::WouldBreak { .. } => {
                ErrorCode::DepResolutionFailed
            }
            Error::NotFoundError(_) => ErrorCode::PackageNotFound,
            Error::AlreadyInstalled(_) => ErrorCode::PackageAlreadyInstalled,
            Error::NoPackagesToUpdate => ErrorCode::NoPackagesToUpdate,
            Error::InvalidPackageId(_) => ErrorCode::PackageIdInvalid,
            Error::InvalidFilter(_) => ErrorCode::FilterInvalid,
            Error::DownloadError(_) => ErrorCode::NoNetwork,
            Error::Database(_) | Error::InitError(_) | Error::DatabaseNotFound(_) => {
                ErrorCode::InternalError
            }
            Error::Io(_) | Error::Xml(_) | Error::ParseError(_) | Error::ConflictError(_) => {
                ErrorCode::Unknown
            }
        }
    }
}

/// Result type alias using the backend's Error type
pub type Result<T> = std::result::Result<T, Error>;
