// src/lib.rs

//! Conary PackageKit backend
//!
//! Implements the PackageKit backend operations (search, resolve, install,
//! remove, update, details ...) on top of the Conary trove database and the
//! metadata cache of its channels.
//!
//! # Architecture
//!
//! - Database-first: installed troves, changesets and the channel cache all
//!   live in SQLite
//! - `source`: the seam between PackageKit operations and the package system
//! - `reconcile`: merges installed and available results under the user's
//!   filters
//! - `output`: the line protocol spoken to PackageKit

pub mod backend;
pub mod config;
pub mod db;
mod error;
pub mod filter;
pub mod flavor;
pub mod output;
pub mod package_id;
pub mod reconcile;
pub mod repository;
pub mod source;
pub mod version;

pub use backend::Backend;
pub use config::BackendConfig;
pub use error::{Error, Result};
pub use filter::{Filter, FilterSet};
pub use package_id::PackageId;
pub use reconcile::{InstallationState, PackageRecord, ResultEntry, ResultReconciler};
pub use source::{DbSource, PackageSource};
