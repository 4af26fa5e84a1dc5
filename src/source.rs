// src/source.rs

//! Package source
//!
//! `PackageSource` is what the backend needs from the package system:
//! queries against the installed database and the channel cache, turning a
//! request into an [`UpdateJob`], and applying that job. [`DbSource`]
//! implements it over the SQLite database.

use crate::config::BackendConfig;
use crate::db;
use crate::db::models::{
    Changeset, ChangesetStatus, DependencyEntry, FileEntry, Repository, RepositoryPackage, Trove,
};
use crate::error::{Error, Result};
use crate::flavor;
use crate::package_id::PackageId;
use crate::reconcile::{PackageRecord, keys};
use crate::repository::{self, SearchScope};
use crate::version::{compare_revisions, trailing_revision};
use rusqlite::Connection;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet, VecDeque};
use tracing::{debug, info};

/// A change asked for by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Install the channel candidate named by the id
    Install(PackageId),
    /// Move the installed trove to the candidate named by the id
    Update(PackageId),
    /// Update every installed trove that has a newer candidate
    UpdateAll,
    /// Erase every installed version of a name
    Erase { name: String, allow_deps: bool },
}

/// One step of an update job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEntry {
    Install(PackageRecord),
    Update {
        from: PackageRecord,
        to: PackageRecord,
    },
    Erase(PackageRecord),
}

impl JobEntry {
    pub fn name(&self) -> &str {
        self.record().name()
    }

    /// The trove the step installs, or the one it erases
    pub fn record(&self) -> &PackageRecord {
        match self {
            JobEntry::Install(record) | JobEntry::Erase(record) => record,
            JobEntry::Update { to, .. } => to,
        }
    }
}

/// An ordered set of install, update and erase steps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateJob {
    pub entries: Vec<JobEntry>,
}

impl UpdateJob {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any step touches `name`
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name() == name)
    }

    /// Human-readable summary, used as the changeset description
    pub fn describe(&self) -> String {
        self.entries
            .iter()
            .map(|entry| match entry {
                JobEntry::Install(record) => format!("Install {}={}", record.name(), record.version()),
                JobEntry::Update { to, .. } => format!("Update {}={}", to.name(), to.version()),
                JobEntry::Erase(record) => format!("Erase {}={}", record.name(), record.version()),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Everything the backend asks of the package system
pub trait PackageSource {
    /// Names of cached packages matching `terms`
    fn search(&self, terms: &str, scope: SearchScope) -> Result<Vec<String>>;

    /// Best cached metadata for a name
    fn metadata(&self, name: &str) -> Result<Option<PackageRecord>>;

    /// Every installed version/flavor of a name
    fn query_installed(&self, name: &str) -> Result<Vec<PackageRecord>>;

    /// Channel candidates for a name, best first
    fn query_available(&self, name: &str) -> Result<Vec<PackageRecord>>;

    /// Name of the trove owning `path`, installed troves first
    fn owner_of_path(&self, path: &str) -> Result<Option<String>>;

    /// Paths shipped by a trove
    fn files(&self, record: &PackageRecord) -> Result<Vec<String>>;

    /// Trove names a trove requires
    fn requirements(&self, record: &PackageRecord) -> Result<Vec<String>>;

    /// `(installed, candidate)` for every trove with a newer candidate
    fn updates(&self) -> Result<Vec<(PackageRecord, PackageRecord)>>;

    /// Turn requests into a job, pulling in missing requirements
    fn prepare(&self, requests: &[Request]) -> Result<UpdateJob>;

    /// Apply a job; `simulate` never writes
    fn apply(&mut self, job: &UpdateJob, simulate: bool) -> Result<()>;

    fn channels(&self) -> Result<Vec<Repository>>;

    fn set_channel_enabled(&mut self, name: &str, enabled: bool) -> Result<()>;

    /// Re-sync stale channels (all enabled channels when `force`);
    /// returns the number of packages synced
    fn refresh(&mut self, force: bool) -> Result<usize>;
}

/// Package source backed by the Conary database
pub struct DbSource {
    conn: Connection,
    system_arch: String,
}

impl DbSource {
    pub fn new(conn: Connection, system_arch: impl Into<String>) -> Self {
        Self {
            conn,
            system_arch: system_arch.into(),
        }
    }

    /// Open the database named by the configuration
    pub fn open(config: &BackendConfig) -> Result<Self> {
        let conn = db::open(&config.db_path)?;
        Ok(Self::new(conn, config.system_arch.clone()))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Compatible candidates: exact arch first, then channel priority, then
    /// newest revision
    fn candidates(&self, name: &str) -> Result<Vec<RepositoryPackage>> {
        let mut packages: Vec<RepositoryPackage> = RepositoryPackage::find_by_name(&self.conn, name)?
            .into_iter()
            .filter(|pkg| flavor::is_compatible(&pkg.flavor, &self.system_arch))
            .collect();

        let arch_rank = |pkg: &RepositoryPackage| {
            (flavor::arch_from_flavor(&pkg.flavor) != self.system_arch) as u8
        };
        packages.sort_by(|a, b| {
            arch_rank(a)
                .cmp(&arch_rank(b))
                .then_with(|| b.priority.cmp(&a.priority))
                .then_with(|| {
                    compare_revisions(trailing_revision(&b.version), trailing_revision(&a.version))
                })
        });

        Ok(packages)
    }

    /// The candidate a package id refers to
    fn find_candidate(&self, id: &PackageId) -> Result<RepositoryPackage> {
        self.candidates(&id.name)?
            .into_iter()
            .find(|pkg| {
                (id.version.is_empty() || trailing_revision(&pkg.version) == id.version)
                    && (id.arch.is_empty() || flavor::arch_from_flavor(&pkg.flavor) == id.arch)
            })
            .ok_or_else(|| Error::NotFoundError(format!("{} {}", id.name, id.version)))
    }

    /// Installed trove with cached metadata filling the gaps
    fn installed_record(&self, trove: &Trove) -> Result<PackageRecord> {
        let own = trove.to_record();
        let cached = match cached_package(&self.conn, &own)? {
            Some(pkg) => Some(pkg.to_record()),
            None => self.metadata(&trove.name)?,
        };

        Ok(match cached {
            Some(meta) => PackageRecord::new(&trove.name, &trove.version, &trove.flavor)
                .with_metadata_from(&meta)
                .with_metadata_from(&own),
            None => own,
        })
    }

    /// Stage an install, or an update when another version is installed
    fn push_target(&self, job: &mut UpdateJob, installed: &[Trove], target: PackageRecord) {
        if job.contains(target.name()) {
            return;
        }
        let entry = match installed.first() {
            Some(from) => JobEntry::Update {
                from: from.to_record(),
                to: target,
            },
            None => JobEntry::Install(target),
        };
        job.entries.push(entry);
    }

    /// Add installs for requirements that are neither installed nor staged
    fn pull_requirements(&self, job: &mut UpdateJob) -> Result<()> {
        let mut queue: VecDeque<PackageRecord> = job
            .entries
            .iter()
            .filter(|entry| !matches!(entry, JobEntry::Erase(_)))
            .map(|entry| entry.record().clone())
            .collect();
        let mut missing = BTreeSet::new();

        while let Some(record) = queue.pop_front() {
            for requirement in self.requirements(&record)? {
                if job.contains(&requirement)
                    || missing.contains(&requirement)
                    || !Trove::find_by_name(&self.conn, &requirement)?.is_empty()
                {
                    continue;
                }

                match self.candidates(&requirement)?.into_iter().next() {
                    Some(candidate) => {
                        debug!("Pulling in {} for {}", requirement, record.name());
                        let dependency = candidate.to_record();
                        queue.push_back(dependency.clone());
                        job.entries.push(JobEntry::Install(dependency));
                    }
                    None => {
                        missing.insert(requirement);
                    }
                }
            }
        }

        if !missing.is_empty() {
            return Err(Error::DependencyResolution(missing.into_iter().collect()));
        }
        Ok(())
    }

    /// Stage erasure of `name`, and of its dependents when `allow_deps`
    fn plan_erase(
        &self,
        job: &mut UpdateJob,
        name: &str,
        allow_deps: bool,
        requested: &HashSet<&str>,
    ) -> Result<()> {
        if Trove::find_by_name(&self.conn, name)?.is_empty() {
            return Err(Error::NotFoundError(format!("{} is not installed", name)));
        }

        let mut pending = VecDeque::from([name.to_string()]);
        while let Some(current) = pending.pop_front() {
            if job.contains(&current) {
                continue;
            }
            for trove in Trove::find_by_name(&self.conn, &current)? {
                job.entries.push(JobEntry::Erase(trove.to_record()));
            }

            let dependents: BTreeSet<String> = DependencyEntry::find_dependents(&self.conn, &current)?
                .into_iter()
                .map(|trove| trove.name)
                .filter(|dependent| {
                    dependent != &current
                        && !job.contains(dependent)
                        && !requested.contains(dependent.as_str())
                })
                .collect();

            if dependents.is_empty() {
                continue;
            }
            if !allow_deps {
                return Err(Error::WouldBreak {
                    package: current,
                    dependents: dependents.into_iter().collect(),
                });
            }
            debug!("Erasing dependents of {}: {:?}", current, dependents);
            pending.extend(dependents);
        }

        Ok(())
    }
}

impl PackageSource for DbSource {
    fn search(&self, terms: &str, scope: SearchScope) -> Result<Vec<String>> {
        Ok(repository::search(&self.conn, terms, scope)?
            .into_iter()
            .map(|pkg| pkg.name)
            .collect())
    }

    fn metadata(&self, name: &str) -> Result<Option<PackageRecord>> {
        if let Some(best) = self.candidates(name)?.into_iter().next() {
            return Ok(Some(best.to_record()));
        }
        Ok(RepositoryPackage::find_by_name(&self.conn, name)?
            .into_iter()
            .next()
            .map(|pkg| pkg.to_record()))
    }

    fn query_installed(&self, name: &str) -> Result<Vec<PackageRecord>> {
        Trove::find_by_name(&self.conn, name)?
            .iter()
            .map(|trove| self.installed_record(trove))
            .collect()
    }

    fn query_available(&self, name: &str) -> Result<Vec<PackageRecord>> {
        Ok(self
            .candidates(name)?
            .iter()
            .map(RepositoryPackage::to_record)
            .collect())
    }

    fn owner_of_path(&self, path: &str) -> Result<Option<String>> {
        if let Some(trove) = Trove::find_by_path(&self.conn, path)?.into_iter().next() {
            return Ok(Some(trove.name));
        }
        Ok(RepositoryPackage::find_by_file(&self.conn, path)?
            .into_iter()
            .next()
            .map(|pkg| pkg.name))
    }

    fn files(&self, record: &PackageRecord) -> Result<Vec<String>> {
        if let Some(trove_id) = find_installed(&self.conn, record)?.and_then(|t| t.id) {
            return Ok(FileEntry::find_by_trove(&self.conn, trove_id)?
                .into_iter()
                .map(|file| file.path)
                .collect());
        }
        match cached_package(&self.conn, record)? {
            Some(pkg) => pkg.file_list(),
            None => Ok(Vec::new()),
        }
    }

    fn requirements(&self, record: &PackageRecord) -> Result<Vec<String>> {
        if let Some(trove_id) = find_installed(&self.conn, record)?.and_then(|t| t.id) {
            return Ok(DependencyEntry::find_by_trove(&self.conn, trove_id)?
                .into_iter()
                .map(|dep| dep.depends_on_name)
                .collect());
        }
        match cached_package(&self.conn, record)? {
            Some(pkg) => pkg.requirement_list(),
            None => Ok(Vec::new()),
        }
    }

    fn updates(&self) -> Result<Vec<(PackageRecord, PackageRecord)>> {
        let mut seen = HashSet::new();
        let mut updates = Vec::new();

        for trove in Trove::list_all(&self.conn)? {
            if !seen.insert(trove.name.clone()) {
                continue;
            }

            let newest_installed = Trove::find_by_name(&self.conn, &trove.name)?
                .into_iter()
                .max_by(|a, b| {
                    compare_revisions(trailing_revision(&a.version), trailing_revision(&b.version))
                });
            let Some(installed) = newest_installed else {
                continue;
            };
            let Some(candidate) = self.candidates(&trove.name)?.into_iter().next() else {
                continue;
            };

            if compare_revisions(
                trailing_revision(&candidate.version),
                trailing_revision(&installed.version),
            ) == Ordering::Greater
            {
                updates.push((self.installed_record(&installed)?, candidate.to_record()));
            }
        }

        debug!("{} updates available", updates.len());
        Ok(updates)
    }

    fn prepare(&self, requests: &[Request]) -> Result<UpdateJob> {
        let mut job = UpdateJob::default();
        let erase_requested: HashSet<&str> = requests
            .iter()
            .filter_map(|request| match request {
                Request::Erase { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();

        for request in requests {
            match request {
                Request::Install(id) => {
                    let candidate = self.find_candidate(id)?;
                    let installed = Trove::find_by_name(&self.conn, &id.name)?;
                    if installed
                        .iter()
                        .any(|t| t.version == candidate.version && t.flavor == candidate.flavor)
                    {
                        return Err(Error::AlreadyInstalled(id.name.clone()));
                    }
                    self.push_target(&mut job, &installed, candidate.to_record());
                }
                Request::Update(id) => {
                    let candidate = self.find_candidate(id)?;
                    let installed = Trove::find_by_name(&self.conn, &id.name)?;
                    if installed
                        .iter()
                        .any(|t| t.version == candidate.version && t.flavor == candidate.flavor)
                    {
                        debug!("{} is already at {}", id.name, id.version);
                        continue;
                    }
                    self.push_target(&mut job, &installed, candidate.to_record());
                }
                Request::UpdateAll => {
                    for (from, to) in self.updates()? {
                        if !job.contains(to.name()) {
                            job.entries.push(JobEntry::Update { from, to });
                        }
                    }
                }
                Request::Erase { name, allow_deps } => {
                    self.plan_erase(&mut job, name, *allow_deps, &erase_requested)?;
                }
            }
        }

        self.pull_requirements(&mut job)?;
        Ok(job)
    }

    fn apply(&mut self, job: &UpdateJob, simulate: bool) -> Result<()> {
        if job.is_empty() {
            return Ok(());
        }
        let description = job.describe();
        if simulate {
            info!("Simulated: {}", description);
            return Ok(());
        }

        db::transaction(&mut self.conn, |tx| {
            let mut changeset = Changeset::new(description.clone());
            let changeset_id = changeset.insert(tx)?;

            for entry in &job.entries {
                match entry {
                    JobEntry::Install(record) => install_trove(tx, record, changeset_id)?,
                    JobEntry::Update { to, .. } => {
                        for trove in Trove::find_by_name(tx, to.name())? {
                            if let Some(id) = trove.id {
                                Trove::delete(tx, id)?;
                            }
                        }
                        install_trove(tx, to, changeset_id)?;
                    }
                    JobEntry::Erase(record) => {
                        if let Some(id) = find_installed(tx, record)?.and_then(|t| t.id) {
                            Trove::delete(tx, id)?;
                        }
                    }
                }
            }

            changeset.update_status(tx, ChangesetStatus::Applied)?;
            Ok(())
        })?;

        info!("Applied: {}", description);
        Ok(())
    }

    fn channels(&self) -> Result<Vec<Repository>> {
        Repository::list_all(&self.conn)
    }

    fn set_channel_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        repository::set_repository_enabled(&self.conn, name, enabled)
    }

    fn refresh(&mut self, force: bool) -> Result<usize> {
        let mut total = 0;
        for mut repo in Repository::list_enabled(&self.conn)? {
            if !force && !repository::needs_sync(&repo) {
                debug!("Channel {} is up to date", repo.name);
                continue;
            }
            total += repository::sync_repository(&mut self.conn, &mut repo)?;
        }
        Ok(total)
    }
}

/// Installed trove with the record's exact version and flavor
fn find_installed(conn: &Connection, record: &PackageRecord) -> Result<Option<Trove>> {
    Ok(Trove::find_by_name(conn, record.name())?
        .into_iter()
        .find(|t| t.version == record.version() && t.flavor == record.flavor()))
}

/// Cached package with the record's exact version and flavor
fn cached_package(conn: &Connection, record: &PackageRecord) -> Result<Option<RepositoryPackage>> {
    Ok(RepositoryPackage::find_by_name(conn, record.name())?
        .into_iter()
        .find(|pkg| pkg.version == record.version() && pkg.flavor == record.flavor()))
}

/// Record a trove, its files and its requirements
fn install_trove(conn: &Connection, record: &PackageRecord, changeset_id: i64) -> Result<()> {
    let mut trove = Trove::new(
        record.name().to_string(),
        record.version().to_string(),
        record.flavor().to_string(),
    );
    trove.summary = record.field(keys::SUMMARY).map(str::to_string);
    trove.description = record.field(keys::DESCRIPTION).map(str::to_string);
    trove.installed_by_changeset_id = Some(changeset_id);
    let trove_id = trove.insert(conn)?;

    if let Some(pkg) = cached_package(conn, record)? {
        for path in pkg.file_list()? {
            FileEntry::new(path, trove_id).insert(conn)?;
        }
        for requirement in pkg.requirement_list()? {
            DependencyEntry::new(trove_id, requirement).insert(conn)?;
        }
    }

    debug!("Recorded {} {}", trove.name, trove.version);
    Ok(())
}
