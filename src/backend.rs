// src/backend.rs

//! PackageKit operations
//!
//! `Backend` implements the PackageKit backend operations on top of a
//! [`PackageSource`]. Each operation reports progress and results through
//! an [`Emitter`]. Queries build a fresh [`ResultReconciler`] so nothing
//! carries over from one call to the next.

use crate::error::{Error, Result};
use crate::filter::FilterSet;
use crate::flavor::arch_from_flavor;
use crate::output::{
    Emitter, Event, Info, MessageKind, Restart, Status, UpdateDetail, UpdateState,
};
use crate::package_id::{PackageId, display_summary};
use crate::reconcile::{InstallationState, PackageRecord, ResultEntry, ResultReconciler, keys};
use crate::repository::{SearchScope, group_for_category};
use crate::source::{JobEntry, PackageSource, Request, UpdateJob};
use crate::version::trailing_revision;
use tracing::{debug, info};

/// Packages whose update needs a reboot
const REBOOT_PACKAGES: [&str; 4] = ["kernel", "glibc", "hal", "dbus"];

/// Packages whose update needs the PackageKit session restarted
const RESTART_PACKAGES: [&str; 2] = ["PackageKit", "gnome-packagekit"];

/// Restart needed after updating `name`
pub fn restart_for(name: &str) -> Restart {
    if REBOOT_PACKAGES.contains(&name) {
        Restart::System
    } else if RESTART_PACKAGES.contains(&name) {
        Restart::Application
    } else {
        Restart::None
    }
}

/// Info reported for an update of `name`
pub fn update_info(name: &str) -> Info {
    match restart_for(name) {
        Restart::None => Info::Normal,
        Restart::Application | Restart::System => Info::Security,
    }
}

/// Stability of a label's branch: `...@fl:2-qa` is testing, `...@fl:2-devel`
/// unstable, anything else stable
pub fn update_state(label: &str) -> UpdateState {
    let branch = label.split_once('@').map(|(_, branch)| branch).unwrap_or("");
    if branch.contains("2-qa") {
        UpdateState::Testing
    } else if branch.contains("2-devel") {
        UpdateState::Unstable
    } else {
        UpdateState::Stable
    }
}

/// Issue tracker for a label, as `url;title`
pub fn issue_tracker(label: &str) -> &'static str {
    if label.contains("conary.rpath.com") {
        "http://issues.rpath.com;rPath Issues Tracker"
    } else if label.contains("foresight.rpath.org") {
        "http://issues.foresightlinux.org; Foresight Issues Tracker"
    } else {
        ""
    }
}

/// Short license names from space-separated license paths
/// (`rpath.com/licenses/copyright/GPL-2` becomes `GPL-2`)
pub fn format_licenses(licenses: &str) -> String {
    licenses
        .split_whitespace()
        .map(|license| license.rsplit('/').next().unwrap_or(license))
        .collect::<Vec<_>>()
        .join(" ")
}

/// PackageKit backend over a package source
pub struct Backend<S, E> {
    source: S,
    emitter: E,
}

impl<S: PackageSource, E: Emitter> Backend<S, E> {
    pub fn new(source: S, emitter: E) -> Self {
        Self { source, emitter }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    pub fn into_parts(self) -> (S, E) {
        (self.source, self.emitter)
    }

    /// Resolve package names
    pub fn resolve(&mut self, filters: &FilterSet, names: &[String]) -> Result<()> {
        self.begin(Status::Info, true)?;
        info!("Resolving {:?} ({})", names, filters);
        self.resolve_names(filters, names)
    }

    pub fn search_name(&mut self, filters: &FilterSet, terms: &str) -> Result<()> {
        self.begin(Status::Query, true)?;
        self.search(filters, terms, SearchScope::Name)
    }

    pub fn search_details(&mut self, filters: &FilterSet, terms: &str) -> Result<()> {
        self.begin(Status::Query, true)?;
        self.search(filters, terms, SearchScope::Details)
    }

    pub fn search_group(&mut self, filters: &FilterSet, group: &str) -> Result<()> {
        self.begin(Status::Query, true)?;
        self.search(filters, group, SearchScope::Group)
    }

    /// Every cached package
    pub fn get_packages(&mut self, filters: &FilterSet) -> Result<()> {
        self.begin(Status::Query, false)?;
        self.search(filters, "", SearchScope::All)
    }

    /// Resolve the trove owning `path`
    pub fn search_file(&mut self, filters: &FilterSet, path: &str) -> Result<()> {
        self.begin(Status::Query, true)?;
        self.emit(Event::Percentage(Some(0)))?;

        let owner = self.source.owner_of_path(path)?;
        self.emit(Event::Percentage(Some(50)))?;

        match owner {
            Some(name) => {
                // Components (`gimp:runtime`) resolve as their package
                let name = name.split(':').next().unwrap_or(&name).to_string();
                debug!("{} is owned by {}", path, name);
                self.resolve_names(filters, &[name])
            }
            None => self.emit(Event::Message {
                kind: MessageKind::CouldNotFindPackage,
                details: format!("No package provides {}", path),
            }),
        }
    }

    pub fn get_details(&mut self, ids: &[PackageId]) -> Result<()> {
        self.begin(Status::Info, true)?;

        for id in ids {
            let (record, _) = self.find_record(id)?;
            let record = match self.source.metadata(&id.name)? {
                Some(meta) => record.with_metadata_from(&meta),
                None => record,
            };

            let size = record
                .field(keys::SIZE)
                .and_then(|size| size.parse().ok())
                .unwrap_or(0);

            self.emit(Event::Details {
                package_id: id.to_string(),
                license: format_licenses(record.field(keys::LICENSES).unwrap_or_default()),
                group: group_for_category(record.field(keys::CATEGORY)).to_string(),
                description: record.field(keys::DESCRIPTION).unwrap_or_default().to_string(),
                url: record.field(keys::URL).unwrap_or_default().to_string(),
                size,
            })?;
        }
        Ok(())
    }

    pub fn get_update_detail(&mut self, ids: &[PackageId]) -> Result<()> {
        self.begin(Status::Info, true)?;

        for id in ids {
            let Some(meta) = self.source.metadata(&id.name)? else {
                debug!("No cached metadata for {}", id.name);
                continue;
            };

            let updates = self
                .source
                .query_installed(&id.name)?
                .iter()
                .map(|record| PackageId::for_record(record).to_string())
                .collect::<Vec<_>>()
                .join("&");
            let label = meta.field(keys::LABEL).unwrap_or(&id.data).to_string();
            let description = meta.field(keys::DESCRIPTION).unwrap_or_default();

            self.emit(Event::UpdateDetail(Box::new(UpdateDetail {
                package_id: id.to_string(),
                updates,
                obsoletes: String::new(),
                vendor_url: meta.field(keys::URL).unwrap_or_default().to_string(),
                bugzilla_url: issue_tracker(&label).to_string(),
                cve_url: String::new(),
                restart: restart_for(&id.name),
                update_text: description.lines().collect::<Vec<_>>().join(";"),
                changelog: String::new(),
                state: update_state(&label),
                issued: String::new(),
                updated: String::new(),
            })))?;
        }
        Ok(())
    }

    /// Installed troves with a newer candidate
    ///
    /// Updates are never installed themselves, so an installed-only filter
    /// reports nothing.
    pub fn get_updates(&mut self, filters: &FilterSet) -> Result<()> {
        self.begin(Status::Info, true)?;
        if filters.only_installed() {
            return Ok(());
        }

        for (_, candidate) in self.source.updates()? {
            let info = update_info(candidate.name());
            self.emit_package(&candidate, info)?;
        }
        Ok(())
    }

    /// Troves that installing the package would pull in
    pub fn get_depends(&mut self, filters: &FilterSet, ids: &[PackageId]) -> Result<()> {
        self.begin(Status::Info, true)?;

        let mut reconciler = ResultReconciler::new();
        for id in ids {
            if let (_, true) = self.find_record(id)? {
                return Err(Error::AlreadyInstalled(id.name.clone()));
            }

            let job = self.source.prepare(&[Request::Install(id.clone())])?;
            let Some(target) = job.entries.first() else {
                continue;
            };

            for requirement in self.source.requirements(target.record())? {
                reconciler.add_installed(self.source.query_installed(&requirement)?);
            }
            reconciler.add_available(
                job.entries
                    .iter()
                    .skip(1)
                    .filter(|entry| matches!(entry, JobEntry::Install(_)))
                    .map(|entry| entry.record().clone()),
            );
        }

        self.emit_results(reconciler.reconcile(filters))
    }

    pub fn get_files(&mut self, ids: &[PackageId]) -> Result<()> {
        self.begin(Status::Info, true)?;

        for id in ids {
            let (record, _) = self.find_record(id)?;
            let files = self.source.files(&record)?;
            self.emit(Event::Files {
                package_id: id.to_string(),
                files,
            })?;
        }
        Ok(())
    }

    pub fn install_packages(&mut self, ids: &[PackageId], simulate: bool) -> Result<()> {
        self.begin(Status::Running, true)?;
        let requests: Vec<Request> = ids.iter().cloned().map(Request::Install).collect();
        let job = self.source.prepare(&requests)?;

        self.emit(Event::Status(Status::Install))?;
        self.run_job(&job, simulate)
    }

    pub fn update_packages(&mut self, ids: &[PackageId], simulate: bool) -> Result<()> {
        self.begin(Status::Running, true)?;
        let requests: Vec<Request> = ids.iter().cloned().map(Request::Update).collect();
        let job = self.source.prepare(&requests)?;
        if job.is_empty() {
            return Err(Error::NoPackagesToUpdate);
        }

        self.emit(Event::Status(Status::Update))?;
        self.run_job(&job, simulate)
    }

    pub fn remove_packages(
        &mut self,
        allow_deps: bool,
        ids: &[PackageId],
        simulate: bool,
    ) -> Result<()> {
        self.begin(Status::Running, true)?;
        let requests: Vec<Request> = ids
            .iter()
            .map(|id| Request::Erase {
                name: id.name.clone(),
                allow_deps,
            })
            .collect();
        let job = self.source.prepare(&requests)?;

        self.emit(Event::Status(Status::Remove))?;
        self.run_job(&job, simulate)
    }

    pub fn update_system(&mut self, simulate: bool) -> Result<()> {
        self.begin(Status::Update, true)?;
        let job = self.source.prepare(&[Request::UpdateAll])?;
        if job.is_empty() {
            return Err(Error::NoPackagesToUpdate);
        }

        self.run_job(&job, simulate)
    }

    pub fn refresh_cache(&mut self, force: bool) -> Result<()> {
        self.begin(Status::RefreshCache, false)?;
        let count = self.source.refresh(force)?;
        info!("Refreshed {} packages", count);
        self.emit(Event::Percentage(Some(100)))
    }

    /// Report every configured channel
    pub fn get_repo_list(&mut self, _filters: &FilterSet) -> Result<()> {
        self.emit(Event::Status(Status::Query))?;
        for repo in self.source.channels()? {
            self.emit(Event::RepoDetail {
                repo_id: repo.name.clone(),
                description: repo.name,
                enabled: repo.enabled,
            })?;
        }
        Ok(())
    }

    pub fn repo_enable(&mut self, repo_id: &str, enabled: bool) -> Result<()> {
        self.emit(Event::Status(Status::Info))?;
        self.source.set_channel_enabled(repo_id, enabled)
    }

    fn resolve_names(&mut self, filters: &FilterSet, names: &[String]) -> Result<()> {
        let mut reconciler = ResultReconciler::new();
        for name in names {
            self.stage(&mut reconciler, name, filters)?;
        }
        self.emit_results(reconciler.reconcile(filters))
    }

    fn emit(&mut self, event: Event) -> Result<()> {
        self.emitter.emit(event)
    }

    fn begin(&mut self, status: Status, allow_cancel: bool) -> Result<()> {
        self.emit(Event::AllowCancel(allow_cancel))?;
        self.emit(Event::Percentage(None))?;
        self.emit(Event::Status(status))
    }

    fn emit_package(&mut self, record: &PackageRecord, info: Info) -> Result<()> {
        self.emit(Event::Package {
            info,
            package_id: PackageId::for_record(record).to_string(),
            summary: display_summary(record),
        })
    }

    fn emit_results(&mut self, results: Vec<ResultEntry>) -> Result<()> {
        for entry in results {
            let info = match entry.state {
                InstallationState::Installed => Info::Installed,
                InstallationState::Available => Info::Available,
            };
            self.emit_package(&entry.record, info)?;
        }
        Ok(())
    }

    /// Cache search followed by list resolution
    fn search(&mut self, filters: &FilterSet, terms: &str, scope: SearchScope) -> Result<()> {
        let names = self.source.search(terms, scope)?;
        if names.is_empty() {
            info!("Nothing matches '{}' ({})", terms, scope.as_str());
            return self.emit(Event::Message {
                kind: MessageKind::CouldNotFindPackage,
                details: format!("search not found: {}", terms),
            });
        }

        let mut reconciler = ResultReconciler::new();
        for name in &names {
            self.stage(&mut reconciler, name, filters)?;
        }
        self.emit_results(reconciler.reconcile(filters))
    }

    /// Stage every installed version of `name`, or its best candidate when
    /// nothing is installed
    fn stage(&self, reconciler: &mut ResultReconciler, name: &str, filters: &FilterSet) -> Result<()> {
        if !filters.only_available() {
            let installed = self.source.query_installed(name)?;
            if !installed.is_empty() {
                reconciler.add_installed(installed);
                return Ok(());
            }
        }

        if !filters.only_installed() {
            reconciler.add_available(self.source.query_available(name)?.into_iter().take(1));
        }
        Ok(())
    }

    /// The trove a package id names, and whether it is installed
    fn find_record(&self, id: &PackageId) -> Result<(PackageRecord, bool)> {
        let matches = |record: &PackageRecord| {
            trailing_revision(record.version()) == id.version
                && (id.arch.is_empty() || arch_from_flavor(record.flavor()) == id.arch)
        };

        if let Some(record) = self.source.query_installed(&id.name)?.into_iter().find(matches) {
            return Ok((record, true));
        }
        if let Some(record) = self.source.query_available(&id.name)?.into_iter().find(matches) {
            return Ok((record, false));
        }
        Err(Error::NotFoundError(id.to_string()))
    }

    /// Report, apply and flag restarts for a prepared job
    fn run_job(&mut self, job: &UpdateJob, simulate: bool) -> Result<()> {
        self.emit(Event::AllowCancel(false))?;
        self.emit(Event::Percentage(Some(0)))?;

        for entry in &job.entries {
            let info = match entry {
                JobEntry::Install(_) => Info::Installing,
                JobEntry::Update { .. } => Info::Updating,
                JobEntry::Erase(_) => Info::Removing,
            };
            self.emit_package(entry.record(), info)?;
        }

        self.source.apply(job, simulate)?;

        if !simulate {
            let reboot = job
                .entries
                .iter()
                .find(|entry| restart_for(entry.name()) == Restart::System);
            if let Some(entry) = reboot {
                let details = entry.name().to_string();
                self.emit(Event::RequireRestart {
                    restart: Restart::System,
                    details,
                })?;
            }
        }

        self.emit(Event::Percentage(Some(100)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Repository, RepositoryPackage, encode_list};
    use crate::db::schema;
    use crate::filter::Filter;
    use crate::output::RecordingEmitter;
    use crate::source::DbSource;
    use rusqlite::Connection;
    use tempfile::NamedTempFile;

    const LABEL: &str = "foresight.rpath.org@fl:2";

    fn publish(conn: &Connection, name: &str, revision: &str, requires: &[&str]) {
        let repo_id = Repository::find_by_name(conn, LABEL)
            .unwrap()
            .and_then(|repo| repo.id)
            .unwrap();
        let mut pkg = RepositoryPackage::new(
            repo_id,
            name.to_string(),
            format!("/{}/{}", LABEL, revision),
            "is: x86_64".to_string(),
        );
        pkg.label = Some(LABEL.to_string());
        pkg.summary = Some(format!("{} package", name));
        pkg.description = Some(format!("All about\n{}", name));
        pkg.url = Some(format!("http://example.org/{}", name));
        pkg.licenses = Some("rpath.com/licenses/copyright/GPL-2 rpath.com/licenses/copyright/LGPL-2.1".to_string());
        pkg.category = Some("Graphics".to_string());
        pkg.size = 1024;
        let requires: Vec<String> = requires.iter().map(|s| s.to_string()).collect();
        pkg.requires = encode_list(&requires).unwrap();
        pkg.files = encode_list(&[format!("/usr/bin/{}", name)]).unwrap();
        pkg.insert(conn).unwrap();
    }

    fn backend() -> (NamedTempFile, Backend<DbSource, RecordingEmitter>) {
        let temp = NamedTempFile::new().unwrap();
        let conn = Connection::open(temp.path()).unwrap();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
        schema::migrate(&conn).unwrap();
        Repository::new(LABEL.to_string(), "unused".to_string())
            .insert(&conn)
            .unwrap();

        publish(&conn, "foo", "1.0-1-1", &[]);
        publish(&conn, "bar", "2.0-1-1", &[]);
        publish(&conn, "baz", "3.0-1-1", &["bar"]);
        publish(&conn, "kernel", "2.6.32-1-1", &[]);

        let source = DbSource::new(conn, "x86_64");
        (temp, Backend::new(source, RecordingEmitter::new()))
    }

    fn id(name: &str, revision: &str) -> PackageId {
        PackageId::new(name, revision, "x86_64", LABEL)
    }

    fn filters(text: &str) -> FilterSet {
        text.parse().unwrap()
    }

    fn names(backend: &Backend<DbSource, RecordingEmitter>) -> Vec<(Info, String)> {
        backend
            .emitter()
            .packages()
            .into_iter()
            .map(|(info, package_id)| {
                let name = package_id.split(';').next().unwrap_or_default().to_string();
                (info, name)
            })
            .collect()
    }

    fn reset(backend: &mut Backend<DbSource, RecordingEmitter>) {
        backend.emitter.events.clear();
    }

    #[test]
    fn test_helpers() {
        assert_eq!(restart_for("kernel"), Restart::System);
        assert_eq!(restart_for("PackageKit"), Restart::Application);
        assert_eq!(restart_for("gimp"), Restart::None);
        assert_eq!(update_info("dbus"), Info::Security);
        assert_eq!(update_info("gnome-packagekit"), Info::Security);
        assert_eq!(update_info("gimp"), Info::Normal);

        assert_eq!(update_state("foresight.rpath.org@fl:2-qa"), UpdateState::Testing);
        assert_eq!(update_state("foresight.rpath.org@fl:2-devel"), UpdateState::Unstable);
        assert_eq!(update_state("foresight.rpath.org@fl:2"), UpdateState::Stable);
        assert_eq!(update_state("nolabel"), UpdateState::Stable);

        assert_eq!(
            issue_tracker("conary.rpath.com@rpl:2"),
            "http://issues.rpath.com;rPath Issues Tracker"
        );
        assert_eq!(
            issue_tracker(LABEL),
            "http://issues.foresightlinux.org; Foresight Issues Tracker"
        );
        assert_eq!(issue_tracker("example.com@ex:1"), "");

        assert_eq!(
            format_licenses("rpath.com/licenses/copyright/GPL-2 rpath.com/licenses/copyright/LGPL-2.1"),
            "GPL-2 LGPL-2.1"
        );
        assert_eq!(format_licenses(""), "");
    }

    #[test]
    fn test_search_reconciles_installed_and_available() {
        let (_temp, mut backend) = backend();
        backend.install_packages(&[id("foo", "1.0-1-1")], false).unwrap();
        reset(&mut backend);

        backend.search_name(&FilterSet::none(), "ba").unwrap();
        assert_eq!(
            names(&backend),
            vec![
                (Info::Available, "bar".to_string()),
                (Info::Available, "baz".to_string()),
            ]
        );

        reset(&mut backend);
        backend.get_packages(&FilterSet::none()).unwrap();
        assert_eq!(
            names(&backend),
            vec![
                (Info::Installed, "foo".to_string()),
                (Info::Available, "bar".to_string()),
                (Info::Available, "baz".to_string()),
                (Info::Available, "kernel".to_string()),
            ]
        );

        reset(&mut backend);
        backend.get_packages(&filters("installed")).unwrap();
        assert_eq!(names(&backend), vec![(Info::Installed, "foo".to_string())]);

        reset(&mut backend);
        backend.get_packages(&filters("~installed")).unwrap();
        assert_eq!(
            names(&backend),
            vec![
                (Info::Available, "bar".to_string()),
                (Info::Available, "baz".to_string()),
                (Info::Available, "foo".to_string()),
                (Info::Available, "kernel".to_string()),
            ]
        );
    }

    #[test]
    fn test_search_without_hits_emits_message() {
        let (_temp, mut backend) = backend();
        backend.search_details(&FilterSet::none(), "nothing-like-this").unwrap();

        assert!(backend.emitter().packages().is_empty());
        assert!(backend.emitter().events.iter().any(|event| matches!(
            event,
            Event::Message {
                kind: MessageKind::CouldNotFindPackage,
                ..
            }
        )));
    }

    #[test]
    fn test_resolve_and_package_id() {
        let (_temp, mut backend) = backend();
        backend
            .resolve(&FilterSet::none(), &["foo".to_string(), "missing".to_string()])
            .unwrap();

        let packages = backend.emitter().packages();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0], (Info::Available, format!("foo;1.0-1-1;x86_64;{}", LABEL)));

        reset(&mut backend);
        backend.resolve(&filters("installed"), &["foo".to_string()]).unwrap();
        assert!(backend.emitter().packages().is_empty());
    }

    #[test]
    fn test_search_group_and_file() {
        let (_temp, mut backend) = backend();
        backend.search_group(&FilterSet::none(), "graphics").unwrap();
        assert_eq!(backend.emitter().packages().len(), 4);

        reset(&mut backend);
        backend.search_file(&FilterSet::none(), "/usr/bin/baz").unwrap();
        assert_eq!(names(&backend), vec![(Info::Available, "baz".to_string())]);

        // One status line, and it stays on query
        let statuses: Vec<&Event> = backend
            .emitter()
            .events
            .iter()
            .filter(|event| matches!(event, Event::Status(_) | Event::AllowCancel(_)))
            .collect();
        assert_eq!(
            statuses,
            vec![&Event::AllowCancel(true), &Event::Status(Status::Query)]
        );
    }

    #[test]
    fn test_install_and_remove() {
        let (_temp, mut backend) = backend();
        backend.install_packages(&[id("baz", "3.0-1-1")], false).unwrap();
        assert_eq!(
            names(&backend),
            vec![
                (Info::Installing, "baz".to_string()),
                (Info::Installing, "bar".to_string()),
            ]
        );

        let again = backend.install_packages(&[id("baz", "3.0-1-1")], false);
        assert!(matches!(again, Err(Error::AlreadyInstalled(_))));

        let refused = backend.remove_packages(false, &[id("bar", "2.0-1-1")], false);
        assert!(matches!(refused, Err(Error::WouldBreak { .. })));
        assert_eq!(refused.unwrap_err().code().as_str(), "dep-resolution-failed");

        reset(&mut backend);
        backend
            .remove_packages(true, &[id("bar", "2.0-1-1")], false)
            .unwrap();
        assert_eq!(
            names(&backend),
            vec![
                (Info::Removing, "bar".to_string()),
                (Info::Removing, "baz".to_string()),
            ]
        );

        reset(&mut backend);
        backend.get_packages(&filters("installed")).unwrap();
        assert!(backend.emitter().packages().is_empty());
    }

    #[test]
    fn test_simulated_install_writes_nothing() {
        let (_temp, mut backend) = backend();
        backend.install_packages(&[id("foo", "1.0-1-1")], true).unwrap();
        assert_eq!(names(&backend), vec![(Info::Installing, "foo".to_string())]);

        reset(&mut backend);
        backend.get_packages(&filters("installed")).unwrap();
        assert!(backend.emitter().packages().is_empty());
    }

    #[test]
    fn test_kernel_install_requires_reboot() {
        let (_temp, mut backend) = backend();
        backend.install_packages(&[id("kernel", "2.6.32-1-1")], false).unwrap();

        assert!(backend.emitter().events.contains(&Event::RequireRestart {
            restart: Restart::System,
            details: "kernel".to_string(),
        }));
    }

    #[test]
    fn test_updates() {
        let (_temp, mut backend) = backend();
        backend.install_packages(&[id("kernel", "2.6.32-1-1")], false).unwrap();
        assert!(matches!(
            backend.update_system(false),
            Err(Error::NoPackagesToUpdate)
        ));

        publish(backend.source().connection(), "kernel", "2.6.33-1-1", &[]);

        reset(&mut backend);
        backend.get_updates(&FilterSet::none()).unwrap();
        assert_eq!(
            backend.emitter().packages(),
            vec![(Info::Security, format!("kernel;2.6.33-1-1;x86_64;{}", LABEL))]
        );

        reset(&mut backend);
        backend.update_system(false).unwrap();
        assert_eq!(names(&backend), vec![(Info::Updating, "kernel".to_string())]);

        reset(&mut backend);
        backend.get_updates(&FilterSet::none()).unwrap();
        assert!(backend.emitter().packages().is_empty());

        assert!(matches!(
            backend.update_packages(&[id("kernel", "2.6.33-1-1")], false),
            Err(Error::NoPackagesToUpdate)
        ));
    }

    #[test]
    fn test_details_files_and_update_detail() {
        let (_temp, mut backend) = backend();
        backend.get_details(&[id("baz", "3.0-1-1")]).unwrap();
        backend.get_files(&[id("baz", "3.0-1-1")]).unwrap();
        backend.get_update_detail(&[id("kernel", "2.6.32-1-1")]).unwrap();

        let events = &backend.emitter().events;
        assert!(events.contains(&Event::Details {
            package_id: format!("baz;3.0-1-1;x86_64;{}", LABEL),
            license: "GPL-2 LGPL-2.1".to_string(),
            group: "graphics".to_string(),
            description: "All about\nbaz".to_string(),
            url: "http://example.org/baz".to_string(),
            size: 1024,
        }));
        assert!(events.contains(&Event::Files {
            package_id: format!("baz;3.0-1-1;x86_64;{}", LABEL),
            files: vec!["/usr/bin/baz".to_string()],
        }));

        let detail = events
            .iter()
            .find_map(|event| match event {
                Event::UpdateDetail(detail) => Some(detail.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(detail.restart, Restart::System);
        assert_eq!(detail.state, UpdateState::Stable);
        assert_eq!(detail.update_text, "All about;kernel");
        assert_eq!(
            detail.bugzilla_url,
            "http://issues.foresightlinux.org; Foresight Issues Tracker"
        );

        let missing = backend.get_details(&[id("nothere", "1-1-1")]);
        assert!(matches!(missing, Err(Error::NotFoundError(_))));
    }

    #[test]
    fn test_get_depends() {
        let (_temp, mut backend) = backend();
        backend.get_depends(&FilterSet::none(), &[id("baz", "3.0-1-1")]).unwrap();
        assert_eq!(names(&backend), vec![(Info::Available, "bar".to_string())]);

        backend.install_packages(&[id("bar", "2.0-1-1")], false).unwrap();
        reset(&mut backend);
        backend.get_depends(&FilterSet::none(), &[id("baz", "3.0-1-1")]).unwrap();
        assert_eq!(names(&backend), vec![(Info::Installed, "bar".to_string())]);

        let installed = backend.get_depends(&FilterSet::none(), &[id("bar", "2.0-1-1")]);
        assert!(matches!(installed, Err(Error::AlreadyInstalled(_))));
    }

    #[test]
    fn test_repo_list_and_enable() {
        let (_temp, mut backend) = backend();
        backend.repo_enable(LABEL, false).unwrap();
        backend.get_repo_list(&FilterSet::none()).unwrap();

        assert!(backend.emitter().events.contains(&Event::RepoDetail {
            repo_id: LABEL.to_string(),
            description: LABEL.to_string(),
            enabled: false,
        }));

        reset(&mut backend);
        backend.search_name(&FilterSet::none(), "foo").unwrap();
        assert!(backend.emitter().packages().is_empty());

        let missing = backend.repo_enable("nope@x:1", true);
        assert!(matches!(missing, Err(Error::NotFoundError(_))));
    }

    #[test]
    fn test_both_installed_filters_mean_no_restriction() {
        let (_temp, mut backend) = backend();
        backend.install_packages(&[id("foo", "1.0-1-1")], false).unwrap();
        reset(&mut backend);

        let both: FilterSet = [Filter::Installed, Filter::NotInstalled].into_iter().collect();
        backend.search_name(&both, "foo").unwrap();
        assert_eq!(names(&backend), vec![(Info::Installed, "foo".to_string())]);
    }
}
