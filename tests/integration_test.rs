// tests/integration_test.rs

//! Integration tests for the Conary PackageKit backend
//!
//! These tests verify end-to-end functionality across modules: a channel is
//! synced from metadata on disk and PackageKit operations run against it.

use conary_pk::db;
use conary_pk::output::{Event, Info, LineEmitter, MessageKind, RecordingEmitter, Restart};
use conary_pk::repository;
use conary_pk::{Backend, BackendConfig, DbSource, Error, FilterSet, PackageId};
use tempfile::{NamedTempFile, TempDir};

const LABEL: &str = "foresight.rpath.org@fl:2";

const METADATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Packages>
  <Package>
    <name>gimp</name>
    <version>/foresight.rpath.org@fl:2/2.6.8-1-1</version>
    <flavor>is: x86_64</flavor>
    <shortDesc>GNU Image Manipulation Program</shortDesc>
    <longDesc>The GIMP is an image editor.</longDesc>
    <url>http://www.gimp.org/</url>
    <licenses><license>rpath.com/licenses/copyright/GPL-2</license></licenses>
    <category>Graphics</category>
    <size>18522112</size>
    <requires><trove>gtk</trove></requires>
    <files><file>/usr/bin/gimp</file></files>
  </Package>
  <Package>
    <name>gtk</name>
    <version>/foresight.rpath.org@fl:2/2.18.9-1-1</version>
    <flavor>is: x86_64</flavor>
    <shortDesc>GTK+ toolkit</shortDesc>
    <category>System</category>
    <size>4096</size>
    <files><file>/usr/lib/libgtk-x11-2.0.so.0</file></files>
  </Package>
  <Package>
    <name>glibc</name>
    <version>/foresight.rpath.org@fl:2/2.10.1-1-1</version>
    <flavor>is: x86_64</flavor>
    <shortDesc>GNU C library</shortDesc>
    <size>8192</size>
    <files><file>/lib64/libc.so.6</file></files>
  </Package>
</Packages>
"#;

fn fresh_db_path() -> (TempDir, String) {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir
        .path()
        .join("conary.db")
        .to_str()
        .unwrap()
        .to_string();
    (temp_dir, db_path)
}

/// Initialize a database with one channel pointing at `url` and sync it
fn synced_backend(url: &str) -> (TempDir, Backend<DbSource, RecordingEmitter>) {
    let (temp_dir, db_path) = fresh_db_path();
    db::init(&db_path).unwrap();
    {
        let conn = db::open(&db_path).unwrap();
        repository::add_repository(&conn, LABEL.to_string(), url.to_string(), true, 0).unwrap();
    }

    let config = BackendConfig::new(db_path).with_arch("x86_64");
    let source = DbSource::open(&config).unwrap();
    let mut backend = Backend::new(source, RecordingEmitter::new());
    backend.refresh_cache(true).unwrap();
    (temp_dir, backend)
}

fn write_channel() -> TempDir {
    let channel_dir = tempfile::tempdir().unwrap();
    std::fs::write(channel_dir.path().join("packages.xml"), METADATA).unwrap();
    channel_dir
}

fn filters(text: &str) -> FilterSet {
    text.parse().unwrap()
}

fn package_names(backend: &Backend<DbSource, RecordingEmitter>) -> Vec<(Info, String)> {
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

fn take_events(backend: Backend<DbSource, RecordingEmitter>) -> (DbSource, Vec<Event>) {
    let (source, emitter) = backend.into_parts();
    (source, emitter.events)
}

#[test]
fn test_database_lifecycle() {
    let temp_file = NamedTempFile::new().unwrap();
    let db_path = temp_file.path().to_str().unwrap().to_string();

    // Remove the temp file so init can create it
    drop(temp_file);

    assert!(db::init(&db_path).is_ok(), "Database initialization should succeed");
    assert!(std::path::Path::new(&db_path).exists());

    let conn = db::open(&db_path).unwrap();
    let result: i32 = conn.query_row("SELECT 1", [], |row| row.get(0)).unwrap();
    assert_eq!(result, 1);

    // Running init again is harmless
    assert!(db::init(&db_path).is_ok());
}

#[test]
fn test_database_init_creates_parent_directories() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir
        .path()
        .join("nested/path/to/conary.db")
        .to_str()
        .unwrap()
        .to_string();

    db::init(&db_path).unwrap();
    assert!(std::path::Path::new(&db_path).exists());
}

#[test]
fn test_open_missing_database() {
    let (_temp_dir, db_path) = fresh_db_path();
    let config = BackendConfig::new(db_path);
    assert!(matches!(
        DbSource::open(&config),
        Err(Error::DatabaseNotFound(_))
    ));
}

#[test]
fn test_sync_search_and_resolve() {
    let channel = write_channel();
    let (_db_dir, mut backend) = synced_backend(channel.path().to_str().unwrap());

    backend
        .search_details(&filters("none"), "image editor")
        .unwrap();
    assert_eq!(
        package_names(&backend),
        vec![(Info::Available, "gimp".to_string())]
    );

    let (source, _) = take_events(backend);
    let mut backend = Backend::new(source, RecordingEmitter::new());
    backend
        .resolve(&filters("none"), &["gtk".to_string(), "missing".to_string()])
        .unwrap();

    let packages = backend.emitter().packages();
    assert_eq!(packages.len(), 1);
    assert_eq!(
        packages[0],
        (
            Info::Available,
            format!("gtk;2.18.9-1-1;x86_64;{}", LABEL)
        )
    );
}

#[test]
fn test_sync_from_file_url() {
    let channel = write_channel();
    let url = format!("file://{}", channel.path().join("packages.xml").display());
    let (_db_dir, mut backend) = synced_backend(&url);

    backend.get_packages(&filters("none")).unwrap();
    let mut names: Vec<String> = package_names(&backend)
        .into_iter()
        .map(|(_, name)| name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["gimp", "glibc", "gtk"]);
}

#[test]
fn test_install_remove_cycle() {
    let channel = write_channel();
    let (_db_dir, mut backend) = synced_backend(channel.path().to_str().unwrap());

    let gimp = PackageId::new("gimp", "2.6.8-1-1", "x86_64", LABEL);
    backend.install_packages(&[gimp], false).unwrap();

    // gtk came along as a requirement
    let (source, _) = take_events(backend);
    let mut backend = Backend::new(source, RecordingEmitter::new());
    backend.get_packages(&filters("installed")).unwrap();
    let mut installed: Vec<String> = package_names(&backend)
        .into_iter()
        .map(|(_, name)| name)
        .collect();
    installed.sort();
    assert_eq!(installed, vec!["gimp", "gtk"]);

    // The installed file is owned by gimp now
    let (source, _) = take_events(backend);
    let mut backend = Backend::new(source, RecordingEmitter::new());
    backend
        .search_file(&filters("installed"), "/usr/bin/gimp")
        .unwrap();
    assert_eq!(
        package_names(&backend),
        vec![(Info::Installed, "gimp".to_string())]
    );

    // gtk cannot go while gimp needs it
    let (source, _) = take_events(backend);
    let mut backend = Backend::new(source, RecordingEmitter::new());
    let gtk = PackageId::new("gtk", "2.18.9-1-1", "x86_64", LABEL);
    let err = backend
        .remove_packages(false, &[gtk.clone()], false)
        .unwrap_err();
    assert!(matches!(err, Error::WouldBreak { .. }));

    backend.remove_packages(true, &[gtk], false).unwrap();

    let (source, _) = take_events(backend);
    let mut backend = Backend::new(source, RecordingEmitter::new());
    backend.get_packages(&filters("installed")).unwrap();
    assert!(backend.emitter().packages().is_empty());
}

#[test]
fn test_glibc_install_requires_restart() {
    let channel = write_channel();
    let (_db_dir, mut backend) = synced_backend(channel.path().to_str().unwrap());

    let glibc = PackageId::new("glibc", "2.10.1-1-1", "x86_64", LABEL);
    backend.install_packages(&[glibc], false).unwrap();

    let (_, events) = take_events(backend);
    assert!(events.iter().any(|event| matches!(
        event,
        Event::RequireRestart {
            restart: Restart::System,
            ..
        }
    )));
}

#[test]
fn test_no_updates_when_current() {
    let channel = write_channel();
    let (_db_dir, mut backend) = synced_backend(channel.path().to_str().unwrap());

    let gtk = PackageId::new("gtk", "2.18.9-1-1", "x86_64", LABEL);
    backend.install_packages(&[gtk], false).unwrap();

    let (source, _) = take_events(backend);
    let mut backend = Backend::new(source, RecordingEmitter::new());
    backend.get_updates(&filters("none")).unwrap();
    assert!(backend.emitter().packages().is_empty());

    assert!(matches!(
        backend.update_system(false),
        Err(Error::NoPackagesToUpdate)
    ));
}

#[test]
fn test_empty_search_reports_message() {
    let channel = write_channel();
    let (_db_dir, mut backend) = synced_backend(channel.path().to_str().unwrap());

    backend.search_name(&filters("none"), "nothing-here").unwrap();
    let (_, events) = take_events(backend);
    assert!(events.iter().any(|event| matches!(
        event,
        Event::Message {
            kind: MessageKind::CouldNotFindPackage,
            ..
        }
    )));
}

#[test]
fn test_line_protocol_output() {
    let channel = write_channel();
    let (temp_dir, db_path) = fresh_db_path();
    db::init(&db_path).unwrap();
    {
        let conn = db::open(&db_path).unwrap();
        repository::add_repository(
            &conn,
            LABEL.to_string(),
            channel.path().to_str().unwrap().to_string(),
            true,
            0,
        )
        .unwrap();
    }

    let config = BackendConfig::new(db_path).with_arch("x86_64");
    let source = DbSource::open(&config).unwrap();
    let mut backend = Backend::new(source, LineEmitter::new(Vec::new()));
    backend.get_repo_list(&filters("none")).unwrap();

    let (_, emitter) = backend.into_parts();
    let output = String::from_utf8(emitter.into_inner()).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "status\tquery");
    assert_eq!(
        lines[1],
        format!("repo-detail\t{}\t{}\ttrue", LABEL, LABEL)
    );
    drop(temp_dir);
}
