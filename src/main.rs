// src/main.rs

use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use conary_pk::config::DEFAULT_DB_PATH;
use conary_pk::output::{Emitter, ErrorCode, Event, LineEmitter};
use conary_pk::{Backend, BackendConfig, DbSource, FilterSet, PackageId, db, repository};
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "conary-pk")]
#[command(author, version, about = "PackageKit backend for the Conary package manager", long_about = None)]
struct Cli {
    /// Database path
    #[arg(short, long, global = true, env = "CONARY_PK_DB", default_value = DEFAULT_DB_PATH)]
    db_path: String,

    /// System architecture used to pick compatible flavors
    #[arg(long, global = true, env = "CONARY_PK_ARCH", default_value = std::env::consts::ARCH)]
    arch: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the Conary database
    Init,
    /// Add a channel (a Conary label and its metadata URL)
    RepoAdd {
        /// Channel name, normally the label (e.g. foresight.rpath.org@fl:2)
        name: String,
        /// Metadata URL: http(s), file:// or a local path
        url: String,
        /// Priority (higher = preferred)
        #[arg(short, long, default_value_t = 0)]
        priority: i32,
        /// Add the channel disabled
        #[arg(long)]
        disabled: bool,
    },
    /// Remove a channel and its cached metadata
    RepoRemove {
        /// Channel name
        name: String,
    },
    /// Resolve package names
    Resolve {
        /// Filters, `;` separated (`none` for no filter)
        filters: String,
        /// Package names
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Search package names
    SearchName {
        filters: String,
        terms: String,
    },
    /// Search names, summaries and descriptions
    SearchDetails {
        filters: String,
        terms: String,
    },
    /// Search by PackageKit group
    SearchGroup {
        filters: String,
        group: String,
    },
    /// Find the package owning a file
    SearchFile {
        filters: String,
        path: String,
    },
    /// List every known package
    GetPackages {
        filters: String,
    },
    /// Show package details
    GetDetails {
        /// Package ids (`name;version;arch;data`)
        #[arg(required = true)]
        package_ids: Vec<String>,
    },
    /// Show update details
    GetUpdateDetail {
        #[arg(required = true)]
        package_ids: Vec<String>,
    },
    /// List available updates
    GetUpdates {
        filters: String,
    },
    /// Show what installing a package would pull in
    GetDepends {
        filters: String,
        #[arg(required = true)]
        package_ids: Vec<String>,
    },
    /// List the files of a package
    GetFiles {
        #[arg(required = true)]
        package_ids: Vec<String>,
    },
    /// Install packages
    InstallPackages {
        #[arg(required = true)]
        package_ids: Vec<String>,
        /// Report what would happen without changing anything
        #[arg(long)]
        simulate: bool,
    },
    /// Update packages to the given versions
    UpdatePackages {
        #[arg(required = true)]
        package_ids: Vec<String>,
        #[arg(long)]
        simulate: bool,
    },
    /// Remove packages
    RemovePackages {
        /// Also remove packages that depend on them
        #[arg(long)]
        allow_deps: bool,
        #[arg(required = true)]
        package_ids: Vec<String>,
        #[arg(long)]
        simulate: bool,
    },
    /// Update every package with a newer version
    UpdateSystem {
        #[arg(long)]
        simulate: bool,
    },
    /// Synchronize channel metadata
    RefreshCache {
        /// Sync even if the metadata has not expired
        #[arg(short, long)]
        force: bool,
    },
    /// List channels
    GetRepoList {
        #[arg(default_value = "none")]
        filters: String,
    },
    /// Enable or disable a channel
    RepoEnable {
        repo_id: String,
        /// `true` or `false`
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    /// Generate shell completion scripts
    Completions {
        shell: Shell,
    },
}

fn parse_filters(text: &str) -> conary_pk::Result<FilterSet> {
    text.parse()
}

/// Package ids from the command line; PackageKit joins several with `&`
fn parse_ids(args: &[String]) -> conary_pk::Result<Vec<PackageId>> {
    args.iter()
        .flat_map(|arg| arg.split('&'))
        .filter(|id| !id.is_empty())
        .map(str::parse)
        .collect()
}

/// Open the database and run one backend operation
fn with_backend<E, F>(config: &BackendConfig, emitter: E, operation: F) -> Result<()>
where
    E: Emitter,
    F: FnOnce(&mut Backend<DbSource, E>) -> conary_pk::Result<()>,
{
    let source = DbSource::open(config)?;
    let mut backend = Backend::new(source, emitter);
    operation(&mut backend)?;
    Ok(())
}

fn run<E: Emitter>(command: Commands, config: &BackendConfig, emitter: &mut E) -> Result<()> {
    match command {
        Commands::Init => {
            info!("Initializing Conary database at: {}", config.db_path);
            db::init(&config.db_path)?;
            Ok(())
        }
        Commands::RepoAdd {
            name,
            url,
            priority,
            disabled,
        } => {
            let conn = db::open(&config.db_path)?;
            repository::add_repository(&conn, name, url, !disabled, priority)?;
            Ok(())
        }
        Commands::RepoRemove { name } => {
            let conn = db::open(&config.db_path)?;
            repository::remove_repository(&conn, &name)?;
            Ok(())
        }
        Commands::Resolve { filters, names } => with_backend(config, emitter, |backend| {
            backend.resolve(&parse_filters(&filters)?, &names)
        }),
        Commands::SearchName { filters, terms } => with_backend(config, emitter, |backend| {
            backend.search_name(&parse_filters(&filters)?, &terms)
        }),
        Commands::SearchDetails { filters, terms } => with_backend(config, emitter, |backend| {
            backend.search_details(&parse_filters(&filters)?, &terms)
        }),
        Commands::SearchGroup { filters, group } => with_backend(config, emitter, |backend| {
            backend.search_group(&parse_filters(&filters)?, &group)
        }),
        Commands::SearchFile { filters, path } => with_backend(config, emitter, |backend| {
            backend.search_file(&parse_filters(&filters)?, &path)
        }),
        Commands::GetPackages { filters } => with_backend(config, emitter, |backend| {
            backend.get_packages(&parse_filters(&filters)?)
        }),
        Commands::GetDetails { package_ids } => with_backend(config, emitter, |backend| {
            backend.get_details(&parse_ids(&package_ids)?)
        }),
        Commands::GetUpdateDetail { package_ids } => with_backend(config, emitter, |backend| {
            backend.get_update_detail(&parse_ids(&package_ids)?)
        }),
        Commands::GetUpdates { filters } => with_backend(config, emitter, |backend| {
            backend.get_updates(&parse_filters(&filters)?)
        }),
        Commands::GetDepends {
            filters,
            package_ids,
        } => with_backend(config, emitter, |backend| {
            backend.get_depends(&parse_filters(&filters)?, &parse_ids(&package_ids)?)
        }),
        Commands::GetFiles { package_ids } => with_backend(config, emitter, |backend| {
            backend.get_files(&parse_ids(&package_ids)?)
        }),
        Commands::InstallPackages {
            package_ids,
            simulate,
        } => with_backend(config, emitter, |backend| {
            backend.install_packages(&parse_ids(&package_ids)?, simulate)
        }),
        Commands::UpdatePackages {
            package_ids,
            simulate,
        } => with_backend(config, emitter, |backend| {
            backend.update_packages(&parse_ids(&package_ids)?, simulate)
        }),
        Commands::RemovePackages {
            allow_deps,
            package_ids,
            simulate,
        } => with_backend(config, emitter, |backend| {
            backend.remove_packages(allow_deps, &parse_ids(&package_ids)?, simulate)
        }),
        Commands::UpdateSystem { simulate } => {
            with_backend(config, emitter, |backend| backend.update_system(simulate))
        }
        Commands::RefreshCache { force } => {
            with_backend(config, emitter, |backend| backend.refresh_cache(force))
        }
        Commands::GetRepoList { filters } => with_backend(config, emitter, |backend| {
            backend.get_repo_list(&parse_filters(&filters)?)
        }),
        Commands::RepoEnable { repo_id, enabled } => with_backend(config, emitter, |backend| {
            backend.repo_enable(&repo_id, enabled)
        }),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "conary-pk", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// PackageKit error code for a failed run
fn error_code(err: &anyhow::Error) -> ErrorCode {
    err.downcast_ref::<conary_pk::Error>()
        .map(conary_pk::Error::code)
        .unwrap_or(ErrorCode::InternalError)
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the backend protocol
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = BackendConfig::new(cli.db_path).with_arch(cli.arch);

    // Completion scripts are not protocol output
    let protocol = !matches!(cli.command, Commands::Completions { .. });

    let mut emitter = LineEmitter::new(std::io::stdout().lock());
    match run(cli.command, &config, &mut emitter) {
        Ok(()) if !protocol => ExitCode::SUCCESS,
        Ok(()) => match emitter.emit(Event::Finished) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Failed to write output: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!("{:#}", e);
            let event = Event::Error {
                code: error_code(&e),
                details: e.to_string(),
            };
            if let Err(write_err) = emitter.emit(event) {
                error!("Failed to write output: {}", write_err);
            }
            ExitCode::FAILURE
        }
    }
}
