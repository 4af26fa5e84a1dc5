// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn filters_arg() -> Arg {
    Arg::new("filters")
        .required(true)
        .help("Filters, ';' separated ('none' for no filter)")
}

fn package_ids_arg() -> Arg {
    Arg::new("package_ids")
        .required(true)
        .num_args(1..)
        .help("Package ids (name;version;arch;data)")
}

fn simulate_arg() -> Arg {
    Arg::new("simulate")
        .long("simulate")
        .action(ArgAction::SetTrue)
        .help("Report what would happen without changing anything")
}

fn build_cli() -> Command {
    Command::new("conary-pk")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Conary Contributors")
        .about("PackageKit backend for the Conary package manager")
        .arg(
            Arg::new("db_path")
                .short('d')
                .long("db-path")
                .value_name("PATH")
                .global(true)
                .env("CONARY_PK_DB")
                .default_value("/var/lib/conary/conary.db")
                .help("Database path"),
        )
        .arg(
            Arg::new("arch")
                .long("arch")
                .global(true)
                .env("CONARY_PK_ARCH")
                .help("System architecture used to pick compatible flavors"),
        )
        .subcommand(Command::new("init").about("Initialize the Conary database"))
        .subcommand(
            Command::new("repo-add")
                .about("Add a channel (a Conary label and its metadata URL)")
                .arg(Arg::new("name").required(true).help("Channel name"))
                .arg(Arg::new("url").required(true).help("Metadata URL"))
                .arg(
                    Arg::new("priority")
                        .short('p')
                        .long("priority")
                        .default_value("0")
                        .help("Priority (higher = preferred)"),
                )
                .arg(
                    Arg::new("disabled")
                        .long("disabled")
                        .action(ArgAction::SetTrue)
                        .help("Add the channel disabled"),
                ),
        )
        .subcommand(
            Command::new("repo-remove")
                .about("Remove a channel and its cached metadata")
                .arg(Arg::new("name").required(true).help("Channel name")),
        )
        .subcommand(
            Command::new("resolve")
                .about("Resolve package names")
                .arg(filters_arg())
                .arg(Arg::new("names").required(true).num_args(1..).help("Package names")),
        )
        .subcommand(
            Command::new("search-name")
                .about("Search package names")
                .arg(filters_arg())
                .arg(Arg::new("terms").required(true)),
        )
        .subcommand(
            Command::new("search-details")
                .about("Search names, summaries and descriptions")
                .arg(filters_arg())
                .arg(Arg::new("terms").required(true)),
        )
        .subcommand(
            Command::new("search-group")
                .about("Search by PackageKit group")
                .arg(filters_arg())
                .arg(Arg::new("group").required(true)),
        )
        .subcommand(
            Command::new("search-file")
                .about("Find the package owning a file")
                .arg(filters_arg())
                .arg(Arg::new("path").required(true)),
        )
        .subcommand(
            Command::new("get-packages")
                .about("List every known package")
                .arg(filters_arg()),
        )
        .subcommand(
            Command::new("get-details")
                .about("Show package details")
                .arg(package_ids_arg()),
        )
        .subcommand(
            Command::new("get-update-detail")
                .about("Show update details")
                .arg(package_ids_arg()),
        )
        .subcommand(
            Command::new("get-updates")
                .about("List available updates")
                .arg(filters_arg()),
        )
        .subcommand(
            Command::new("get-depends")
                .about("Show what installing a package would pull in")
                .arg(filters_arg())
                .arg(package_ids_arg()),
        )
        .subcommand(
            Command::new("get-files")
                .about("List the files of a package")
                .arg(package_ids_arg()),
        )
        .subcommand(
            Command::new("install-packages")
                .about("Install packages")
                .arg(package_ids_arg())
                .arg(simulate_arg()),
        )
        .subcommand(
            Command::new("update-packages")
                .about("Update packages to the given versions")
                .arg(package_ids_arg())
                .arg(simulate_arg()),
        )
        .subcommand(
            Command::new("remove-packages")
                .about("Remove packages")
                .arg(
                    Arg::new("allow_deps")
                        .long("allow-deps")
                        .action(ArgAction::SetTrue)
                        .help("Also remove packages that depend on them"),
                )
                .arg(package_ids_arg())
                .arg(simulate_arg()),
        )
        .subcommand(
            Command::new("update-system")
                .about("Update every package with a newer version")
                .arg(simulate_arg()),
        )
        .subcommand(
            Command::new("refresh-cache")
                .about("Synchronize channel metadata")
                .arg(
                    Arg::new("force")
                        .short('f')
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Sync even if the metadata has not expired"),
                ),
        )
        .subcommand(
            Command::new("get-repo-list")
                .about("List channels")
                .arg(Arg::new("filters").default_value("none")),
        )
        .subcommand(
            Command::new("repo-enable")
                .about("Enable or disable a channel")
                .arg(Arg::new("repo_id").required(true))
                .arg(
                    Arg::new("enabled")
                        .required(true)
                        .value_parser(["true", "false"]),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("conary-pk.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
