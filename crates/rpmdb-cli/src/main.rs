use anyhow::{bail, Result};
use clap::Parser;
use rpmdb::{CancelToken, RpmDb};
use std::path::{Path, PathBuf};

/// Database locations probed when no path is given, newest format first.
const DEFAULT_PATHS: [&str; 3] = ["./rpmdb.sqlite", "./Packages.db", "./Packages"];

#[derive(Parser)]
#[command(name = "rpmdb", about = "RPM package database reader")]
struct Cli {
    /// Database file to read. Without it, ./rpmdb.sqlite, ./Packages.db and
    /// ./Packages are probed in order.
    path: Option<PathBuf>,

    /// Print packages as JSON, one object per line.
    #[arg(long)]
    json: bool,

    /// Also list the installed files of every package.
    #[arg(long)]
    files: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let db = open_database(cli.path.as_deref())?;
    let cancel = CancelToken::new();
    let packages = db.list_packages(&cancel)?;

    for pkg in &packages {
        if cli.json {
            println!("{}", serde_json::to_string(pkg)?);
        } else {
            println!("{:?}", pkg);
        }
        if cli.files {
            for file in pkg.installed_files()? {
                println!(
                    "  {:o} {}:{} {:>9} {} {}",
                    file.mode, file.username, file.groupname, file.size, file.flags, file.path
                );
            }
        }
    }
    Ok(())
}

/// Open the given path, or probe the default locations in order.
///
/// Every candidate's failure is kept so a total miss reports them all.
fn open_database(path: Option<&Path>) -> Result<RpmDb> {
    let candidates: Vec<PathBuf> = match path {
        Some(p) => vec![p.to_path_buf()],
        None => DEFAULT_PATHS.iter().map(PathBuf::from).collect(),
    };

    let mut failures = Vec::new();
    for candidate in &candidates {
        log::debug!("trying {}", candidate.display());
        match RpmDb::open(candidate) {
            Ok(db) => {
                log::debug!("opened {}", candidate.display());
                return Ok(db);
            }
            Err(err) => failures.push(format!("{}: {}", candidate.display(), err)),
        }
    }
    bail!("no readable package database: {}", failures.join("; "));
}
