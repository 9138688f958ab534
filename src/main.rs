use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use kzattend::{backup, config::Config, http, legacy, store::CollectionStore, telemetry};

#[derive(Parser)]
#[command(name = "kzattend", version, about = "Attendance tracking service")]
struct Cli {
    /// Directory holding one JSON file per collection.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service (default).
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Split a legacy single-file database into collection files.
    Migrate {
        #[arg(long)]
        legacy_db: Option<PathBuf>,
    },
    /// Write every collection into a zip bundle.
    Export { out: PathBuf },
    /// Restore collections from a zip bundle.
    Import { bundle: PathBuf },
}

#[tokio::main]
async fn main() {
    telemetry::init();
    if let Err(e) = run(Cli::parse()).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            http::serve(&config).await
        }
        Command::Migrate { legacy_db } => {
            let store = CollectionStore::open(&config.data_dir)?;
            let legacy_db = legacy_db.unwrap_or(config.legacy_db);
            let summary = legacy::init_data_dir(&store, &legacy_db)?;
            info!(
                migrated = summary.migrated.len(),
                skipped = summary.skipped.len(),
                failed = ?summary.failed,
                archived = ?summary.archived_to,
                "data directory ready"
            );
            Ok(())
        }
        Command::Export { out } => {
            let store = CollectionStore::open(&config.data_dir)?;
            let summary = backup::export_bundle(&store, &out)?;
            info!(
                format = %summary.bundle_format,
                entries = summary.entry_count,
                records = summary.record_count,
                out = %out.display(),
                "bundle exported"
            );
            Ok(())
        }
        Command::Import { bundle } => {
            let store = CollectionStore::open(&config.data_dir)?;
            let summary = backup::import_bundle(&bundle, &store)?;
            info!(
                format = %summary.bundle_format_detected,
                collections = summary.collections_restored.len(),
                "bundle imported"
            );
            Ok(())
        }
    }
}
