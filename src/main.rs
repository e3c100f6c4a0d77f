use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use nanoassay::pipeline::{self, Experiment};
use nanoassay::server::{self, AppState};
use nanoassay::{Config, SqliteStore};

#[derive(Parser)]
#[command(name = "nanoassay")]
#[command(about = "Formulation screening assay ingestion service")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the upload and reporting web service
    Serve {
        /// Override the listen address from config.toml
        #[arg(long)]
        listen: Option<String>,
    },
    /// Process a single measurement file from disk and persist its results
    Process {
        /// Path to a .csv (Zeta) or .xlsx/.xls (TNS) export
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    let _log_guard = nanoassay::logging::init_logging(&config.log_dir);

    match cli.command {
        Commands::Serve { listen } => {
            if let Some(listen) = listen {
                config.listen_addr = listen;
            }
            std::fs::create_dir_all(&config.upload_dir)?;
            let store = Arc::new(SqliteStore::open(&config.database_path)?);
            let state = AppState {
                store,
                config: Arc::new(config),
            };
            server::serve(state).await?;
        }
        Commands::Process { file } => {
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let Some(experiment) = Experiment::from_filename(&filename) else {
                anyhow::bail!("unsupported file type: {filename} (expected .csv, .xlsx or .xls)");
            };

            let store = Arc::new(SqliteStore::open(&config.database_path)?);
            let outcome = pipeline::ingest_file(store, &config, experiment, &file).await?;

            info!("processing finished");
            println!("📊 Upload accepted for {}:", outcome.experiment.table_name());
            println!("   Formulations persisted: {}", outcome.formulations);
        }
    }

    Ok(())
}
