//! blocksync command line: run a server, sync a directory, inspect an index.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use blocksync::core::{encode_record, FileContent};
use blocksync::{node, ClientConfig, ServerConfig};

#[derive(Parser)]
#[command(name = "blocksync")]
#[command(version)]
#[command(about = "Content-addressed, versioned directory sync")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the block and metadata server
    Serve {
        /// JSON config file; flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address to listen on
        #[arg(short, long)]
        listen: Option<String>,

        /// SQLite database path (in-memory if omitted)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Run one sync pass of a directory
    Sync {
        /// JSON config file; flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Server address
        #[arg(short, long)]
        server: Option<String>,

        /// Directory to sync
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Block size in bytes
        #[arg(short, long)]
        block_size: Option<usize>,
    },

    /// Print the index of a synced directory
    PrintIndex {
        /// Synced directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve {
            config,
            listen,
            database,
        } => {
            let mut config = match config {
                Some(path) => ServerConfig::from_json_file(path)?,
                None => ServerConfig::default(),
            };
            if let Some(listen) = listen {
                config.listen_addr = listen;
            }
            if database.is_some() {
                config.database = database;
            }

            node::run_server(&config, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "failed to listen for ctrl-c");
                }
            })
            .await
            .context("server failed")?;
        }

        Commands::Sync {
            config,
            server,
            dir,
            block_size,
        } => {
            let mut config = match config {
                Some(path) => ClientConfig::from_json_file(path)?,
                None => ClientConfig::default(),
            };
            if let Some(server) = server {
                config.server_addr = server;
            }
            if let Some(dir) = dir {
                config.base_dir = dir;
            }
            if let Some(block_size) = block_size {
                config.block_size = block_size;
            }

            let report = node::sync_once(&config)
                .await
                .with_context(|| format!("sync of {} failed", config.base_dir.display()))?;

            info!(
                downloaded = report.downloaded.len(),
                uploaded = report.uploaded.len(),
                deleted = report.deleted.len(),
                removed = report.removed.len(),
                conflicts = report.conflicts.len(),
                deferred = report.deferred.len(),
                "sync finished"
            );
            for failure in &report.failures {
                warn!(file = %failure.filename, error = %failure.error, "file not synced");
            }
            if !report.failures.is_empty() {
                anyhow::bail!("{} file(s) failed to sync", report.failures.len());
            }
        }

        Commands::PrintIndex { dir } => {
            let index = node::read_index(&dir)
                .with_context(|| format!("failed to read index in {}", dir.display()))?;

            println!("--- index of {} ---", dir.display());
            for meta in index.values() {
                let state = match meta.content {
                    FileContent::Live(ref hashes) => format!("{} blocks", hashes.len()),
                    FileContent::Tombstone => "deleted".to_string(),
                };
                println!("{:<40} v{:<6} {}", meta.filename, meta.version, state);
                tracing::debug!(record = %encode_record(meta), "index record");
            }
            println!("--- {} entries ---", index.len());
        }
    }

    Ok(())
}
