//! Concession store admin CLI
//!
//! Operates on the same SQLite snapshot the field application uses:
//! reconcile against the feature layer, replay pending edits, remove
//! duplicates, and move snapshots in and out.
//!
//! Usage:
//!   concession-admin --database concessions.db --layer-url https://host/.../FeatureServer/0 sync
//!   concession-admin --config admin.toml history --pending

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use concession_admin::{
    export_snapshot, format_action, format_record, import_snapshot, open_store, AdminConfig,
};
use concession_types::{ActorId, RecordId};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "concession-admin")]
#[command(about = "Inspect and reconcile the local concession record store")]
struct Args {
    /// TOML config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database holding the store snapshot
    #[arg(short, long, env = "CONCESSION_DB")]
    database: Option<PathBuf>,

    /// Feature layer URL of the remote service
    #[arg(long, env = "CONCESSION_LAYER_URL")]
    layer_url: Option<String>,

    /// Actor id recorded on history entries
    #[arg(long)]
    actor: Option<String>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all records
    List,
    /// Show the action history, newest first
    History {
        /// Only entries not yet propagated to the remote
        #[arg(long)]
        pending: bool,
        /// Maximum entries to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show what the remote layer accepts
    Capabilities,
    /// Fetch the remote snapshot and merge it into local state
    Reconcile,
    /// Replay edits that have not reached the remote
    Sync,
    /// Remove records with identical name, owner and boundary
    Dedupe,
    /// Write the store snapshot as JSON
    Export {
        /// Output file; stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace the store with a JSON snapshot
    Import {
        file: PathBuf,
    },
    /// Delete one record locally and, if reachable, remotely
    Delete {
        id: String,
    },
}

impl Args {
    fn resolve_config(&self) -> Result<AdminConfig> {
        let mut config = match &self.config {
            Some(path) => AdminConfig::load(path)?,
            None => AdminConfig::default(),
        };
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(layer_url) = &self.layer_url {
            config.remote.layer_url = layer_url.clone();
        }
        if let Some(actor) = &self.actor {
            config.actor = actor.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let config = args.resolve_config()?;
    let store = open_store(&config).await?;

    match args.command {
        Command::List => {
            for record in store.get_all_records().await {
                println!("{}", format_record(&record));
            }
        }
        Command::History { pending, limit } => {
            let actions = if pending {
                // Pending entries come oldest first; show newest first like history.
                let mut pending = store.pending_actions().await;
                pending.reverse();
                pending
            } else {
                store.get_history().await
            };
            for action in actions.iter().take(limit.unwrap_or(usize::MAX)) {
                println!("{}", format_action(action));
            }
        }
        Command::Capabilities => {
            let caps = store.remote_capabilities().await;
            println!(
                "create: {}, update: {}, delete: {}",
                caps.supports_create, caps.supports_update, caps.supports_delete
            );
            println!("remote editable: {}", caps.can_edit());
        }
        Command::Reconcile => {
            let report = store
                .reconcile_with_remote()
                .await
                .context("reconciling with remote")?;
            println!(
                "remote: {}, replaced: {}, local-only kept: {}, duplicates removed: {}",
                report.remote, report.replaced, report.preserved, report.duplicates_removed
            );
        }
        Command::Sync => {
            let report = store.sync_pending_changes().await;
            println!(
                "synced: {}, failed: {}, superseded: {}",
                report.synced, report.failed, report.superseded
            );
            if !report.success {
                warn!("{} actions remain pending", report.failed);
            }
        }
        Command::Dedupe => {
            let removed = store.remove_duplicates().await;
            println!("removed {} duplicates", removed);
        }
        Command::Export { output } => {
            let json = export_snapshot(&store, output.as_deref()).await?;
            if output.is_none() {
                println!("{}", json);
            }
        }
        Command::Import { file } => {
            let count = import_snapshot(&store, &file).await?;
            println!("imported {} records", count);
        }
        Command::Delete { id } => {
            let id = RecordId::from(id);
            store
                .delete(&id, &ActorId::from(config.actor.as_str()))
                .await
                .with_context(|| format!("deleting record {}", id))?;
            println!("deleted {}", id);
        }
    }

    if store.persistence_failures() > 0 {
        warn!(
            "{} snapshot writes failed; the database may be stale",
            store.persistence_failures()
        );
    }
    store.dispose().await;
    info!("Done");
    Ok(())
}
