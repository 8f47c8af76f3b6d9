use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tsync")]
#[command(about = "Upsert tabular uploads into a workbook of tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tables of a workbook
    Tables {
        /// Workbook directory (one <table>.csv per table)
        #[arg(long)]
        store: PathBuf,
    },

    /// Print the header and first rows of a table
    Preview {
        #[arg(long)]
        store: PathBuf,

        #[arg(long)]
        table: String,

        /// Number of data rows to print
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },

    /// Reconcile an upload against the target table without writing
    Plan(UpsertArgs),

    /// Reconcile and apply: append new keys, rewrite changed rows, log the run
    Upsert(UpsertArgs),

    /// Print update log entries of a workbook
    History {
        #[arg(long)]
        store: PathBuf,

        #[arg(long = "log-table", default_value = tsync_audit::LOG_TABLE)]
        log_table: String,

        /// Only the most recent N entries
        #[arg(long)]
        last: Option<usize>,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> overrides)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Args, Debug)]
pub struct UpsertArgs {
    /// Layered config paths in merge order
    #[arg(long = "config", required = true)]
    pub config_paths: Vec<String>,

    /// Upload file (.csv, .json, .xlsx, .xlsm, .xls or .ods)
    #[arg(long)]
    pub file: PathBuf,

    /// Target table (overrides target.table)
    #[arg(long)]
    pub table: Option<String>,

    /// Matching column (overrides target.key_column)
    #[arg(long)]
    pub key: Option<String>,

    /// Comma-separated sync columns (overrides target.sync_columns)
    #[arg(long)]
    pub sync: Option<String>,

    /// Do not write the update log
    #[arg(long = "no-log", default_value_t = false)]
    pub no_log: bool,

    /// Fail on unknown config keys instead of warning
    #[arg(long = "strict-config", default_value_t = false)]
    pub strict_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present; silent when it does not exist.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Tables { store } => commands::inspect::tables(&store).await?,
        Commands::Preview { store, table, rows } => {
            commands::inspect::preview(&store, &table, rows).await?
        }
        Commands::Plan(args) => commands::upsert::plan(args).await?,
        Commands::Upsert(args) => commands::upsert::upsert(args).await?,
        Commands::History {
            store,
            log_table,
            last,
        } => commands::inspect::history(&store, &log_table, last).await?,
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = tsync_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries only `key=value` output.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
