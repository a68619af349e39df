//! Propscope operational CLI.
//!
//! `propscope precompute` rebuilds the aggregate tables after a data
//! load; `propscope inspect` prints what a store file contains.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use propscope_core::error::Result;
use propscope_query::precompute::rebuild_aggregates;
use propscope_store::{open_read_only, probe, StoreMetadata};

#[derive(Parser)]
#[command(name = "propscope", about = "Propscope store maintenance")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the precomputed aggregate tables and refresh planner
    /// statistics. Safe to re-run at any time.
    Precompute {
        /// Path to the store file
        #[arg(long)]
        db: PathBuf,
    },
    /// Print row counts, metadata, and aggregate-table summaries.
    Inspect {
        /// Path to the store file
        #[arg(long)]
        db: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Precompute { db } => precompute(&db),
        Commands::Inspect { db } => inspect(&db),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn precompute(db: &PathBuf) -> Result<()> {
    let mut conn = Connection::open(db)?;
    let summary = rebuild_aggregates(&mut conn)?;
    println!(
        "rebuilt aggregates: {} agents, {} monthly rows, {} property types, {} transaction types, {} towns",
        summary.agents,
        summary.monthly_rows,
        summary.property_types,
        summary.transaction_types,
        summary.towns
    );
    Ok(())
}

fn inspect(db: &PathBuf) -> Result<()> {
    let conn = open_read_only(db)?;
    let rows = probe(&conn)?;
    println!("transactions: {rows}");

    let meta = StoreMetadata::read(&conn)?;
    println!(
        "metadata: row_count={:?} column_count={:?} source_timestamp={:?}",
        meta.row_count, meta.column_count, meta.source_timestamp
    );

    for table in [
        "top_agents",
        "monthly_stats",
        "property_type_stats",
        "transaction_type_stats",
        "town_stats",
    ] {
        let count: std::result::Result<i64, _> =
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            });
        match count {
            Ok(n) => println!("{table}: {n} rows"),
            Err(_) => println!("{table}: not materialized"),
        }
    }
    Ok(())
}
