//! linkdex CLI: shard planning and a synthetic benchmark of the link graph
//! and content index stores.
//!
//! Commands: shards, bench

use std::num::NonZeroU32;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use linkdex_core::partition;

mod bench;

#[derive(Parser)]
#[command(name = "linkdex")]
#[command(version)]
#[command(about = "Link graph and content index stores for a crawl pipeline")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the link id ranges splitting the id space into COUNT shards
    Shards {
        /// Number of shards
        count: NonZeroU32,
    },
    /// Build a synthetic graph, walk it by shard, then index, score and search it
    Bench(bench::BenchArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    match cli.command {
        Commands::Shards { count } => {
            for range in partition::ranges(count) {
                println!("{range}");
            }
            Ok(())
        }
        Commands::Bench(args) => bench::run(&args),
    }
}
