//! docsync CLI
//!
//! Drives the demo blog document from the command line: export its
//! snapshot, replay observer commands against it, and check that a mirror
//! fed with the published messages converges.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod blog;
mod commands;
mod config;

#[derive(Debug, Parser)]
#[command(name = "docsync")]
#[command(about = "docsync - authoritative document trees and their observers", long_about = None)]
struct Cli {
    /// Path to a TOML config file (defaults to ./docsync.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the demo document's snapshot
    Export(commands::export::ExportArgs),
    /// Apply a JSON-lines command file and print what gets published
    Replay(commands::replay::ReplayArgs),
    /// Replay commands and mirror every publish into an observer tree
    Sync(commands::sync::SyncArgs),
}

fn main() {
    let cli = Cli::parse();

    let settings = match config::Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    docsync_core::logging_facility::init(settings.logging.profile);

    let result = match cli.command {
        Commands::Export(args) => commands::export::execute(args, &settings),
        Commands::Replay(args) => commands::replay::execute(args, &settings),
        Commands::Sync(args) => commands::sync::execute(args, &settings),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
