//! Snapshot export command
//!
//! Usage: docsync export [--digest] [--shallow] [--output <PATH>]

use clap::Args;
use docsync_core::snapshot::export_snapshot;
use docsync_core::{ExportOptions, Side};
use std::path::PathBuf;

use crate::blog;
use crate::config::Settings;

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Print only the snapshot digest
    #[arg(long)]
    pub digest: bool,

    /// Leave out child collections and models
    #[arg(long)]
    pub shallow: bool,

    /// Write the snapshot to a file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn execute(args: ExportArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = settings.registry(Side::Authoritative);
    let blog = blog::build(&mut registry)?;

    let snapshot = export_snapshot(
        &registry,
        blog.app,
        ExportOptions {
            recurse: !args.shallow,
        },
    )?;

    if args.digest {
        println!("{}", snapshot.digest()?);
        return Ok(());
    }

    let json = serde_json::to_string_pretty(&snapshot)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, json)?;
            tracing::info!(path = %path.display(), nodes = registry.len(), "Snapshot written");
        }
        None => println!("{}", json),
    }
    Ok(())
}
