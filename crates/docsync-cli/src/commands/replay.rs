//! Command replay
//!
//! Usage: docsync replay --commands <PATH> [--requester <NAME>] [--digest]
//!
//! Every published message is printed to stdout as one JSON line.
//! Denials and failed commands go to stderr; replay carries on after both.

use clap::Args;
use docsync_core::docsync_core_types::RequestContext;
use docsync_core::snapshot::export_snapshot;
use docsync_core::{apply_command, Denial, ExportOptions, Outbox, Side};
use std::path::PathBuf;

use super::{describe_denial, read_commands};
use crate::blog;
use crate::config::Settings;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// JSON-lines file of inbound commands
    #[arg(long)]
    pub commands: PathBuf,

    /// Sender of the commands: `author`, or any other name for an outsider
    #[arg(long, default_value = "author")]
    pub requester: String,

    /// Print the final snapshot digest after the last command
    #[arg(long)]
    pub digest: bool,
}

pub fn execute(args: ReplayArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let commands = read_commands(&args.commands)?;

    let mut registry = settings.registry(Side::Authoritative);
    let blog = blog::build(&mut registry)?;
    let requester = blog::requester(&mut registry, &blog, &args.requester)?;
    let outbox = Outbox::attach(&mut registry, blog.app)?;

    let mut failed = 0usize;
    for (line, command) in &commands {
        let ctx = RequestContext::new();
        let mut denials: Vec<Denial> = Vec::new();
        if let Err(e) = apply_command(&mut registry, command, &requester, &mut denials, &ctx) {
            failed += 1;
            eprintln!("error: line {}: {}", line, e);
        }
        for denial in &denials {
            eprintln!("line {}: {}", line, describe_denial(&registry, denial));
        }
        for message in outbox.drain() {
            println!("{}", serde_json::to_string(&message)?);
        }
    }

    tracing::info!(
        commands = commands.len(),
        failed,
        nodes = registry.len(),
        "Replay finished"
    );

    if args.digest {
        let snapshot = export_snapshot(&registry, blog.app, ExportOptions::default())?;
        println!("{}", snapshot.digest()?);
    }
    Ok(())
}
