//! Owner/mirror convergence check
//!
//! Usage: docsync sync [--commands <PATH>] [--requester <NAME>]
//!
//! Builds the demo document on the authoritative side and an empty mirror
//! on the observer side, imports the initial snapshot into the mirror, then
//! replays the commands on the owner while forwarding every published
//! message to the mirror. Fails if the two trees end up different.

use clap::Args;
use docsync_core::docsync_core_types::RequestContext;
use docsync_core::snapshot::{export_snapshot, import_snapshot};
use docsync_core::{
    apply_command, apply_published, ExportOptions, IgnoreDenials, ImportOptions, Outbox, Side,
};
use std::path::PathBuf;

use super::read_commands;
use crate::blog;
use crate::config::Settings;

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// JSON-lines file of inbound commands (initial sync only when absent)
    #[arg(long)]
    pub commands: Option<PathBuf>,

    /// Sender of the commands: `author`, or any other name for an outsider
    #[arg(long, default_value = "author")]
    pub requester: String,
}

pub fn execute(args: SyncArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let commands = match &args.commands {
        Some(path) => read_commands(path)?,
        None => Vec::new(),
    };

    let mut owner = settings.registry(Side::Authoritative);
    let source = blog::build(&mut owner)?;
    let requester = blog::requester(&mut owner, &source, &args.requester)?;
    let outbox = Outbox::attach(&mut owner, source.app)?;

    let mut mirror = settings.registry(Side::Observer);
    let target = blog::empty(&mut mirror)?;
    let initial = export_snapshot(&owner, source.app, ExportOptions::default())?;
    import_snapshot(&mut mirror, target.app, &initial, ImportOptions { silent: true })?;

    let mut forwarded = 0usize;
    for (line, command) in &commands {
        let ctx = RequestContext::new();
        if let Err(e) = apply_command(&mut owner, command, &requester, &mut IgnoreDenials, &ctx) {
            eprintln!("error: line {}: {}", line, e);
        }
        for message in outbox.drain() {
            apply_published(&mut mirror, &message, &ctx)
                .map_err(|e| format!("Mirror rejected message from line {}: {}", line, e))?;
            forwarded += 1;
        }
    }

    let owner_digest = export_snapshot(&owner, source.app, ExportOptions::default())?.digest()?;
    let mirror_digest =
        export_snapshot(&mirror, target.app, ExportOptions::default())?.digest()?;

    println!("messages: {}", forwarded);
    println!("owner:    {}", owner_digest);
    println!("mirror:   {}", mirror_digest);

    if owner_digest != mirror_digest {
        return Err("Mirror diverged from the authoritative tree".into());
    }
    println!("converged");
    Ok(())
}
