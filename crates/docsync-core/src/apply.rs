//! Message application
//!
//! Two directions, one file:
//! - [`apply_command`] runs an inbound [`Command`] through the gate on the
//!   authoritative side.
//! - [`apply_published`] replays an outbound [`PublishMessage`] onto an
//!   observer's mirror of the tree.
//!
//! Both resolve identifiers through the registry and log one start/end
//! pair per message, tagged with the request id.

use docsync_core_types::RequestContext;

use crate::bubbling::PublishMessage;
use crate::capability::Requester;
use crate::commands::Command;
use crate::errors::Result;
use crate::gate::{self, DenialSink};
use crate::model::{Attributes, ID_ATTRIBUTE};
use crate::ops::{collection_ops, model_ops};
use crate::registry::Registry;
use crate::snapshot::{codec, CollectionSnapshot, ImportOptions};
use crate::{log_op_end, log_op_error, log_op_start};

/// Apply an untrusted command on behalf of `requester`
///
/// Returns whether the command changed anything. Denials go to `sink`.
///
/// # Errors
/// * `NodeNotFound` - the command names an unknown identifier
/// * `WrongNodeKind` - e.g. an `add` naming a model instead of a collection
/// * `TypeMismatch` - accepted attributes fail the schema
pub fn apply_command(
    registry: &mut Registry,
    command: &Command,
    requester: &Requester,
    sink: &mut dyn DenialSink,
    ctx: &RequestContext,
) -> Result<bool> {
    log_op_start!(
        "apply_command",
        request_id = %ctx.request_id,
        command = command.event(),
        node_id = %command.target(),
        requester = %requester
    );
    let start = std::time::Instant::now();

    let applied = dispatch_command(registry, command, requester, sink).map_err(|e| {
        log_op_error!(
            "apply_command",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            request_id = %ctx.request_id
        );
        e
    })?;

    log_op_end!(
        "apply_command",
        duration_ms = start.elapsed().as_millis() as u64,
        request_id = %ctx.request_id,
        applied = applied
    );
    Ok(applied)
}

fn dispatch_command(
    registry: &mut Registry,
    command: &Command,
    requester: &Requester,
    sink: &mut dyn DenialSink,
) -> Result<bool> {
    match command {
        Command::Set { id, change } => {
            let model = registry.resolve(id.as_str())?;
            gate::safe_set(registry, model, change.clone(), requester, sink)
        }
        Command::Unset { id, property } => {
            let model = registry.resolve(id.as_str())?;
            gate::safe_unset(registry, model, property, requester, sink)
        }
        Command::Delete { id } => {
            let model = registry.resolve(id.as_str())?;
            gate::safe_delete(registry, model, requester, sink)
        }
        Command::Add { id, data } => {
            let collection = registry.resolve(id.as_str())?;
            Ok(gate::safe_add(registry, collection, data.clone(), requester, sink)?.is_some())
        }
        Command::Move {
            collection,
            id,
            new_position,
        } => {
            let collection = registry.resolve(collection.as_str())?;
            gate::safe_move(registry, collection, id.as_str(), *new_position, requester, sink)
        }
        Command::Method { id, method } => {
            let model = registry.resolve(id.as_str())?;
            gate::safe_call(registry, model, method, requester, sink)
        }
    }
}

/// Mirror a published message onto an observer tree
///
/// Messages are trusted here: they come from the authoritative side. The
/// mirror raises the same local events, so its own listeners see every
/// change. Removing or moving something already gone is a no-op, as is
/// adding a member that is already present.
///
/// # Errors
/// * `NodeNotFound` - a change or add targets an unknown identifier
pub fn apply_published(
    registry: &mut Registry,
    message: &PublishMessage,
    ctx: &RequestContext,
) -> Result<bool> {
    log_op_start!(
        "apply_published",
        request_id = %ctx.request_id,
        publish_event = message.event()
    );
    let start = std::time::Instant::now();

    let applied = mirror(registry, message).map_err(|e| {
        log_op_error!(
            "apply_published",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            request_id = %ctx.request_id
        );
        e
    })?;

    log_op_end!(
        "apply_published",
        duration_ms = start.elapsed().as_millis() as u64,
        request_id = %ctx.request_id,
        applied = applied
    );
    Ok(applied)
}

fn mirror(registry: &mut Registry, message: &PublishMessage) -> Result<bool> {
    match message {
        PublishMessage::Change { id, data } => {
            let Some(id) = id else {
                return Ok(false);
            };
            let model = registry.resolve(id.as_str())?;
            let mut attrs: Attributes = data.clone();
            attrs.remove(ID_ATTRIBUTE);
            model_ops::replace_attributes(registry, model, attrs)
        }
        PublishMessage::Add { data, collection } => {
            let Some(collection_id) = collection else {
                return Ok(false);
            };
            let collection = registry.resolve(collection_id.as_str())?;
            let before = registry.items(collection)?.len();
            codec::import_collection(
                registry,
                collection,
                &CollectionSnapshot {
                    id: Some(collection_id.clone()),
                    models: vec![data.clone()],
                },
                ImportOptions::default(),
            )?;
            Ok(registry.items(collection)?.len() > before)
        }
        PublishMessage::Remove { id } => {
            let Some(model) = id.as_ref().and_then(|id| registry.lookup(id.as_str())) else {
                return Ok(false);
            };
            let Some(collection) = collection_ops::member_of(registry, model) else {
                return Ok(false);
            };
            collection_ops::remove(registry, collection, model)?;
            registry.unregister(model)?;
            Ok(true)
        }
        PublishMessage::Move {
            collection,
            id,
            new_position,
        } => {
            let Some(collection) = collection.as_ref().and_then(|c| registry.lookup(c.as_str()))
            else {
                return Ok(false);
            };
            collection_ops::move_item(registry, collection, id.as_str(), *new_position)
        }
    }
}
