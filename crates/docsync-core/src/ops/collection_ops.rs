use serde_json::Value;
use std::sync::Arc;

use super::model_ops::{self, SetOptions};
use crate::bubbling::{self, LocalEvent};
use crate::capability::CollectionType;
use crate::errors::{DocSyncError, Result};
use crate::model::{Attributes, CollectionNode, Node, NodeId, NodeRef, Owner};
use crate::registry::Registry;

/// Create and register an empty collection
///
/// # Errors
/// * `DuplicateIdentifier` - only with a misbehaving identifier source
pub fn create_collection(
    registry: &mut Registry,
    kind: Arc<dyn CollectionType>,
) -> Result<NodeRef> {
    let node = registry.allocate(Node::Collection(CollectionNode::new(kind)));
    if let Err(err) = registry.register(node) {
        registry.discard(node);
        return Err(err);
    }
    Ok(node)
}

/// Append a model and publish an `add`
///
/// # Errors
/// * `AlreadyAttached` - the model belongs to another parent
/// * `CycleDetected` - the model is an ancestor of the collection
pub fn add(registry: &mut Registry, collection: NodeRef, model: NodeRef) -> Result<()> {
    add_with(registry, collection, model, false)
}

pub(crate) fn add_with(
    registry: &mut Registry,
    collection: NodeRef,
    model: NodeRef,
    silent: bool,
) -> Result<()> {
    let coll = registry.collection(collection)?;
    let attachable = match registry.model(model)?.owner.as_ref() {
        None => true,
        Some(Owner::Collection(pending)) => {
            *pending == collection && !coll.items.contains(&model)
        }
        Some(Owner::Model { .. }) => false,
    };
    if !attachable {
        return Err(DocSyncError::AlreadyAttached {
            node: registry.describe(model),
        });
    }
    if registry.ancestry(collection).contains(&model) {
        return Err(DocSyncError::CycleDetected {
            node: registry.describe(model),
            collection: registry.describe(collection),
        });
    }

    registry.collection_mut(collection)?.items.push(model);
    registry.model_mut(model)?.owner = Some(Owner::Collection(collection));
    resolve_radio_on_add(registry, collection, model)?;

    if !silent {
        bubbling::raise(registry, LocalEvent::Add { collection, model })?;
    }
    Ok(())
}

/// Create a model of the collection's element type and append it
///
/// # Errors
/// * anything [`model_ops::create_model`] or [`add`] returns
pub fn add_new(registry: &mut Registry, collection: NodeRef, attrs: Attributes) -> Result<NodeRef> {
    let element = registry.collection(collection)?.kind.element_type();
    let model = model_ops::create_model(registry, element, attrs)?;
    if let Err(err) = add(registry, collection, model) {
        registry.discard(model);
        return Err(err);
    }
    Ok(model)
}

/// Take a model out of the collection and publish a `remove`
///
/// The model stays registered; see [`Registry::unregister`]. Returns
/// `false` without raising anything if the model is not a member.
///
/// # Errors
/// * `StaleHandle` / `WrongNodeKind` - `collection` is not a live collection
pub fn remove(registry: &mut Registry, collection: NodeRef, model: NodeRef) -> Result<bool> {
    let coll = registry.collection_mut(collection)?;
    let Some(position) = coll.position_of(model) else {
        return Ok(false);
    };
    coll.items.remove(position);
    registry.model_mut(model)?.owner = None;
    let id = registry.identifier(model).cloned();
    bubbling::raise(registry, LocalEvent::Remove { collection, id })?;
    Ok(true)
}

/// Move the member with identifier `id` to `new_position`
///
/// Unknown identifiers and non-members are ignored. Positions past the end
/// are clamped to the last index. Returns `false` without raising anything
/// when the member already sits at the target index.
///
/// # Errors
/// * `StaleHandle` / `WrongNodeKind` - `collection` is not a live collection
pub fn move_item(
    registry: &mut Registry,
    collection: NodeRef,
    id: &str,
    new_position: usize,
) -> Result<bool> {
    let Some(model) = registry.lookup(id) else {
        return Ok(false);
    };
    let coll = registry.collection_mut(collection)?;
    let Some(current) = coll.position_of(model) else {
        return Ok(false);
    };
    let target = new_position.min(coll.items.len() - 1);
    if target == current {
        return Ok(false);
    }
    coll.items.remove(current);
    coll.items.insert(target, model);

    bubbling::raise(
        registry,
        LocalEvent::Move {
            collection,
            id: NodeId::new(id),
            new_position: target,
        },
    )?;
    Ok(true)
}

/// Members whose attribute `name` equals `value`, in position order
///
/// # Errors
/// * `StaleHandle` / `WrongNodeKind` - `collection` is not a live collection
pub fn filter_by_attribute(
    registry: &Registry,
    collection: NodeRef,
    name: &str,
    value: &Value,
) -> Result<Vec<NodeRef>> {
    let mut matches = Vec::new();
    for item in registry.items(collection)? {
        if registry.attributes(*item)?.get(name) == Some(value) {
            matches.push(*item);
        }
    }
    Ok(matches)
}

/// First member whose attribute `name` equals `value`
///
/// # Errors
/// * `StaleHandle` / `WrongNodeKind` - `collection` is not a live collection
pub fn find_by_attribute(
    registry: &Registry,
    collection: NodeRef,
    name: &str,
    value: &Value,
) -> Result<Option<NodeRef>> {
    for item in registry.items(collection)? {
        if registry.attributes(*item)?.get(name) == Some(value) {
            return Ok(Some(*item));
        }
    }
    Ok(None)
}

/// Apply the same attributes to every member, each publishing its own change
///
/// # Errors
/// * anything [`model_ops::set_attributes`] returns; earlier members stay updated
pub fn set_all(registry: &mut Registry, collection: NodeRef, attrs: &Attributes) -> Result<()> {
    let items = registry.items(collection)?.to_vec();
    for item in items {
        model_ops::set_attributes(registry, item, attrs.clone())?;
    }
    Ok(())
}

/// After `changed` was committed on `model`, clear radio attributes on the
/// other members of its collection
pub(crate) fn enforce_radio_groups(
    registry: &mut Registry,
    model: NodeRef,
    changed: &[String],
) -> Result<()> {
    let Some(collection) = member_of(registry, model) else {
        return Ok(());
    };
    let kind = registry.collection(collection)?.kind.clone();
    for attribute in kind.radio_attributes() {
        if !changed.iter().any(|key| key == attribute) {
            continue;
        }
        if !registry.attributes(model)?.is_truthy(attribute) {
            continue;
        }
        let losers: Vec<NodeRef> = truthy_members(registry, collection, attribute)?
            .into_iter()
            .filter(|member| *member != model)
            .collect();
        for loser in losers {
            tracing::debug!(
                collection = %collection,
                node = %loser,
                attribute = *attribute,
                "Clearing radio attribute"
            );
            model_ops::set_attribute(registry, loser, attribute, false)?;
        }
    }
    Ok(())
}

/// A newcomer loses every radio attribute some other member already holds
fn resolve_radio_on_add(registry: &mut Registry, collection: NodeRef, model: NodeRef) -> Result<()> {
    let kind = registry.collection(collection)?.kind.clone();
    for attribute in kind.radio_attributes() {
        if truthy_members(registry, collection, attribute)?.len() > 1
            && registry.attributes(model)?.is_truthy(attribute)
        {
            model_ops::set_attributes_with(
                registry,
                model,
                Attributes::new().with(*attribute, false),
                SetOptions { silent: true },
            )?;
        }
    }
    Ok(())
}

fn truthy_members(registry: &Registry, collection: NodeRef, attribute: &str) -> Result<Vec<NodeRef>> {
    let mut members = Vec::new();
    for item in registry.items(collection)? {
        if registry.attributes(*item)?.is_truthy(attribute) {
            members.push(*item);
        }
    }
    Ok(members)
}

/// Collection that currently lists `model` as a member
pub fn member_of(registry: &Registry, model: NodeRef) -> Option<NodeRef> {
    let collection = registry.owning_collection(model)?;
    registry
        .collection(collection)
        .ok()?
        .items
        .contains(&model)
        .then_some(collection)
}
