use serde_json::Value;
use std::sync::Arc;

use super::collection_ops;
use crate::bubbling::{self, LocalEvent};
use crate::capability::{CollectionType, ModelType};
use crate::errors::{DocSyncError, Result};
use crate::model::schema;
use crate::model::{Attributes, ModelNode, Node, NodeId, NodeRef, Owner, ID_ATTRIBUTE};
use crate::registry::Registry;

/// Options for [`set_attributes_with`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOptions {
    /// Commit without radio enforcement and without raising events
    pub silent: bool,
}

/// Create and register a model
///
/// The initial attributes are validated and applied silently, then the
/// type's `initialize` hook declares the children. If any step fails the
/// partially built node is discarded.
///
/// # Arguments
/// * `registry` - Registry that will own the node
/// * `kind` - Model type
/// * `attrs` - Initial attributes (must not contain `id`)
///
/// # Returns
/// Handle of the new model
///
/// # Errors
/// * `ReservedAttribute` - `attrs` contains `id`
/// * `TypeMismatch` - a required attribute has the wrong type
/// * anything the `initialize` hook returns
pub fn create_model(
    registry: &mut Registry,
    kind: Arc<dyn ModelType>,
    attrs: Attributes,
) -> Result<NodeRef> {
    build_model(registry, kind, attrs, None)
}

/// Like [`create_model`], adopting a known identifier instead of minting one
pub(crate) fn build_model(
    registry: &mut Registry,
    kind: Arc<dyn ModelType>,
    attrs: Attributes,
    id: Option<NodeId>,
) -> Result<NodeRef> {
    let node = registry.allocate(Node::Model(ModelNode::new(kind.clone())));
    match populate(registry, node, kind.as_ref(), attrs, id) {
        Ok(()) => Ok(node),
        Err(err) => {
            registry.discard(node);
            Err(err)
        }
    }
}

fn populate(
    registry: &mut Registry,
    node: NodeRef,
    kind: &dyn ModelType,
    attrs: Attributes,
    id: Option<NodeId>,
) -> Result<()> {
    match id {
        Some(id) => registry.assign_id(node, id)?,
        None => {
            registry.register(node)?;
        }
    }
    set_attributes_with(registry, node, attrs, SetOptions { silent: true })?;
    kind.initialize(registry, node)
}

/// Set attributes and publish the change
///
/// See [`set_attributes_with`].
///
/// # Errors
/// * `ReservedAttribute` - `attrs` contains `id`
/// * `TypeMismatch` - a required attribute has the wrong type
pub fn set_attributes(registry: &mut Registry, model: NodeRef, attrs: Attributes) -> Result<bool> {
    set_attributes_with(registry, model, attrs, SetOptions::default())
}

/// Set a single attribute and publish the change
///
/// # Errors
/// * `ReservedAttribute` - `key` is `id`
/// * `TypeMismatch` - `key` is required and `value` has the wrong type
pub fn set_attribute(
    registry: &mut Registry,
    model: NodeRef,
    key: &str,
    value: impl Into<Value>,
) -> Result<bool> {
    set_attributes(registry, model, Attributes::new().with(key, value))
}

/// Set attributes as one atomic batch
///
/// The whole batch is validated before anything is written. Only values
/// that differ from the current ones count as changes; when nothing
/// changes, nothing is raised. Otherwise, unless silent, radio groups of
/// the owning collection are enforced first and then one `Change` is
/// raised on the model.
///
/// Returns whether any value changed.
///
/// # Errors
/// * `ReservedAttribute` - `attrs` contains `id`
/// * `TypeMismatch` - a required attribute has the wrong type
pub fn set_attributes_with(
    registry: &mut Registry,
    model: NodeRef,
    attrs: Attributes,
    options: SetOptions,
) -> Result<bool> {
    let changed = commit(registry, model, attrs)?;
    if changed.is_empty() {
        return Ok(false);
    }
    tracing::debug!(node = %model, changed = ?changed, silent = options.silent, "Attributes set");

    if !options.silent {
        collection_ops::enforce_radio_groups(registry, model, &changed)?;
        bubbling::raise(registry, LocalEvent::Change { node: model })?;
    }
    Ok(true)
}

/// Make `attrs` the model's complete attribute set, as one change
///
/// Keys missing from `attrs` are dropped without a required-attribute
/// check. Used to mirror a published `change`, which always carries the
/// full set.
///
/// # Errors
/// * `ReservedAttribute` - `attrs` contains `id`
/// * `TypeMismatch` - a required attribute has the wrong type
pub fn replace_attributes(registry: &mut Registry, model: NodeRef, attrs: Attributes) -> Result<bool> {
    let stale: Vec<String> = registry
        .attributes(model)?
        .keys()
        .filter(|key| !attrs.contains_key(key.as_str()))
        .cloned()
        .collect();
    let mut changed = commit(registry, model, attrs)?;
    let node = registry.model_mut(model)?;
    for key in stale {
        node.attributes.remove(&key);
        changed.push(key);
    }
    if changed.is_empty() {
        return Ok(false);
    }
    tracing::debug!(node = %model, changed = ?changed, "Attributes replaced");

    collection_ops::enforce_radio_groups(registry, model, &changed)?;
    bubbling::raise(registry, LocalEvent::Change { node: model })?;
    Ok(true)
}

/// Validate the batch, then write the values that differ
///
/// Returns the keys that changed.
fn commit(registry: &mut Registry, model: NodeRef, attrs: Attributes) -> Result<Vec<String>> {
    if attrs.contains_key(ID_ATTRIBUTE) {
        return Err(DocSyncError::ReservedAttribute {
            attribute: ID_ATTRIBUTE.to_string(),
        });
    }

    let kind = registry.model(model)?.kind.clone();
    for (key, tag) in kind.required() {
        if let Some(value) = attrs.get(key) {
            schema::validate(*tag, Some(value), key, kind.type_name())?;
        }
    }

    let node = registry.model_mut(model)?;
    let mut changed = Vec::new();
    for (key, value) in attrs {
        if node.attributes.get(&key) != Some(&value) {
            node.attributes.insert(key.clone(), value);
            changed.push(key);
        }
    }
    Ok(changed)
}

/// Read one attribute
///
/// # Errors
/// * `StaleHandle` / `WrongNodeKind` - `model` is not a live model
pub fn get<'a>(registry: &'a Registry, model: NodeRef, name: &str) -> Result<Option<&'a Value>> {
    Ok(registry.attributes(model)?.get(name))
}

/// Remove an attribute and publish the change
///
/// Returns `false` (and raises nothing) when the attribute was not set.
///
/// # Errors
/// * `ReservedAttribute` - `name` is `id`
/// * `TypeMismatch` - `name` is a required attribute
pub fn unset_attribute(registry: &mut Registry, model: NodeRef, name: &str) -> Result<bool> {
    if name == ID_ATTRIBUTE {
        return Err(DocSyncError::ReservedAttribute {
            attribute: name.to_string(),
        });
    }
    let kind = registry.model(model)?.kind.clone();
    if let Some((key, tag)) = kind.required().iter().find(|(key, _)| *key == name) {
        schema::validate(*tag, None, key, kind.type_name())?;
    }
    if registry.model_mut(model)?.attributes.remove(name).is_none() {
        return Ok(false);
    }
    bubbling::raise(registry, LocalEvent::Change { node: model })?;
    Ok(true)
}

/// Flip an attribute's truthiness; unset counts as false
///
/// Returns the new value.
///
/// # Errors
/// * `ReservedAttribute` - `name` is `id`
/// * `TypeMismatch` - `name` is required and not boolean
pub fn toggle_attribute(registry: &mut Registry, model: NodeRef, name: &str) -> Result<bool> {
    let next = !registry.attributes(model)?.is_truthy(name);
    set_attribute(registry, model, name, next)?;
    Ok(next)
}

/// Declare a named child collection
///
/// # Errors
/// * `DuplicateChildLabel` - `label` is already used on `parent`
pub fn add_child_collection(
    registry: &mut Registry,
    parent: NodeRef,
    label: &str,
    kind: Arc<dyn CollectionType>,
) -> Result<NodeRef> {
    ensure_label_free(registry, parent, label)?;
    let child = collection_ops::create_collection(registry, kind)?;
    registry.collection_mut(child)?.owner = Some((parent, label.to_string()));
    registry
        .model_mut(parent)?
        .child_collections
        .push((label.to_string(), child));
    Ok(child)
}

/// Declare a named child model
///
/// # Errors
/// * `DuplicateChildLabel` - `label` is already used on `parent`
/// * anything [`create_model`] returns
pub fn add_child_model(
    registry: &mut Registry,
    parent: NodeRef,
    label: &str,
    kind: Arc<dyn ModelType>,
    attrs: Attributes,
) -> Result<NodeRef> {
    ensure_label_free(registry, parent, label)?;
    let child = create_model(registry, kind, attrs)?;
    registry.model_mut(child)?.owner = Some(Owner::Model {
        parent,
        label: label.to_string(),
    });
    registry
        .model_mut(parent)?
        .child_models
        .push((label.to_string(), child));
    Ok(child)
}

fn ensure_label_free(registry: &Registry, parent: NodeRef, label: &str) -> Result<()> {
    let node = registry.model(parent)?;
    let taken = node
        .child_collections
        .iter()
        .chain(node.child_models.iter())
        .any(|(existing, _)| existing == label);
    if taken {
        return Err(DocSyncError::DuplicateChildLabel {
            node: registry.describe(parent),
            label: label.to_string(),
        });
    }
    Ok(())
}

/// Check that every required attribute is present with the right type
///
/// # Errors
/// * `TypeMismatch` - the first missing or mistyped attribute
pub fn ensure_required(registry: &Registry, model: NodeRef) -> Result<()> {
    let node = registry.model(model)?;
    for (key, tag) in node.kind.required() {
        schema::validate(*tag, node.attributes.get(key), key, node.kind.type_name())?;
    }
    Ok(())
}

/// Invoke a type method without any authorization check
///
/// # Errors
/// * `UnknownMethod` - the type has no such method
pub fn call_method(registry: &mut Registry, model: NodeRef, method: &str) -> Result<()> {
    let kind = registry.model(model)?.kind.clone();
    kind.call(method, registry, model)
}
