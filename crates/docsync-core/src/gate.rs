//! Authorization gate
//!
//! Entry points for mutations requested by untrusted parties. Each one asks
//! the node type's capability predicate first; a refusal is reported to a
//! [`DenialSink`] and logged, never returned as an error. Permitted requests
//! go through the ordinary mutation API, so they bubble like any other
//! change.

use serde::Serialize;
use std::fmt;

use crate::capability::Requester;
use crate::errors::Result;
use crate::model::{Attributes, NodeRef, Owner, ID_ATTRIBUTE};
use crate::ops::{collection_ops, model_ops};
use crate::registry::Registry;

/// Which gated operation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DenialKind {
    Set,
    Unset,
    Delete,
    Add,
    Move,
    Call,
}

impl DenialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialKind::Set => "set",
            DenialKind::Unset => "unset",
            DenialKind::Delete => "delete",
            DenialKind::Add => "add",
            DenialKind::Move => "move",
            DenialKind::Call => "call",
        }
    }
}

impl fmt::Display for DenialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A refused request with its context
#[derive(Debug, Clone, PartialEq)]
pub enum Denial {
    /// One attribute of a batch was refused
    Set {
        requester: Requester,
        node: NodeRef,
        attributes: Attributes,
        attribute: String,
    },
    Unset {
        requester: Requester,
        node: NodeRef,
        attribute: String,
    },
    Delete {
        requester: Requester,
        node: NodeRef,
    },
    Add {
        requester: Requester,
        collection: NodeRef,
        attributes: Attributes,
    },
    Move {
        requester: Requester,
        collection: NodeRef,
        id: String,
        new_position: usize,
    },
    Call {
        requester: Requester,
        node: NodeRef,
        method: String,
    },
}

impl Denial {
    pub fn kind(&self) -> DenialKind {
        match self {
            Denial::Set { .. } => DenialKind::Set,
            Denial::Unset { .. } => DenialKind::Unset,
            Denial::Delete { .. } => DenialKind::Delete,
            Denial::Add { .. } => DenialKind::Add,
            Denial::Move { .. } => DenialKind::Move,
            Denial::Call { .. } => DenialKind::Call,
        }
    }

    pub fn requester(&self) -> &Requester {
        match self {
            Denial::Set { requester, .. }
            | Denial::Unset { requester, .. }
            | Denial::Delete { requester, .. }
            | Denial::Add { requester, .. }
            | Denial::Move { requester, .. }
            | Denial::Call { requester, .. } => requester,
        }
    }

    /// Node the refused request targeted
    pub fn target(&self) -> NodeRef {
        match self {
            Denial::Set { node, .. }
            | Denial::Unset { node, .. }
            | Denial::Delete { node, .. }
            | Denial::Call { node, .. } => *node,
            Denial::Add { collection, .. } | Denial::Move { collection, .. } => *collection,
        }
    }
}

/// Receiver of denials
pub trait DenialSink {
    fn denied(&mut self, denial: Denial);
}

impl<F: FnMut(Denial)> DenialSink for F {
    fn denied(&mut self, denial: Denial) {
        self(denial)
    }
}

impl DenialSink for Vec<Denial> {
    fn denied(&mut self, denial: Denial) {
        self.push(denial);
    }
}

/// Sink that drops denials; they are still logged
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreDenials;

impl DenialSink for IgnoreDenials {
    fn denied(&mut self, _denial: Denial) {}
}

fn deny(registry: &Registry, sink: &mut dyn DenialSink, denial: Denial) {
    tracing::warn!(
        denial_kind = denial.kind().as_str(),
        requester = %denial.requester(),
        node_id = %registry.describe(denial.target()),
        "Request denied"
    );
    sink.denied(denial);
}

/// Set attributes on behalf of an untrusted requester
///
/// Each key is judged on its own: it must not be `id`, must be
/// client-editable, and the requester must pass `can_edit`. Accepted keys
/// are applied together as one change; every refused key produces its own
/// denial. Returns whether anything changed.
///
/// # Errors
/// * `TypeMismatch` - an accepted attribute fails the schema
pub fn safe_set(
    registry: &mut Registry,
    model: NodeRef,
    attrs: Attributes,
    requester: &Requester,
    sink: &mut dyn DenialSink,
) -> Result<bool> {
    let kind = registry.model(model)?.kind.clone();
    let may_edit = kind.can_edit(registry, model, requester);

    let mut accepted = Attributes::new();
    for (key, value) in attrs.iter() {
        let permitted =
            may_edit && key != ID_ATTRIBUTE && kind.client_editable().contains(&key.as_str());
        if permitted {
            accepted.insert(key.clone(), value.clone());
        } else {
            deny(
                registry,
                sink,
                Denial::Set {
                    requester: requester.clone(),
                    node: model,
                    attributes: attrs.clone(),
                    attribute: key.clone(),
                },
            );
        }
    }
    if accepted.is_empty() {
        return Ok(false);
    }
    model_ops::set_attributes(registry, model, accepted)
}

/// Remove an attribute on behalf of an untrusted requester
///
/// Same rules as [`safe_set`].
///
/// # Errors
/// * `TypeMismatch` - the attribute is required
pub fn safe_unset(
    registry: &mut Registry,
    model: NodeRef,
    attribute: &str,
    requester: &Requester,
    sink: &mut dyn DenialSink,
) -> Result<bool> {
    let kind = registry.model(model)?.kind.clone();
    let permitted = attribute != ID_ATTRIBUTE
        && kind.client_editable().contains(&attribute)
        && kind.can_edit(registry, model, requester);
    if !permitted {
        deny(
            registry,
            sink,
            Denial::Unset {
                requester: requester.clone(),
                node: model,
                attribute: attribute.to_string(),
            },
        );
        return Ok(false);
    }
    model_ops::unset_attribute(registry, model, attribute)
}

/// Remove a model from its collection on behalf of an untrusted requester
///
/// Deletion is terminal: the removed subtree is unregistered.
///
/// # Errors
/// * `StaleHandle` / `WrongNodeKind` - `model` is not a live model
pub fn safe_delete(
    registry: &mut Registry,
    model: NodeRef,
    requester: &Requester,
    sink: &mut dyn DenialSink,
) -> Result<bool> {
    let kind = registry.model(model)?.kind.clone();
    let collection = collection_ops::member_of(registry, model);
    match collection {
        Some(collection) if kind.can_edit(registry, model, requester) => {
            collection_ops::remove(registry, collection, model)?;
            registry.unregister(model)?;
            Ok(true)
        }
        _ => {
            deny(
                registry,
                sink,
                Denial::Delete {
                    requester: requester.clone(),
                    node: model,
                },
            );
            Ok(false)
        }
    }
}

/// Create a member from untrusted attributes
///
/// The fresh model knows which collection it is headed for before its
/// attributes are set, so `can_edit` predicates that walk up the tree
/// resolve. Attributes go through [`safe_set`]; the model is added even if
/// some were refused, and only the `add` is published.
///
/// Returns the new member, or `None` when the add itself was denied.
///
/// # Errors
/// * `TypeMismatch` - an accepted attribute fails the schema; nothing is added
pub fn safe_add(
    registry: &mut Registry,
    collection: NodeRef,
    attrs: Attributes,
    requester: &Requester,
    sink: &mut dyn DenialSink,
) -> Result<Option<NodeRef>> {
    let kind = registry.collection(collection)?.kind.clone();
    if !kind.can_add(registry, collection, requester) {
        deny(
            registry,
            sink,
            Denial::Add {
                requester: requester.clone(),
                collection,
                attributes: attrs,
            },
        );
        return Ok(None);
    }

    let model = model_ops::create_model(registry, kind.element_type(), Attributes::new())?;
    registry.model_mut(model)?.owner = Some(Owner::Collection(collection));
    let added = safe_set(registry, model, attrs, requester, sink)
        .and_then(|_| collection_ops::add(registry, collection, model));
    if let Err(err) = added {
        registry.discard(model);
        return Err(err);
    }
    Ok(Some(model))
}

/// Reorder a collection on behalf of an untrusted requester
///
/// # Errors
/// * `StaleHandle` / `WrongNodeKind` - `collection` is not a live collection
pub fn safe_move(
    registry: &mut Registry,
    collection: NodeRef,
    id: &str,
    new_position: usize,
    requester: &Requester,
    sink: &mut dyn DenialSink,
) -> Result<bool> {
    let kind = registry.collection(collection)?.kind.clone();
    if !kind.can_move(registry, collection, requester) {
        deny(
            registry,
            sink,
            Denial::Move {
                requester: requester.clone(),
                collection,
                id: id.to_string(),
                new_position,
            },
        );
        return Ok(false);
    }
    collection_ops::move_item(registry, collection, id, new_position)
}

/// Invoke an exposed method on behalf of an untrusted requester
///
/// # Errors
/// * anything the method itself returns
pub fn safe_call(
    registry: &mut Registry,
    model: NodeRef,
    method: &str,
    requester: &Requester,
    sink: &mut dyn DenialSink,
) -> Result<bool> {
    let kind = registry.model(model)?.kind.clone();
    let permitted =
        kind.exposed_methods().contains(&method) && kind.can_edit(registry, model, requester);
    if !permitted {
        deny(
            registry,
            sink,
            Denial::Call {
                requester: requester.clone(),
                node: model,
                method: method.to_string(),
            },
        );
        return Ok(false);
    }
    model_ops::call_method(registry, model, method)?;
    Ok(true)
}
